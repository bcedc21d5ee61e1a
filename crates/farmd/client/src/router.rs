//! Inbound dispatch table.
//!
//! Every inbound envelope maps to a deterministic effect list: the raw
//! message record first, then command-specific follow-ups, then the generic
//! failure check. Keeping [`route`] a pure function of the envelope and a
//! state snapshot is what lets the dispatch rules be tested without a
//! socket; the driver in [`crate::connection`] applies the effects in order.

use farmd_wire::{Envelope, Request, Service, WalletSummary, WalletType, commands};
use serde_json::Value;
use tracing::warn;

use crate::action::Action;
use crate::state::StateView;

/// One follow-up the router decided on.
#[derive(Debug, PartialEq)]
pub enum Effect {
    /// Update application state.
    Dispatch(Action),
    /// Send a follow-up command to the daemon.
    Send(Request),
    /// Keep pinging `service` until its connectivity flag flips.
    StartPolling(Service),
}

/// Error substrings that do not merit a dialog.
const BENIGN_ERRORS: [&str; 2] = ["already running", "not_initialized"];

/// Decide the follow-ups for one inbound envelope.
pub fn route(envelope: &Envelope, state: &dyn StateView) -> Vec<Effect> {
    let mut effects = vec![Effect::Dispatch(Action::IncomingMessage(envelope.clone()))];

    match envelope.command.as_str() {
        "ping" => route_ping(envelope, state, &mut effects),
        "delete_key" | "delete_all_keys" => {
            if envelope.success() {
                effects.push(Effect::Send(commands::get_public_keys()));
            }
        }
        "add_key" => {
            if envelope.success() {
                effects.push(Effect::Send(commands::get_public_keys()));
                effects.push(Effect::Send(commands::get_wallets()));
            }
        }
        "log_in" | "logged_in" => {
            if envelope.success() {
                effects.push(Effect::Send(commands::get_wallets()));
            }
        }
        "get_wallets" => route_wallets(envelope, &mut effects),
        "state_changed" => route_state_changed(envelope, &mut effects),
        "start_service" => route_start_service(envelope, &mut effects),
        "stop_service" => route_stop_service(envelope, &mut effects),
        _ => {}
    }

    // Generic failure surfacing runs last and never short-circuits the
    // command-specific branches above. One dialog per failed envelope.
    if !envelope.success() {
        let message = envelope.error_text().unwrap_or("unknown daemon error");
        if !is_benign(message) {
            effects.push(Effect::Dispatch(Action::ErrorDialog(message.to_string())));
        }
    }

    effects
}

fn is_benign(message: &str) -> bool {
    BENIGN_ERRORS.iter().any(|benign| message.contains(benign))
}

/// A start/stop response counts as successful when the daemon says so or
/// when the service was already in the requested state.
fn effective_success(envelope: &Envelope) -> bool {
    envelope.success()
        || envelope
            .error_text()
            .is_some_and(|message| message.contains("already running"))
}

fn route_ping(envelope: &Envelope, state: &dyn StateView, effects: &mut Vec<Effect>) {
    match envelope.origin.parse::<Service>() {
        Ok(Service::Wallet) => {
            effects.push(Effect::Send(commands::get_connections(Service::Wallet)));
            effects.push(Effect::Send(commands::get_public_keys()));
        }
        // The simulator stands in for the full node under local_test.
        Ok(Service::FullNode | Service::Simulator) => {
            effects.push(Effect::Send(commands::get_blockchain_state()));
            effects.push(Effect::Send(commands::get_connections(Service::FullNode)));
            effects.push(Effect::Send(commands::get_latest_blocks()));
        }
        Ok(Service::Farmer) => {
            effects.push(Effect::Send(commands::get_latest_challenges()));
            effects.push(Effect::Send(commands::get_connections(Service::Farmer)));
        }
        Ok(Service::Harvester) => {
            if !state.has_plots() {
                effects.push(Effect::Send(commands::get_plots()));
            }
            if !state.has_plot_directories() {
                effects.push(Effect::Send(commands::get_plot_directories()));
            }
        }
        Ok(Service::Plotter) | Err(_) => {}
    }
}

fn route_wallets(envelope: &Envelope, effects: &mut Vec<Effect>) {
    if !envelope.success() {
        return;
    }
    let Some(wallets) = envelope.data.get("wallets").and_then(Value::as_array) else {
        warn!("get_wallets response without a wallet list");
        return;
    };

    for entry in wallets {
        let Some(wallet) = WalletSummary::from_value(entry) else {
            warn!("skipping malformed wallet entry");
            continue;
        };
        match wallet.wallet_type {
            WalletType::Standard => {
                effects.push(Effect::Send(commands::get_wallet_balance(wallet.id)));
                effects.push(Effect::Send(commands::get_transactions(wallet.id)));
                effects.push(Effect::Send(commands::get_next_address(wallet.id)));
            }
            WalletType::RateLimited => {
                // Balance queries against an uninitialized rate-limited
                // wallet fail on the daemon side; the settings blob says
                // whether it is safe to ask.
                if wallet.rate_limited_initialized() {
                    effects.push(Effect::Send(commands::get_wallet_balance(wallet.id)));
                }
                effects.push(Effect::Send(commands::get_transactions(wallet.id)));
            }
            WalletType::ColouredCoin => {
                effects.push(Effect::Send(commands::get_wallet_balance(wallet.id)));
                effects.push(Effect::Send(commands::get_transactions(wallet.id)));
                effects.push(Effect::Send(commands::get_next_address(wallet.id)));
                effects.push(Effect::Send(commands::get_colour_name(wallet.id)));
                effects.push(Effect::Send(commands::get_colour_info(wallet.id)));
            }
            WalletType::Other(_) => {
                effects.push(Effect::Send(commands::get_wallet_balance(wallet.id)));
                effects.push(Effect::Send(commands::get_transactions(wallet.id)));
            }
        }
    }
}

fn route_state_changed(envelope: &Envelope, effects: &mut Vec<Effect>) {
    if envelope.origin == Service::Plotter.as_str() {
        if let Some(queue) = envelope.data.get("queue") {
            effects.push(Effect::Dispatch(Action::PlotQueueUpdate(queue.clone())));
        }
        if envelope.data.get("state").and_then(Value::as_str) == Some("state") {
            effects.push(Effect::Send(commands::get_plots()));
        }
        return;
    }

    match envelope.data.get("state").and_then(Value::as_str) {
        Some("coin_added" | "coin_removed" | "pending_transaction") => {
            let Some(wallet_id) = envelope.data.get("wallet_id").and_then(Value::as_u64) else {
                warn!(command = %envelope.command, "wallet state change without wallet_id");
                return;
            };
            let wallet_id = wallet_id as u32;
            effects.push(Effect::Send(commands::get_wallet_balance(wallet_id)));
            effects.push(Effect::Send(commands::get_transactions(wallet_id)));
        }
        Some("sync_changed") => effects.push(Effect::Send(commands::get_sync_status())),
        Some("new_block") => effects.push(Effect::Send(commands::get_height_info())),
        _ => {}
    }
}

fn route_start_service(envelope: &Envelope, effects: &mut Vec<Effect>) {
    if !effective_success(envelope) {
        return;
    }
    let Some(name) = envelope.data.get("service").and_then(Value::as_str) else {
        warn!("start_service response without a service name");
        return;
    };
    let Ok(service) = name.parse::<Service>() else {
        return;
    };
    // The simulator answers for the full node once it is up.
    let service = if service == Service::Simulator {
        Service::FullNode
    } else {
        service
    };
    if Service::POLLABLE.contains(&service) {
        effects.push(Effect::StartPolling(service));
    }
}

fn route_stop_service(envelope: &Envelope, effects: &mut Vec<Effect>) {
    if !effective_success(envelope) {
        return;
    }
    if envelope.data.get("service").and_then(Value::as_str) == Some(Service::Plotter.as_str()) {
        effects.push(Effect::Dispatch(Action::PlottingStopped));
        effects.push(Effect::Dispatch(Action::ReprocessPlotQueue));
    }
}
