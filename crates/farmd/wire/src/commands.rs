//! Typed builders for the daemon command vocabulary.
//!
//! The command set is a contract with the backend daemon. Builders return a
//! [`Request`] rather than a full envelope so the connection can stamp
//! identity fields and a fresh request id at send time.

use serde_json::{Value, json};

use crate::envelope::Request;
use crate::service::{DAEMON, Service};

fn to(destination: &str, command: &str, data: Value) -> Request {
    Request {
        command: command.to_string(),
        data,
        destination: destination.to_string(),
    }
}

/// Register `service` as a message recipient with the daemon.
pub fn register_service(service: &str) -> Request {
    to(DAEMON, "register_service", json!({ "service": service }))
}

/// Ask the daemon to launch a backend service.
pub fn start_service(service: Service) -> Request {
    to(DAEMON, "start_service", json!({ "service": service.as_str() }))
}

/// Ask the daemon to stop a backend service.
pub fn stop_service(service: Service) -> Request {
    to(DAEMON, "stop_service", json!({ "service": service.as_str() }))
}

/// Liveness probe addressed to a specific service.
pub fn ping(service: Service) -> Request {
    to(service.as_str(), "ping", json!({}))
}

/// Peer connection list of a service.
pub fn get_connections(service: Service) -> Request {
    to(service.as_str(), "get_connections", json!({}))
}

// Wallet service.

pub fn get_public_keys() -> Request {
    to(Service::Wallet.as_str(), "get_public_keys", json!({}))
}

pub fn get_wallets() -> Request {
    to(Service::Wallet.as_str(), "get_wallets", json!({}))
}

pub fn get_wallet_balance(wallet_id: u32) -> Request {
    to(
        Service::Wallet.as_str(),
        "get_wallet_balance",
        json!({ "wallet_id": wallet_id }),
    )
}

pub fn get_transactions(wallet_id: u32) -> Request {
    to(
        Service::Wallet.as_str(),
        "get_transactions",
        json!({ "wallet_id": wallet_id }),
    )
}

pub fn get_next_address(wallet_id: u32) -> Request {
    to(
        Service::Wallet.as_str(),
        "get_next_address",
        json!({ "wallet_id": wallet_id }),
    )
}

pub fn get_sync_status() -> Request {
    to(Service::Wallet.as_str(), "get_sync_status", json!({}))
}

pub fn get_height_info() -> Request {
    to(Service::Wallet.as_str(), "get_height_info", json!({}))
}

/// Colour name of a coloured-coin wallet.
pub fn get_colour_name(wallet_id: u32) -> Request {
    to(
        Service::Wallet.as_str(),
        "get_colour_name",
        json!({ "wallet_id": wallet_id }),
    )
}

/// Colour descriptor of a coloured-coin wallet.
pub fn get_colour_info(wallet_id: u32) -> Request {
    to(
        Service::Wallet.as_str(),
        "get_colour_info",
        json!({ "wallet_id": wallet_id }),
    )
}

pub fn log_in(fingerprint: u64) -> Request {
    to(
        Service::Wallet.as_str(),
        "log_in",
        json!({ "fingerprint": fingerprint }),
    )
}

pub fn add_key(mnemonic: &[String]) -> Request {
    to(
        Service::Wallet.as_str(),
        "add_key",
        json!({ "mnemonic": mnemonic }),
    )
}

pub fn delete_key(fingerprint: u64) -> Request {
    to(
        Service::Wallet.as_str(),
        "delete_key",
        json!({ "fingerprint": fingerprint }),
    )
}

pub fn delete_all_keys() -> Request {
    to(Service::Wallet.as_str(), "delete_all_keys", json!({}))
}

// Full node.

pub fn get_blockchain_state() -> Request {
    to(Service::FullNode.as_str(), "get_blockchain_state", json!({}))
}

pub fn get_latest_blocks() -> Request {
    to(Service::FullNode.as_str(), "get_latest_blocks", json!({}))
}

// Farmer.

pub fn get_latest_challenges() -> Request {
    to(Service::Farmer.as_str(), "get_latest_challenges", json!({}))
}

// Harvester.

pub fn get_plots() -> Request {
    to(Service::Harvester.as_str(), "get_plots", json!({}))
}

pub fn get_plot_directories() -> Request {
    to(Service::Harvester.as_str(), "get_plot_directories", json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ORIGIN;

    #[test]
    fn daemon_commands_target_the_daemon() {
        for request in [
            register_service(ORIGIN),
            start_service(Service::Wallet),
            stop_service(Service::Plotter),
        ] {
            assert_eq!(request.destination, DAEMON);
        }
    }

    #[test]
    fn start_service_names_the_service_in_data() {
        let request = start_service(Service::FullNode);
        assert_eq!(request.data["service"], "full_node");
    }

    #[test]
    fn wallet_scoped_commands_carry_the_wallet_id() {
        for request in [
            get_wallet_balance(7),
            get_transactions(7),
            get_next_address(7),
            get_colour_name(7),
            get_colour_info(7),
        ] {
            assert_eq!(request.destination, "wallet");
            assert_eq!(request.data["wallet_id"], 7);
        }
    }

    #[test]
    fn ping_targets_the_named_service() {
        assert_eq!(ping(Service::Harvester).destination, "harvester");
        assert_eq!(ping(Service::Harvester).command, "ping");
    }
}
