//! Startup sequence run once per successful connection open.

use farmd_wire::{ORIGIN, PLOT_QUEUE, Service, commands};
use tracing::warn;

use crate::config::ClientConfig;
use crate::connection::Outbound;

/// Register this client with the daemon and kick the backend services awake.
///
/// Every send is fire-and-forget: the responses flow back through the
/// router, where an "already running" error counts as success, so startup
/// is idempotent across reconnects.
pub(crate) async fn run(outbound: &Outbound, config: &ClientConfig) {
    let mut startup = vec![
        commands::register_service(ORIGIN),
        commands::register_service(PLOT_QUEUE),
        commands::start_service(Service::Wallet),
    ];
    if config.local_test {
        startup.push(commands::start_service(Service::Simulator));
    } else {
        startup.push(commands::start_service(Service::FullNode));
        startup.push(commands::start_service(Service::Farmer));
        startup.push(commands::start_service(Service::Harvester));
    }

    for request in startup {
        let command = request.command.clone();
        if let Err(error) = outbound.send(request).await {
            warn!(%command, %error, "startup send failed");
        }
    }
}
