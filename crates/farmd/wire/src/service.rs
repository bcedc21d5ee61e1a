//! Service identifiers on the daemon control socket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Identity this client registers under and stamps as `origin`.
pub const ORIGIN: &str = "wallet_ui";

/// Destination for commands handled by the daemon itself.
pub const DAEMON: &str = "daemon";

/// Queue channel the plotting service publishes on.
pub const PLOT_QUEUE: &str = "plot_queue";

/// A backend service reachable through the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Wallet,
    FullNode,
    Farmer,
    Harvester,
    Plotter,
    Simulator,
}

impl Service {
    /// Services kept alive by ping loops until their connectivity flag flips.
    pub const POLLABLE: [Service; 4] = [
        Service::Wallet,
        Service::FullNode,
        Service::Farmer,
        Service::Harvester,
    ];

    /// Wire name of this service.
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Wallet => "wallet",
            Service::FullNode => "full_node",
            Service::Farmer => "farmer",
            Service::Harvester => "harvester",
            Service::Plotter => "plotter",
            Service::Simulator => "simulator",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = WireError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "wallet" => Ok(Service::Wallet),
            "full_node" => Ok(Service::FullNode),
            "farmer" => Ok(Service::Farmer),
            "harvester" => Ok(Service::Harvester),
            "plotter" => Ok(Service::Plotter),
            "simulator" => Ok(Service::Simulator),
            other => Err(WireError::UnknownService(other.to_string())),
        }
    }
}
