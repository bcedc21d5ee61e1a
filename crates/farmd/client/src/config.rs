//! Client configuration.

use std::time::Duration;

/// Configuration for the daemon connection.
///
/// The surrounding application owns persistence; it reads its settings once
/// at startup and hands the middleware this struct.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Handshake deadline for a single connect attempt.
    pub connect_timeout: Duration,
    /// Delay between service ping retries.
    pub ping_interval: Duration,
    /// Start a simulated node instead of the real full-node stack.
    pub local_test: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(1),
            local_test: false,
        }
    }
}
