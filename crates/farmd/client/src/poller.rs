//! Ping loops that prod backend services until they report in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use farmd_wire::{Service, commands};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::connection::Outbound;
use crate::error::ClientError;
use crate::state::StateView;

/// One self-rescheduling ping loop per pollable service.
///
/// A loop sends `ping`, waits, reads the service's connectivity flag, and
/// repeats until the flag flips. There is no backoff; the interval is the
/// pacing. A loop whose send fails because the connection is gone exits
/// instead of spinning against a dead socket.
pub(crate) struct PollSupervisor {
    interval: Duration,
    outbound: Arc<Outbound>,
    app_state: Arc<dyn StateView>,
    loops: Mutex<HashMap<Service, JoinHandle<()>>>,
}

impl PollSupervisor {
    pub(crate) fn new(
        interval: Duration,
        outbound: Arc<Outbound>,
        app_state: Arc<dyn StateView>,
    ) -> Self {
        Self {
            interval,
            outbound,
            app_state,
            loops: Mutex::new(HashMap::new()),
        }
    }

    /// Start the ping loop for `service` unless one is already live.
    pub(crate) async fn start(&self, service: Service) {
        let mut loops = self.loops.lock().await;
        if let Some(handle) = loops.get(&service) {
            if !handle.is_finished() {
                return;
            }
        }

        let interval = self.interval;
        let outbound = Arc::clone(&self.outbound);
        let app_state = Arc::clone(&self.app_state);
        let handle = tokio::spawn(async move {
            loop {
                match outbound.send(commands::ping(service)).await {
                    Ok(_request_id) => {}
                    Err(ClientError::NotConnected) => break,
                    Err(error) => {
                        debug!(%service, %error, "service ping failed");
                        break;
                    }
                }
                sleep(interval).await;
                if app_state.service_connected(service) {
                    debug!(%service, "service reported in; stopping ping loop");
                    break;
                }
            }
        });
        loops.insert(service, handle);
    }

    /// Abort every live loop; a reconnect starts fresh ones.
    pub(crate) async fn abort_all(&self) {
        for (_service, handle) in self.loops.lock().await.drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) async fn loop_count(&self) -> usize {
        self.loops.lock().await.len()
    }
}
