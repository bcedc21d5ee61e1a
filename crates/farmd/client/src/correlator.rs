//! Request/response correlation keyed by request id.

use std::collections::HashMap;

use farmd_wire::Envelope;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

type Pending = oneshot::Sender<Envelope>;

/// Pending-request table; resolves each registered id at most once.
///
/// Entries are never expired here. A caller that wants a deadline wraps the
/// await in `tokio::time::timeout`; the connection drains the table when the
/// socket goes away.
#[derive(Default)]
pub struct Correlator {
    pending: Mutex<HashMap<String, Pending>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the response to `request_id`.
    pub async fn register(&self, request_id: &str) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.to_string(), tx);
        rx
    }

    /// Hand `envelope` to a waiting caller, if any.
    ///
    /// Removing the entry before sending is what makes resolution
    /// at-most-once; an envelope with no pending entry passes through
    /// untouched, since unsolicited pushes have no caller.
    pub async fn resolve(&self, envelope: &Envelope) -> bool {
        if envelope.request_id.is_empty() {
            return false;
        }
        let sender = self.pending.lock().await.remove(&envelope.request_id);
        match sender {
            Some(sender) => {
                if sender.send(envelope.clone()).is_err() {
                    debug!(request_id = %envelope.request_id, "caller gone before response");
                }
                true
            }
            None => false,
        }
    }

    /// Drop a registration that will never be answered.
    pub async fn forget(&self, request_id: &str) {
        self.pending.lock().await.remove(request_id);
    }

    /// Drop every pending entry; their callers observe a closed channel.
    pub async fn fail_all(&self) {
        self.pending.lock().await.clear();
    }

    #[cfg(test)]
    pub(crate) async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
