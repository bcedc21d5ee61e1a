//! Actions emitted toward the surrounding application's reducers.

use farmd_wire::Envelope;
use serde_json::Value;
use tokio::sync::mpsc;

/// A state update for the surrounding application.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Raw last-seen inbound envelope; emitted for every frame before any
    /// command-specific handling.
    IncomingMessage(Envelope),
    /// The control socket opened.
    DaemonConnected,
    /// The control socket closed or dropped.
    DaemonDisconnected,
    /// Fresh plotting queue published by the plotter.
    PlotQueueUpdate(Value),
    /// The plotting service acknowledged a stop.
    PlottingStopped,
    /// The plot queue should be re-examined after a plotter stop.
    ReprocessPlotQueue,
    /// A daemon response failed in a way worth showing the user.
    ErrorDialog(String),
}

/// Channel end the middleware dispatches actions into.
pub type ActionSink = mpsc::UnboundedSender<Action>;
