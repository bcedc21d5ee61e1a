//! Single persistent connection to the daemon.

use std::sync::Arc;

use farmd_wire::{Envelope, Request};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use crate::action::{Action, ActionSink};
use crate::bootstrap;
use crate::config::ClientConfig;
use crate::correlator::Correlator;
use crate::error::{ClientError, Result};
use crate::poller::PollSupervisor;
use crate::router::{Effect, route};
use crate::state::StateView;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Write half shared by the public API, the effect driver, and ping loops.
///
/// The `Connected` state is the single source of truth for send permission:
/// an envelope offered while disconnected is logged and dropped, never
/// queued.
pub(crate) struct Outbound {
    state: Arc<RwLock<ConnectionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
}

impl Outbound {
    pub(crate) async fn send(&self, request: Request) -> Result<String> {
        let envelope = Envelope::request(request);
        self.send_envelope(&envelope).await?;
        Ok(envelope.request_id)
    }

    pub(crate) async fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        if *self.state.read().await != ConnectionState::Connected {
            warn!(command = %envelope.command, "dropping outgoing envelope: not connected");
            return Err(ClientError::NotConnected);
        }
        let frame = envelope.to_frame()?;
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .send(Message::Text(frame.into()))
            .await
            .map_err(|error| ClientError::WebSocket(error.to_string()))
    }
}

/// The daemon control connection.
///
/// Owns the socket and the reader task, correlates responses to pending
/// requests, and fans inbound events out into follow-up work decided by
/// [`route`]. One logical connection at a time: `connect` tears down any
/// previous socket before dialing.
pub struct DaemonConnection {
    config: ClientConfig,
    state: Arc<RwLock<ConnectionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    outbound: Arc<Outbound>,
    correlator: Arc<Correlator>,
    poller: Arc<PollSupervisor>,
    sink: ActionSink,
    app_state: Arc<dyn StateView>,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl DaemonConnection {
    pub fn new(config: ClientConfig, sink: ActionSink, app_state: Arc<dyn StateView>) -> Self {
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let writer = Arc::new(Mutex::new(None));
        let outbound = Arc::new(Outbound {
            state: Arc::clone(&state),
            writer: Arc::clone(&writer),
        });
        let poller = Arc::new(PollSupervisor::new(
            config.ping_interval,
            Arc::clone(&outbound),
            Arc::clone(&app_state),
        ));

        Self {
            config,
            state,
            writer,
            outbound,
            correlator: Arc::new(Correlator::new()),
            poller,
            sink,
            app_state,
            reader_task: Mutex::new(None),
        }
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Connect to the daemon at `address` (a `ws://` or `wss://` URL).
    ///
    /// Any previous socket is closed first. A failed attempt logs and
    /// leaves the connection disconnected instead of returning an error:
    /// reconnects are directives from the surrounding application, and a
    /// refused dial must not take the dispatch pipeline down with it.
    pub async fn connect(&self, address: &str) -> Result<()> {
        let address = Url::parse(address)?;
        if address.scheme() != "ws" && address.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "address must use ws:// or wss:// scheme, got: {}",
                address.scheme()
            )));
        }

        self.teardown().await;
        *self.state.write().await = ConnectionState::Connecting;

        let dialed = timeout(self.config.connect_timeout, connect_async(address.as_str())).await;
        let stream = match dialed {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(error)) => {
                warn!(%address, %error, "daemon connect failed");
                *self.state.write().await = ConnectionState::Disconnected;
                return Ok(());
            }
            Err(_elapsed) => {
                warn!(%address, deadline = ?self.config.connect_timeout, "daemon connect timed out");
                *self.state.write().await = ConnectionState::Disconnected;
                return Ok(());
            }
        };

        let (writer, reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        *self.state.write().await = ConnectionState::Connected;
        let _ = self.sink.send(Action::DaemonConnected);

        self.spawn_reader(reader).await;
        bootstrap::run(&self.outbound, &self.config).await;

        Ok(())
    }

    /// Disconnect and notify the application.
    pub async fn disconnect(&self) {
        self.teardown().await;
        let _ = self.sink.send(Action::DaemonDisconnected);
    }

    /// Send `request` and await its correlated response.
    ///
    /// The registration is made before the write so a fast daemon cannot
    /// answer into a hole. Callers wanting a deadline wrap this in
    /// `tokio::time::timeout`.
    pub async fn request(&self, request: Request) -> Result<Envelope> {
        let envelope = Envelope::request(request);
        let receiver = self.correlator.register(&envelope.request_id).await;
        if let Err(error) = self.outbound.send_envelope(&envelope).await {
            self.correlator.forget(&envelope.request_id).await;
            return Err(error);
        }
        receiver
            .await
            .map_err(|_| ClientError::Canceled("connection closed before response".to_string()))
    }

    /// Send `request` without waiting for the response.
    ///
    /// Returns the request id stamped on the wire, mostly for logging.
    pub async fn send(&self, request: Request) -> Result<String> {
        self.outbound.send(request).await
    }

    /// Close the socket if present, stop the reader and the ping loops,
    /// and fail anything still pending. Exactly one close per old socket.
    async fn teardown(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(error) = writer.send(Message::Close(None)).await {
                debug!(%error, "close frame send failed");
            }
        }
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        self.poller.abort_all().await;
        self.correlator.fail_all().await;
        *self.state.write().await = ConnectionState::Disconnected;
    }

    async fn spawn_reader(&self, mut reader: WsReader) {
        let state = Arc::clone(&self.state);
        let correlator = Arc::clone(&self.correlator);
        let poller = Arc::clone(&self.poller);
        let outbound = Arc::clone(&self.outbound);
        let sink = self.sink.clone();
        let app_state = Arc::clone(&self.app_state);

        let task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let envelope = match Envelope::decode(text.as_str()) {
                            Ok(envelope) => envelope,
                            Err(error) => {
                                // A bad frame is isolated; the connection
                                // and the frames behind it keep going.
                                warn!(%error, "dropping malformed frame");
                                continue;
                            }
                        };
                        // Correlation before routing, so a waiting caller
                        // unblocks before any fan-out runs.
                        correlator.resolve(&envelope).await;
                        let effects = route(&envelope, app_state.as_ref());
                        apply_effects(effects, &outbound, &poller, &sink).await;
                    }
                    Ok(Message::Ping(payload)) => {
                        debug!(bytes = payload.len(), "transport-level ping");
                    }
                    Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Binary(_)) => {}
                    Ok(Message::Frame(_)) => {}
                    Err(error) => {
                        warn!(%error, "websocket read error");
                        break;
                    }
                }
            }

            // Externally triggered close or network drop: reset state and
            // let the application decide whether to dial again.
            *state.write().await = ConnectionState::Disconnected;
            correlator.fail_all().await;
            poller.abort_all().await;
            let _ = sink.send(Action::DaemonDisconnected);
        });

        *self.reader_task.lock().await = Some(task);
    }
}

async fn apply_effects(
    effects: Vec<Effect>,
    outbound: &Arc<Outbound>,
    poller: &Arc<PollSupervisor>,
    sink: &ActionSink,
) {
    for effect in effects {
        match effect {
            Effect::Dispatch(action) => {
                let _ = sink.send(action);
            }
            Effect::Send(request) => {
                let command = request.command.clone();
                if let Err(error) = outbound.send(request).await {
                    warn!(%command, %error, "follow-up send failed");
                }
            }
            Effect::StartPolling(service) => poller.start(service).await,
        }
    }
}

#[cfg(test)]
pub(crate) fn outbound_for_tests() -> Arc<Outbound> {
    Arc::new(Outbound {
        state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        writer: Arc::new(Mutex::new(None)),
    })
}
