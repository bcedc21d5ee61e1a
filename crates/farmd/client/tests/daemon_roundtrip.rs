//! End-to-end tests against a scripted in-process daemon.
//!
//! Each test stands up a real WebSocket server, points a [`DaemonConnection`]
//! at it, and asserts on the frames and actions that cross the boundary.

use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use farmd_client::{Action, ClientConfig, ClientError, ConnectionState, DaemonConnection, StateView};
use farmd_wire::{Envelope, ORIGIN, Service, commands};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = WebSocketStream<TcpStream>;
type TestResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;

const STEP: Duration = Duration::from_secs(5);

async fn step<F, T>(future: F) -> Result<T, Box<dyn Error + Send + Sync>>
where
    F: Future<Output = T>,
{
    Ok(timeout(STEP, future).await?)
}

/// Bind a listener and accept exactly one WebSocket connection.
async fn spawn_daemon() -> Result<(String, oneshot::Receiver<ServerWs>), Box<dyn Error + Send + Sync>>
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = format!("ws://{}", listener.local_addr()?);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Ok((stream, _peer)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                let _ = tx.send(ws);
            }
        }
    });
    Ok((address, rx))
}

/// Read frames until the next decoded envelope.
async fn next_request(ws: &mut ServerWs) -> Result<Envelope, Box<dyn Error + Send + Sync>> {
    loop {
        let frame = step(ws.next())
            .await?
            .ok_or("daemon socket closed while expecting a request")??;
        match frame {
            Message::Text(text) => return Ok(Envelope::decode(text.as_str())?),
            Message::Close(_) => return Err("daemon socket closed while expecting a request".into()),
            _ => {}
        }
    }
}

/// Response envelope echoing the request id of `request`.
fn reply_to(request: &Envelope, origin: &str, data: serde_json::Value) -> Envelope {
    Envelope {
        command: request.command.clone(),
        data,
        origin: origin.to_string(),
        destination: ORIGIN.to_string(),
        ack: false,
        request_id: request.request_id.clone(),
    }
}

async fn send_envelope(ws: &mut ServerWs, envelope: &Envelope) -> TestResult {
    ws.send(Message::Text(envelope.to_frame()?.into())).await?;
    Ok(())
}

#[derive(Default)]
struct SharedFlags {
    wallet: AtomicBool,
    full_node: AtomicBool,
    farmer: AtomicBool,
    harvester: AtomicBool,
}

impl SharedFlags {
    fn mark_connected(&self, service: Service) {
        self.flag(service).store(true, Ordering::Relaxed);
    }

    fn flag(&self, service: Service) -> &AtomicBool {
        match service {
            Service::Wallet => &self.wallet,
            Service::FullNode | Service::Simulator => &self.full_node,
            Service::Farmer => &self.farmer,
            Service::Harvester | Service::Plotter => &self.harvester,
        }
    }
}

impl StateView for SharedFlags {
    fn service_connected(&self, service: Service) -> bool {
        self.flag(service).load(Ordering::Relaxed)
    }
}

fn test_config() -> ClientConfig {
    ClientConfig {
        ping_interval: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

struct Harness {
    client: Arc<DaemonConnection>,
    actions: mpsc::UnboundedReceiver<Action>,
    flags: Arc<SharedFlags>,
}

fn harness(config: ClientConfig) -> Harness {
    let (sink, actions) = mpsc::unbounded_channel();
    let flags = Arc::new(SharedFlags::default());
    let state_view: Arc<dyn StateView> = flags.clone();
    let client = Arc::new(DaemonConnection::new(config, sink, state_view));
    Harness {
        client,
        actions,
        flags,
    }
}

/// Startup envelopes the bootstrapper emits for the default configuration.
const BOOTSTRAP_SEQUENCE: [(&str, &str); 6] = [
    ("register_service", "daemon"),
    ("register_service", "daemon"),
    ("start_service", "daemon"),
    ("start_service", "daemon"),
    ("start_service", "daemon"),
    ("start_service", "daemon"),
];

async fn drain_bootstrap(ws: &mut ServerWs) -> Result<Vec<Envelope>, Box<dyn Error + Send + Sync>> {
    let mut envelopes = Vec::new();
    for (expected_command, expected_destination) in BOOTSTRAP_SEQUENCE {
        let envelope = next_request(ws).await?;
        assert_eq!(envelope.command, expected_command);
        assert_eq!(envelope.destination, expected_destination);
        envelopes.push(envelope);
    }
    Ok(envelopes)
}

#[tokio::test]
async fn bootstrap_registers_then_starts_services_in_order() -> TestResult {
    let (address, accepted) = spawn_daemon().await?;
    let mut h = harness(test_config());

    h.client.connect(&address).await?;
    assert_eq!(h.client.state().await, ConnectionState::Connected);
    let mut ws = step(accepted).await??;

    let envelopes = drain_bootstrap(&mut ws).await?;

    assert_eq!(envelopes[0].data["service"], ORIGIN);
    assert_eq!(envelopes[1].data["service"], "plot_queue");
    let started: Vec<&str> = envelopes[2..]
        .iter()
        .filter_map(|envelope| envelope.data["service"].as_str())
        .collect();
    assert_eq!(started, vec!["wallet", "full_node", "farmer", "harvester"]);

    let mut ids = std::collections::HashSet::new();
    for envelope in &envelopes {
        assert_eq!(envelope.origin, ORIGIN);
        assert!(!envelope.ack);
        assert_eq!(envelope.request_id.len(), 64);
        assert!(envelope.request_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(ids.insert(envelope.request_id.clone()), "request id reused");
    }

    assert_eq!(step(h.actions.recv()).await?, Some(Action::DaemonConnected));
    Ok(())
}

#[tokio::test]
async fn local_test_config_starts_the_simulator_instead() -> TestResult {
    let (address, accepted) = spawn_daemon().await?;
    let h = harness(ClientConfig {
        local_test: true,
        ..test_config()
    });

    h.client.connect(&address).await?;
    let mut ws = step(accepted).await??;

    let mut started = Vec::new();
    for _ in 0..4 {
        let envelope = next_request(&mut ws).await?;
        if envelope.command == "start_service" {
            if let Some(service) = envelope.data["service"].as_str() {
                started.push(service.to_string());
            }
        }
    }
    assert_eq!(started, vec!["wallet", "simulator"]);
    Ok(())
}

#[tokio::test]
async fn already_running_response_still_starts_the_ping_loop() -> TestResult {
    let (address, accepted) = spawn_daemon().await?;
    let mut h = harness(test_config());

    h.client.connect(&address).await?;
    let mut ws = step(accepted).await??;
    let envelopes = drain_bootstrap(&mut ws).await?;

    // Refuse the wallet start with the benign error; the router must treat
    // it exactly like success and begin pinging the wallet service.
    let wallet_start = &envelopes[2];
    send_envelope(
        &mut ws,
        &reply_to(
            wallet_start,
            "daemon",
            json!({
                "success": false,
                "error": "wallet is already running",
                "service": "wallet",
            }),
        ),
    )
    .await?;

    let ping = next_request(&mut ws).await?;
    assert_eq!(ping.command, "ping");
    assert_eq!(ping.destination, "wallet");
    h.flags.mark_connected(Service::Wallet);

    // The benign failure reaches the reducers as a raw message but never
    // as a dialog.
    let mut saw_incoming = false;
    while let Ok(action) = h.actions.try_recv() {
        match action {
            Action::IncomingMessage(envelope) if envelope.command == "start_service" => {
                saw_incoming = true;
            }
            Action::ErrorDialog(message) => {
                return Err(format!("unexpected error dialog: {message}").into());
            }
            _ => {}
        }
    }
    assert!(saw_incoming);
    Ok(())
}

#[tokio::test]
async fn correlated_ping_resolves_then_fans_out() -> TestResult {
    let (address, accepted) = spawn_daemon().await?;
    let h = harness(ClientConfig {
        // Keep bootstrap small and unanswered so no poll loop interferes.
        local_test: true,
        ..test_config()
    });

    h.client.connect(&address).await?;
    let mut ws = step(accepted).await??;
    for _ in 0..4 {
        next_request(&mut ws).await?;
    }

    let requester = tokio::spawn({
        let client = Arc::clone(&h.client);
        async move { client.request(commands::ping(Service::Wallet)).await }
    });

    let ping = next_request(&mut ws).await?;
    assert_eq!(ping.command, "ping");
    assert_eq!(ping.destination, "wallet");

    send_envelope(
        &mut ws,
        &reply_to(&ping, "wallet", json!({"success": true})),
    )
    .await?;

    let response = step(requester).await???;
    assert_eq!(response.request_id, ping.request_id);
    assert!(response.success());

    // After the caller is unblocked, the router's wallet-ping fan-out goes
    // out in order: connection info first, then public keys.
    let first = next_request(&mut ws).await?;
    let second = next_request(&mut ws).await?;
    assert_eq!(first.command, "get_connections");
    assert_eq!(first.destination, "wallet");
    assert_eq!(second.command, "get_public_keys");
    Ok(())
}

#[tokio::test]
async fn reconnect_closes_the_old_socket_before_dialing() -> TestResult {
    let (first_address, first_accepted) = spawn_daemon().await?;
    let h = harness(test_config());

    h.client.connect(&first_address).await?;
    let mut first_ws = step(first_accepted).await??;
    drain_bootstrap(&mut first_ws).await?;

    let (second_address, second_accepted) = spawn_daemon().await?;
    h.client.connect(&second_address).await?;

    // Exactly one close on the old socket.
    let mut closes = 0;
    loop {
        match step(first_ws.next()).await? {
            Some(Ok(Message::Close(_))) => closes += 1,
            Some(Ok(_)) => {}
            Some(Err(_)) | None => break,
        }
    }
    assert_eq!(closes, 1);

    // The replacement connection bootstraps from scratch.
    let mut second_ws = step(second_accepted).await??;
    drain_bootstrap(&mut second_ws).await?;
    assert_eq!(h.client.state().await, ConnectionState::Connected);
    Ok(())
}

#[tokio::test]
async fn malformed_frames_are_isolated_to_that_frame() -> TestResult {
    let (address, accepted) = spawn_daemon().await?;
    let h = harness(ClientConfig {
        local_test: true,
        ..test_config()
    });

    h.client.connect(&address).await?;
    let mut ws = step(accepted).await??;
    for _ in 0..4 {
        next_request(&mut ws).await?;
    }

    ws.send(Message::Text("this is not an envelope".to_string().into()))
        .await?;
    send_envelope(
        &mut ws,
        &Envelope {
            command: "state_changed".to_string(),
            data: json!({"state": "new_block"}),
            origin: "full_node".to_string(),
            destination: ORIGIN.to_string(),
            ack: false,
            request_id: String::new(),
        },
    )
    .await?;

    // The bad frame is dropped; the push right behind it still routes.
    let follow_up = next_request(&mut ws).await?;
    assert_eq!(follow_up.command, "get_height_info");
    assert_eq!(h.client.state().await, ConnectionState::Connected);
    Ok(())
}

#[tokio::test]
async fn daemon_close_fails_pending_requests_and_notifies() -> TestResult {
    let (address, accepted) = spawn_daemon().await?;
    let mut h = harness(ClientConfig {
        local_test: true,
        ..test_config()
    });

    h.client.connect(&address).await?;
    let mut ws = step(accepted).await??;
    for _ in 0..4 {
        next_request(&mut ws).await?;
    }

    let requester = tokio::spawn({
        let client = Arc::clone(&h.client);
        async move { client.request(commands::get_sync_status()).await }
    });
    next_request(&mut ws).await?;

    // Drop the connection without answering.
    ws.close(None).await?;

    let outcome = step(requester).await??;
    assert!(matches!(outcome, Err(ClientError::Canceled(_))));

    let mut saw_disconnect = false;
    while let Some(action) = step(h.actions.recv()).await? {
        if action == Action::DaemonDisconnected {
            saw_disconnect = true;
            break;
        }
    }
    assert!(saw_disconnect);
    assert_eq!(h.client.state().await, ConnectionState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn sends_are_dropped_while_disconnected() -> TestResult {
    let h = harness(test_config());
    let outcome = h.client.send(commands::get_wallets()).await;
    assert!(matches!(outcome, Err(ClientError::NotConnected)));

    let outcome = h.client.request(commands::get_wallets()).await;
    assert!(matches!(outcome, Err(ClientError::NotConnected)));
    Ok(())
}
