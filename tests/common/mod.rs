//! Shared helpers for the integration suite: spawn a gateway on an
//! ephemeral port and drive it with real WebSocket clients.

#![allow(dead_code)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use presence_gateway::api;
use presence_gateway::app_state::AppState;
use presence_gateway::ws::handler::ws_handler;
use presence_gateway::ws::{Envelope, EventKind, PresenceRegistry};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// How long to wait for an expected frame or registry state.
const WAIT: Duration = Duration::from_secs(2);
/// Quiet period used to assert that nothing arrives.
const QUIET: Duration = Duration::from_millis(200);

/// One WebSocket client connected to the test gateway.
pub(crate) type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live gateway bound to an ephemeral port.
pub(crate) struct TestGateway {
    /// Address the gateway listens on.
    pub(crate) addr: SocketAddr,
    /// Handle to the gateway's registry.
    pub(crate) registry: PresenceRegistry,
    /// Join handle of the registry coordinator task.
    pub(crate) coordinator: JoinHandle<()>,
}

/// Serves the full router on `127.0.0.1:0` in the background.
pub(crate) async fn spawn_gateway() -> TestGateway {
    let (registry, coordinator) = PresenceRegistry::start(128);
    let state = AppState {
        registry: registry.clone(),
    };
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .with_state(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestGateway {
        addr,
        registry,
        coordinator,
    }
}

/// Opens a WebSocket session under `key`.
pub(crate) async fn connect(addr: SocketAddr, key: &str) -> WsClient {
    let url = format!("ws://{addr}/ws?token={key}");
    match connect_async(url).await {
        Ok((ws, _response)) => ws,
        Err(err) => panic!("ws connect failed: {err}"),
    }
}

/// Polls the registry until it holds exactly `n` sessions.
pub(crate) async fn wait_for_len(registry: &PresenceRegistry, n: usize) {
    let deadline = Instant::now() + WAIT;
    while registry.len().await != n {
        if Instant::now() > deadline {
            panic!(
                "timed out waiting for {n} sessions, have {}",
                registry.len().await
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Sends one text frame.
pub(crate) async fn send_text(ws: &mut WsClient, text: &str) {
    if let Err(err) = ws.send(Message::text(text)).await {
        panic!("send failed: {err}");
    }
}

/// Reads the next data frame and decodes it as an envelope.
pub(crate) async fn recv_envelope(ws: &mut WsClient) -> Envelope {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Ok(msg) = tokio::time::timeout(remaining, ws.next()).await else {
            panic!("timed out waiting for a frame");
        };
        match msg {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<Envelope>(text.as_str())
            {
                Ok(envelope) => return envelope,
                Err(err) => panic!("received frame that does not decode: {err}: {text}"),
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Reads envelopes until one carries `event`, skipping the rest.
pub(crate) async fn recv_event(ws: &mut WsClient, event: EventKind) -> Envelope {
    for _ in 0..16 {
        let envelope = recv_envelope(ws).await;
        if envelope.event == event {
            return envelope;
        }
    }
    panic!("no {event:?} envelope within 16 frames");
}

/// Asserts that no data frame arrives for a short quiet period.
pub(crate) async fn assert_silent(ws: &mut WsClient) {
    let deadline = Instant::now() + QUIET;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            Ok(other) => panic!("expected silence, got {other:?}"),
        }
    }
}
