//! Connection registry and its coordinator task.
//!
//! [`PresenceRegistry`] tracks every live connection in registration
//! order. All membership mutation flows through a bounded command channel
//! consumed by a single coordinator task; every read path takes the same
//! [`tokio::sync::RwLock`] the coordinator writes under, so readers never
//! observe a half-applied mutation.
//!
//! Identifier uniqueness is deliberately not enforced: one identifier may
//! hold several concurrent sessions, and targeted sends fan out to all of
//! them. Presence announcements are edge-triggered: `online` goes out
//! when an identifier gains its first session, `offline` when it loses
//! its last. Broadcasts therefore always agree with what
//! [`PresenceRegistry::contains`] answers.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

use super::client::Client;
use super::connection::SafeConnection;
use super::envelope::Envelope;
use crate::error::WsError;

/// Membership commands processed by the coordinator.
#[derive(Debug)]
enum Command {
    /// Add a client and announce it to its peers.
    Register(Client),
    /// Remove one session and announce the identifier if it was the last.
    Unregister(Client),
    /// Stop the coordinator once every earlier command has been processed.
    Shutdown,
}

/// Cloneable handle to the connection registry.
///
/// Membership mutation is owned by a single coordinator task fed through
/// a bounded command channel (backpressure on registration bursts). Read
/// operations are served directly from the shared sequence under a read
/// lock.
#[derive(Debug, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    /// Live connections in registration order.
    clients: RwLock<Vec<Client>>,
    /// Producer side of the coordinator's command channel.
    cmd_tx: mpsc::Sender<Command>,
}

impl PresenceRegistry {
    /// Starts the coordinator task.
    ///
    /// `command_buffer` bounds the number of pending membership commands;
    /// enqueueing waits when the buffer is full. The returned handle
    /// resolves once [`shutdown`](Self::shutdown) has been processed.
    #[must_use]
    pub fn start(command_buffer: usize) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(command_buffer.max(1));
        let inner = Arc::new(RegistryInner {
            clients: RwLock::new(Vec::new()),
            cmd_tx,
        });
        let registry = Self {
            inner: Arc::clone(&inner),
        };
        let coordinator = tokio::spawn(coordinate(inner, cmd_rx));
        (registry, coordinator)
    }

    /// Wraps `socket`, enqueues the registration, and returns the client.
    ///
    /// Returns as soon as the command is enqueued, without waiting for the
    /// coordinator to process it; the caller must start the client's read
    /// pump immediately. Until the command is processed the client is not
    /// yet visible to lookups; eventual consistency is accepted here.
    ///
    /// # Errors
    ///
    /// [`WsError::RegistryClosed`] if the coordinator has shut down.
    pub async fn register_conn(&self, key: String, socket: WebSocket) -> Result<Client, WsError> {
        let conn = Arc::new(SafeConnection::new(socket));
        let client = Client::new(key, conn);
        self.inner
            .cmd_tx
            .send(Command::Register(client.clone()))
            .await
            .map_err(|_| WsError::RegistryClosed)?;
        Ok(client)
    }

    /// Enqueues removal of exactly `client`'s session.
    ///
    /// Removing a session that is already gone is a no-op at processing
    /// time.
    ///
    /// # Errors
    ///
    /// [`WsError::RegistryClosed`] if the coordinator has shut down.
    pub async fn unregister_conn(&self, client: &Client) -> Result<(), WsError> {
        self.inner
            .cmd_tx
            .send(Command::Unregister(client.clone()))
            .await
            .map_err(|_| WsError::RegistryClosed)
    }

    /// Non-blocking variant of [`unregister_conn`](Self::unregister_conn)
    /// for contexts that cannot await, such as drop handlers.
    pub(crate) fn try_unregister(&self, client: &Client) {
        if let Err(err) = self
            .inner
            .cmd_tx
            .try_send(Command::Unregister(client.clone()))
        {
            tracing::warn!(key = %client.key, %err, "deregistration command dropped");
        }
    }

    /// True if any live session carries `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner
            .clients
            .read()
            .await
            .iter()
            .any(|c| c.key == key)
    }

    /// Earliest-registered client carrying `key`, if any.
    pub async fn find_client(&self, key: &str) -> Option<Client> {
        self.inner
            .clients
            .read()
            .await
            .iter()
            .find(|c| c.key == key)
            .cloned()
    }

    /// Snapshot of all identifiers in registration order.
    ///
    /// An identifier with several sessions appears once per session.
    pub async fn find_client_keys(&self) -> Vec<String> {
        self.inner
            .clients
            .read()
            .await
            .iter()
            .map(|c| c.key.clone())
            .collect()
    }

    /// Snapshot of all clients in registration order.
    pub async fn clients(&self) -> Vec<Client> {
        self.inner.clients.read().await.iter().cloned().collect()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.clients.read().await.len()
    }

    /// True if no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.clients.read().await.is_empty()
    }

    /// Writes `envelope` to every live connection, best effort.
    ///
    /// Per-peer write failures are logged and skipped; one unreachable
    /// peer never blocks delivery to the rest.
    pub async fn send(&self, envelope: &Envelope) {
        let targets = self.clients().await;
        deliver(&targets, envelope).await;
    }

    /// Writes `envelope` to every session registered under `key`, best
    /// effort.
    pub async fn send_to(&self, envelope: &Envelope, key: &str) {
        let targets: Vec<Client> = {
            let clients = self.inner.clients.read().await;
            clients.iter().filter(|c| c.key == key).cloned().collect()
        };
        deliver(&targets, envelope).await;
    }

    /// Asks the coordinator to stop.
    ///
    /// Commands enqueued before this call are processed first; anything
    /// enqueued afterwards is discarded when the coordinator exits. Await
    /// the handle returned by [`start`](Self::start) to join it.
    pub async fn shutdown(&self) {
        if self.inner.cmd_tx.send(Command::Shutdown).await.is_err() {
            tracing::debug!("registry already shut down");
        }
    }
}

/// Single-writer loop: the only place the membership sequence mutates.
async fn coordinate(inner: Arc<RegistryInner>, mut cmd_rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            Command::Register(client) => register(&inner, client).await,
            Command::Unregister(client) => unregister(&inner, client).await,
            Command::Shutdown => break,
        }
    }
    tracing::info!("registry coordinator stopped");
}

async fn register(inner: &RegistryInner, client: Client) {
    let (first_session, peers) = {
        let mut clients = inner.clients.write().await;
        let first = !clients.iter().any(|c| c.key == client.key);
        clients.push(client.clone());
        (first, clients.clone())
    };
    tracing::info!(key = %client.key, session = %client.session, "client registered");
    if first_session {
        notify_peers(&peers, &client.key, &Envelope::online(&client.key)).await;
    }
}

async fn unregister(inner: &RegistryInner, client: Client) {
    let outcome = {
        let mut clients = inner.clients.write().await;
        let before = clients.len();
        clients.retain(|c| c.session != client.session);
        if clients.len() == before {
            None
        } else {
            let last = !clients.iter().any(|c| c.key == client.key);
            Some((last, clients.clone()))
        }
    };
    let Some((last_session, peers)) = outcome else {
        return;
    };
    tracing::info!(key = %client.key, session = %client.session, "client deregistered");
    if last_session {
        notify_peers(&peers, &client.key, &Envelope::offline(&client.key)).await;
    }
}

/// Announces a presence change to every peer not sharing the changed key.
///
/// Notification order follows the membership snapshot taken while the
/// command was applied; the sequence lock is not held across the writes.
async fn notify_peers(peers: &[Client], changed_key: &str, envelope: &Envelope) {
    for client in peers {
        if client.key == changed_key {
            continue;
        }
        if let Err(err) = client.conn.write(envelope).await {
            tracing::debug!(key = %client.key, %err, "presence notification dropped");
        }
    }
}

/// Best-effort fan-out; a failing peer never blocks the rest.
async fn deliver(targets: &[Client], envelope: &Envelope) {
    for client in targets {
        if let Err(err) = client.conn.write(envelope).await {
            tracing::debug!(key = %client.key, %err, "dropping send to unreachable peer");
        }
    }
}
