//! One registered connection and its read pump.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection::SafeConnection;
use super::envelope::Envelope;
use super::registry::PresenceRegistry;
use crate::error::WsError;

/// Unique identifier for one registered session.
///
/// Client identifiers are caller-supplied and may repeat across concurrent
/// sessions, so the registry removes entries by session id: a read pump
/// tears down exactly its own entry and never a same-identifier sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Mints a new random session id (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live connection from the registry's point of view.
///
/// Cheap to clone; the registry stores clones in registration order while
/// the accept layer drives the read pump on its own clone.
#[derive(Debug, Clone)]
pub struct Client {
    /// Caller-supplied identifier, already verified upstream.
    pub key: String,
    /// Session id distinguishing concurrent connections under one key.
    pub session: SessionId,
    /// When the registration was accepted.
    pub connected_at: DateTime<Utc>,
    /// Shared handle to the underlying socket.
    pub conn: Arc<SafeConnection>,
}

impl Client {
    pub(crate) fn new(key: String, conn: Arc<SafeConnection>) -> Self {
        Self {
            key,
            session: SessionId::new(),
            connected_at: Utc::now(),
            conn,
        }
    }

    /// Consumes inbound frames until the transport fails or closes.
    ///
    /// Empty frames are skipped. Frames that do not decode as an
    /// [`Envelope`] are dropped. Errors returned by `handler` are logged
    /// and swallowed; only a transport-level read failure ends the loop.
    /// However the loop ends, the client deregisters itself from the
    /// registry and then closes its connection, exactly once; the panic
    /// path is covered by a drop guard.
    pub async fn read_pump<H, Fut>(self, registry: PresenceRegistry, handler: H)
    where
        H: Fn(Envelope) -> Fut,
        Fut: Future<Output = Result<(), WsError>>,
    {
        let guard = DeregisterGuard::new(registry, self.clone());
        loop {
            let raw = match self.conn.read_frame().await {
                Ok(raw) => raw,
                Err(WsError::ConnectionClosed) => break,
                Err(err) => {
                    tracing::debug!(key = %self.key, %err, "read pump transport failure");
                    break;
                }
            };
            if raw.is_empty() {
                continue;
            }
            let envelope: Envelope = match serde_json::from_slice(&raw) {
                Ok(envelope) => envelope,
                Err(err) => {
                    tracing::debug!(key = %self.key, %err, "dropping undecodable frame");
                    continue;
                }
            };
            if let Err(err) = handler(envelope).await {
                tracing::debug!(key = %self.key, %err, "handler error swallowed");
            }
        }
        guard.finish().await;
    }
}

/// Guarantees deregistration on every exit path of the read pump.
///
/// The normal path goes through [`DeregisterGuard::finish`], which
/// deregisters and then closes the socket. If the pump unwinds instead,
/// `Drop` still enqueues the deregistration without blocking; the socket
/// itself closes once the last handle to it drops.
struct DeregisterGuard {
    inner: Option<(PresenceRegistry, Client)>,
}

impl DeregisterGuard {
    fn new(registry: PresenceRegistry, client: Client) -> Self {
        Self {
            inner: Some((registry, client)),
        }
    }

    async fn finish(mut self) {
        if let Some((registry, client)) = self.inner.take() {
            if let Err(err) = registry.unregister_conn(&client).await {
                tracing::warn!(key = %client.key, %err, "deregistration failed");
            }
            if let Err(err) = client.conn.close().await {
                tracing::debug!(key = %client.key, %err, "close after read pump exit");
            }
        }
    }
}

impl Drop for DeregisterGuard {
    fn drop(&mut self) {
        if let Some((registry, client)) = self.inner.take() {
            registry.try_unregister(&client);
        }
    }
}
