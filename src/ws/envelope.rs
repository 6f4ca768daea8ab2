//! Wire envelope exchanged over a live connection.
//!
//! Every frame is a JSON object of the shape `{"event": ..., "data": ...}`.
//! The event names form a closed set; the payload shape depends on the
//! event. Envelopes are immutable once constructed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator for the envelope's `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Server → Client: a peer came online. Payload: the peer's identifier.
    Online,
    /// Server → Client: a peer went offline. Payload: the peer's identifier.
    Offline,
    /// Client → Server: presence probe. Payload: a list of identifiers.
    Status,
    /// Server → Client: a status probe could not be interpreted.
    /// Payload: a human-readable message.
    StatusFail,
    /// Server → Client: answer to a status probe. Payload: an object
    /// mapping each probed identifier to a boolean.
    StatusResult,
}

/// One message on the wire: a tagged event plus its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Event discriminator.
    pub event: EventKind,
    /// Event-specific payload.
    pub data: Value,
}

impl Envelope {
    /// Presence announcement for a peer that just came online.
    #[must_use]
    pub fn online(key: &str) -> Self {
        Self {
            event: EventKind::Online,
            data: Value::String(key.to_string()),
        }
    }

    /// Presence announcement for a peer that just went offline.
    #[must_use]
    pub fn offline(key: &str) -> Self {
        Self {
            event: EventKind::Offline,
            data: Value::String(key.to_string()),
        }
    }

    /// Reply to a status probe whose payload could not be interpreted.
    #[must_use]
    pub fn status_fail(message: &str) -> Self {
        Self {
            event: EventKind::StatusFail,
            data: Value::String(message.to_string()),
        }
    }

    /// Reply mapping each probed identifier to its current presence.
    #[must_use]
    pub fn status_result(result: Map<String, Value>) -> Self {
        Self {
            event: EventKind::StatusResult,
            data: Value::Object(result),
        }
    }
}
