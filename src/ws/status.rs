//! Presence probe protocol.
//!
//! The one inbound event the gateway interprets: a `status` envelope
//! carrying a list of identifiers to probe. The reply goes out on the
//! same connection that asked.

use serde_json::{Map, Value};

use super::connection::SafeConnection;
use super::envelope::{Envelope, EventKind};
use super::registry::PresenceRegistry;
use crate::error::WsError;

/// Dispatches one decoded inbound envelope.
///
/// Events other than `status` carry no inbound meaning and are ignored.
///
/// # Errors
///
/// [`WsError::Protocol`] when a status payload is not a list; the
/// `statusFail` reply has already been written by the time this returns,
/// so the read pump only has the error left to log. Transport failures
/// while replying surface as [`WsError::Connection`].
pub async fn dispatch(
    registry: &PresenceRegistry,
    conn: &SafeConnection,
    envelope: Envelope,
) -> Result<(), WsError> {
    match envelope.event {
        EventKind::Status => handle_status(registry, conn, &envelope.data).await,
        _ => Ok(()),
    }
}

async fn handle_status(
    registry: &PresenceRegistry,
    conn: &SafeConnection,
    payload: &Value,
) -> Result<(), WsError> {
    let Some(keys) = payload.as_array() else {
        conn.write(&Envelope::status_fail(
            "status payload must be a list of identifiers",
        ))
        .await?;
        return Err(WsError::Protocol(
            "status payload must be a list of identifiers".to_string(),
        ));
    };

    let mut result = Map::new();
    for value in keys {
        let key = identifier_text(value);
        let online = registry.contains(&key).await;
        result.insert(key, Value::Bool(online));
    }
    conn.write(&Envelope::status_result(result)).await
}

/// Renders one probed payload element as an identifier.
///
/// Identifiers are expected to be strings; anything else probes under its
/// JSON text rendering and comes back offline unless a client registered
/// under exactly that text.
fn identifier_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
