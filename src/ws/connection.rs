//! Write-safe wrapper around one WebSocket.
//!
//! [`SafeConnection`] owns both halves of a single socket. The write half
//! is guarded by a [`tokio::sync::Mutex`] so that concurrent logical
//! writers (the owning client's own replies and registry-initiated
//! broadcasts) always emit whole frames. The read half has exactly one
//! consumer, the owning client's read pump.

use std::fmt;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use super::envelope::Envelope;
use crate::error::WsError;

/// One live WebSocket, split into its two directions.
///
/// Created at connection-accept time, closed when the read pump exits,
/// never reused afterward.
pub struct SafeConnection {
    writer: Mutex<SplitSink<WebSocket, Message>>,
    reader: Mutex<SplitStream<WebSocket>>,
}

impl SafeConnection {
    /// Wraps a raw socket fresh out of the HTTP upgrade.
    #[must_use]
    pub fn new(socket: WebSocket) -> Self {
        let (writer, reader) = socket.split();
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        }
    }

    /// Serializes `envelope` and sends it as a single text frame.
    ///
    /// The write lock is held across serialization and send, so two
    /// concurrent `write` calls never interleave bytes of two frames.
    ///
    /// # Errors
    ///
    /// [`WsError::Decode`] if the envelope cannot be serialized and
    /// [`WsError::Connection`] on transport failure. A transport failure
    /// is fatal for this connection: the caller must tear the client down.
    pub async fn write(&self, envelope: &Envelope) -> Result<(), WsError> {
        let json = serde_json::to_string(envelope)?;
        let mut writer = self.writer.lock().await;
        writer.send(Message::text(json)).await?;
        Ok(())
    }

    /// Blocks until the next data frame arrives and returns its raw bytes.
    ///
    /// Ping and pong frames are skipped. Reading is independent of the
    /// write lock; read and write are separate directions of the socket.
    ///
    /// # Errors
    ///
    /// [`WsError::ConnectionClosed`] when the peer sends a close frame or
    /// the stream ends, [`WsError::Connection`] on transport failure.
    pub async fn read_frame(&self) -> Result<Vec<u8>, WsError> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_bytes().to_vec()),
                Some(Ok(Message::Binary(bytes))) => return Ok(bytes.to_vec()),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Err(WsError::ConnectionClosed),
                Some(Err(err)) => return Err(WsError::Connection(err)),
            }
        }
    }

    /// Closes the write half of the socket.
    ///
    /// Call at most once, after the read pump has exited.
    ///
    /// # Errors
    ///
    /// [`WsError::Connection`] if the close handshake fails; by then the
    /// connection is unusable either way.
    pub async fn close(&self) -> Result<(), WsError> {
        let mut writer = self.writer.lock().await;
        writer.close().await?;
        Ok(())
    }
}

impl fmt::Debug for SafeConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeConnection").finish_non_exhaustive()
    }
}
