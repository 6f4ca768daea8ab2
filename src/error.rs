//! Error taxonomy for the real-time layer.
//!
//! Only [`WsError::ConnectionClosed`] and [`WsError::Connection`] are fatal
//! to a connection: they end its read pump and trigger deregistration.
//! Every other variant leaves the connection running, and no error is ever
//! fatal to the registry coordinator.

/// Errors produced by the WebSocket layer.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// The peer closed the connection (close frame or end of stream).
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Transport-level read or write failure on the socket.
    #[error("connection error: {0}")]
    Connection(#[from] axum::Error),

    /// An envelope could not be serialized or an inbound frame could not
    /// be decoded.
    #[error("frame decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Well-formed envelope carrying a payload of the wrong shape for its
    /// event.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The registry coordinator has shut down and accepts no more
    /// commands.
    #[error("registry is closed")]
    RegistryClosed,
}
