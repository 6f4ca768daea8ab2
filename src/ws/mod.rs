//! WebSocket layer: envelope codec, write-safe connections, the
//! connection registry, and the presence protocol.
//!
//! The `/ws` endpoint upgrades to a duplex connection identified by a
//! caller-supplied token. Connections are tracked by the registry, which
//! announces presence changes to peers and answers status probes.

pub mod client;
pub mod connection;
pub mod envelope;
pub mod handler;
pub mod registry;
pub mod status;

pub use client::{Client, SessionId};
pub use connection::SafeConnection;
pub use envelope::{Envelope, EventKind};
pub use registry::PresenceRegistry;
