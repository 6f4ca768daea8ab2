//! # presence-gateway
//!
//! WebSocket presence gateway: a live connection registry with
//! online/offline broadcast and status queries.
//!
//! The gateway accepts WebSocket connections carrying a pre-verified
//! client identifier, tracks which identifiers are currently connected,
//! announces presence changes to connected peers, and answers "is this
//! peer online" probes over the same connection. Identity verification,
//! user management, and message persistence live upstream; this service
//! only ever sees an identifier and a socket.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, REST)
//!     │
//!     ├── WS accept hook (ws::handler)
//!     ├── REST handlers (api/)
//!     │
//!     ├── Client read pumps (ws::client)
//!     │        │ membership commands
//!     │        ▼
//!     └── PresenceRegistry coordinator (ws::registry)
//! ```
//!
//! One coordinator task owns all membership mutation; each connection
//! runs its own read pump and talks to the coordinator only through a
//! bounded command channel.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod ws;
