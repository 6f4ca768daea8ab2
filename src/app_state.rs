//! Shared application state injected into all Axum handlers.

use crate::ws::PresenceRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live connection registry.
    pub registry: PresenceRegistry,
}
