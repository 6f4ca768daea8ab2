//! REST API layer: read-only views over the registry.
//!
//! The REST surface never mutates membership; all mutation happens
//! through the WebSocket lifecycle.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete REST router.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(handlers::system::routes())
}
