//! System endpoints: health check and presence listing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// One live session as seen by the registry.
#[derive(Debug, Serialize, ToSchema)]
struct PresenceEntry {
    /// Client identifier.
    key: String,
    /// Session id distinguishing concurrent connections under one key.
    session: String,
    /// When the session registered.
    connected_at: DateTime<Utc>,
}

/// Presence listing response.
#[derive(Debug, Serialize, ToSchema)]
struct PresenceResponse {
    /// Number of live sessions.
    online: usize,
    /// Sessions in registration order.
    sessions: Vec<PresenceEntry>,
}

/// `GET /presence` — Currently connected sessions.
#[utoipa::path(
    get,
    path = "/presence",
    tag = "System",
    summary = "List connected sessions",
    description = "Returns every live session in registration order. An identifier with several concurrent connections appears once per session.",
    responses(
        (status = 200, description = "Current registry membership", body = PresenceResponse),
    )
)]
pub async fn presence_handler(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<PresenceEntry> = state
        .registry
        .clients()
        .await
        .into_iter()
        .map(|client| PresenceEntry {
            key: client.key,
            session: client.session.to_string(),
            connected_at: client.connected_at,
        })
        .collect();

    (
        StatusCode::OK,
        Json(PresenceResponse {
            online: sessions.len(),
            sessions,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/presence", get(presence_handler))
}
