//! Axum WebSocket upgrade handler, the connection-accept hook.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::status;
use crate::app_state::AppState;

/// Query parameters accepted by the `/ws` endpoint.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Client identifier, already verified upstream.
    #[serde(default)]
    token: String,
}

/// `GET /ws?token=<identifier>` — upgrade to WebSocket and register.
///
/// The identifier is taken as-is; a missing or empty token is rejected
/// before the upgrade. After the upgrade the connection is registered and
/// its read pump runs until the transport closes.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    if params.token.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing token").into_response();
    }

    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| async move {
        let client = match registry.register_conn(params.token, socket).await {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(%err, "rejecting connection: registry unavailable");
                return;
            }
        };

        let conn = Arc::clone(&client.conn);
        let handler_registry = registry.clone();
        client
            .read_pump(registry, move |envelope| {
                let registry = handler_registry.clone();
                let conn = Arc::clone(&conn);
                async move { status::dispatch(&registry, &conn, envelope).await }
            })
            .await;
    })
    .into_response()
}
