//! `/healthz`, `/readyz`, `/metrics` (spec §4.8a): bypass auth, never
//! tenant-scoped.

use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Ready only once a configured store answers its own health check; a
/// deployment with no store configured is always ready.
pub async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    if let Some(store) = &state.store {
        if let Err(err) = store.health_check().await {
            return (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": err.to_string() })),
            )
                .into_response();
        }
    }
    Json(json!({ "status": "ok" })).into_response()
}

/// Text exposition of every registered collector's snapshot (spec §4.8a:
/// the core only owns the trait and the route; Prometheus/OTel encoding is
/// an external collaborator's concern, so this is a minimal JSON-per-line
/// rendering rather than a real Prometheus exposition format).
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut body = String::new();
    for collector in &state.collectors {
        body.push_str("# ");
        body.push_str(collector.name());
        body.push('\n');
        body.push_str(&collector.snapshot().to_string());
        body.push('\n');
    }
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
