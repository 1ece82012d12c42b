//! `/v1/responses*` routes (spec §4.8).

use crate::error::HttpError;
use crate::sse::sse_response;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use engine::ResumableEngine;
use protocol::{
    CreateResponseRequest, ListOptions, ResponseId, SortOrder, SubmitToolOutputsRequest, StreamEvent,
};
use response_store::StoreContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// `GET /v1/responses` and `GET /v1/responses/{id}/input_items` share this
/// query-string shape (spec §4.2's `ListOptions`, spec §4.8's list routes).
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    after: Option<ResponseId>,
    #[serde(default)]
    before: Option<ResponseId>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    order: SortOrder,
}

impl From<ListQuery> for ListOptions {
    fn from(query: ListQuery) -> Self {
        ListOptions {
            after: query.after,
            before: query.before,
            limit: query.limit,
            model: query.model,
            order: query.order,
        }
    }
}

#[derive(Serialize)]
struct ListEnvelope<T> {
    data: Vec<T>,
    has_more: bool,
}

/// `POST /v1/responses`: creates a response, SSE if `request.stream` (spec
/// §4.8, §6.1). A `stream: true` request that fails before a `Response` is
/// ever constructed (validation, bad `previous_response_id`) has nothing
/// else to emit, so it surfaces as a single standalone `error` SSE event
/// (spec §7 propagation policy) rather than an HTTP error status — the
/// response headers (and the `text/event-stream` content type) are already
/// committed by the time the engine can fail.
pub async fn create_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<StoreContext>,
    Json(request): Json<CreateResponseRequest>,
) -> Result<Response, HttpError> {
    if request.stream {
        let (tx, rx) = mpsc::channel::<StreamEvent>(64);
        let engine = Arc::clone(&state.engine);
        tokio::spawn(async move {
            if let Err(err) = engine.create_response(&ctx, request, Some(tx.clone())).await {
                let _ = tx.send(StreamEvent::Error { sequence_number: 0, error: err }).await;
            }
        });
        Ok(sse_response(rx).into_response())
    } else {
        let response = state.engine.create_response(&ctx, request, None).await?;
        Ok(Json(response).into_response())
    }
}

/// `GET /v1/responses/{id}`.
pub async fn get_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<StoreContext>,
    Path(id): Path<ResponseId>,
) -> Result<Response, HttpError> {
    let store = store_or_server_error(&state)?;
    let response = store.get_response(&ctx, &id).await.map_err(protocol::ApiError::from)?;
    Ok(Json(response).into_response())
}

/// `DELETE /v1/responses/{id}`: 204 on success, 404 on absence (spec §4.8).
pub async fn delete_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<StoreContext>,
    Path(id): Path<ResponseId>,
) -> Result<StatusCode, HttpError> {
    let store = store_or_server_error(&state)?;
    store.delete_response(&ctx, &id).await.map_err(protocol::ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/responses`: paginated list (spec §4.8).
pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<StoreContext>,
    Query(query): Query<ListQuery>,
) -> Result<Response, HttpError> {
    let store = store_or_server_error(&state)?;
    let page = store
        .list_responses(&ctx, query.into())
        .await
        .map_err(protocol::ApiError::from)?;
    Ok(Json(ListEnvelope { data: page.responses, has_more: page.has_more }).into_response())
}

/// `GET /v1/responses/{id}/input_items`: paginated input items (spec §4.8).
pub async fn list_input_items(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<StoreContext>,
    Path(id): Path<ResponseId>,
    Query(query): Query<ListQuery>,
) -> Result<Response, HttpError> {
    let store = store_or_server_error(&state)?;
    let page = store
        .get_input_items(&ctx, &id, query.into())
        .await
        .map_err(protocol::ApiError::from)?;
    Ok(Json(ListEnvelope { data: page.items, has_more: page.has_more }).into_response())
}

/// `POST /v1/responses/{id}/submit_tool_outputs`: resumes a `requires_action`
/// response (spec §4.1, §4.7.4).
pub async fn submit_tool_outputs(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<StoreContext>,
    Path(id): Path<ResponseId>,
    Json(body): Json<SubmitToolOutputsRequest>,
) -> Result<Response, HttpError> {
    if body.stream {
        let (tx, rx) = mpsc::channel::<StreamEvent>(64);
        let engine = Arc::clone(&state.engine);
        tokio::spawn(async move {
            if let Err(err) = engine
                .submit_tool_outputs(&ctx, &id, body.tool_outputs, Some(tx.clone()))
                .await
            {
                let _ = tx.send(StreamEvent::Error { sequence_number: 0, error: err }).await;
            }
        });
        Ok(sse_response(rx).into_response())
    } else {
        let response = state
            .engine
            .submit_tool_outputs(&ctx, &id, body.tool_outputs, None)
            .await?;
        Ok(Json(response).into_response())
    }
}

fn store_or_server_error(
    state: &AppState,
) -> Result<&Arc<dyn response_store::ResponseStore>, HttpError> {
    state
        .store
        .as_ref()
        .ok_or_else(|| HttpError(protocol::ApiError::server_error("no response store configured")))
}
