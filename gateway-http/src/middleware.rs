//! Per-request auth middleware (spec §4.4 middleware pipeline steps 1-5),
//! wrapping [`authn::authenticate_and_rate_limit`] for axum. Injects the
//! resolved `Identity` and a tenant-scoped `StoreContext` as request
//! extensions for downstream handlers to pick up.

use crate::error::HttpError;
use crate::state::AppState;
use authn::{authenticate_and_rate_limit, AuthRequest};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use protocol::Identity;
use response_store::StoreContext;
use std::sync::Arc;

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let path = request.uri().path().to_string();
    let mut auth_request = AuthRequest::new(path);
    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            auth_request = auth_request.with_header(name.as_str(), value);
        }
    }

    let identity = authenticate_and_rate_limit(
        &auth_request,
        &state.auth_bypass,
        &state.auth_chain,
        state.rate_limiter.as_deref(),
    )
    .await
    .map_err(HttpError)?;

    let ctx = match identity.as_ref().and_then(Identity::tenant_id) {
        Some(tenant_id) if !tenant_id.is_empty() => StoreContext::for_tenant(tenant_id),
        _ => StoreContext::single_tenant(),
    };

    request.extensions_mut().insert(identity);
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
