//! axum HTTP adapter for the OpenResponses API (spec §4.8, §4.8a). Builds a
//! single [`axum::Router`] over the `gateway-http` route handlers, wired with
//! the auth/rate-limit middleware, request-id propagation, and the tool
//! providers' dynamically contributed management routes.

pub mod error;
pub mod middleware;
pub mod request_id;
pub mod routes;
pub mod sse;
pub mod state;

pub use error::HttpError;
pub use state::AppState;

use axum::extract::Extension;
use axum::http::HeaderName;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use request_id::MakeRequestUuid;

/// Builds the full route table, ready to be served with `axum::serve`.
pub fn router(state: Arc<AppState>) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");
    let metrics_path = state.metrics_path.clone();

    let mut app = Router::new()
        .route(
            "/v1/responses",
            post(routes::responses::create_response).get(routes::responses::list_responses),
        )
        .route(
            "/v1/responses/:id",
            get(routes::responses::get_response).delete(routes::responses::delete_response),
        )
        .route(
            "/v1/responses/:id/input_items",
            get(routes::responses::list_input_items),
        )
        .route(
            "/v1/responses/:id/submit_tool_outputs",
            post(routes::responses::submit_tool_outputs),
        )
        .route("/healthz", get(routes::health::healthz))
        .route("/readyz", get(routes::health::readyz))
        .route(&metrics_path, get(routes::health::metrics));

    for route in &state.management_routes {
        let route = Arc::clone(route);
        let path = route.path().to_string();
        let method = route.method().to_ascii_uppercase();
        let handler = move |Extension(ctx): Extension<response_store::StoreContext>,
                             Json(body): Json<serde_json::Value>| {
            let route = Arc::clone(&route);
            async move {
                route
                    .handle(&ctx.tenant, body)
                    .await
                    .map(Json)
                    .map_err(HttpError)
            }
        };
        app = match method.as_str() {
            "GET" => app.route(&path, get(handler)),
            "POST" => app.route(&path, post(handler)),
            "PUT" => app.route(&path, put(handler)),
            "DELETE" => app.route(&path, delete(handler)),
            "PATCH" => app.route(&path, patch(handler)),
            other => {
                tracing::warn!(method = %other, path = %path, "skipping management route with unsupported method");
                app
            }
        };
    }

    app.layer(axum::middleware::from_fn_with_state(
        Arc::clone(&state),
        middleware::auth_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    .with_state(state)
}
