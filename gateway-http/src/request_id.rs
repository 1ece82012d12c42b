//! Request-id generation for [`tower_http::request_id`] (spec §4.8a):
//! forwards an inbound `x-request-id` header untouched, or mints a fresh
//! UUIDv4 when the client didn't send one.

use tower_http::request_id::{MakeRequestId, RequestId};

#[derive(Clone, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        axum::http::HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}
