//! Maps `protocol::ApiError` onto the HTTP wire shape (spec §6.1, §7):
//! `{status_code, {"error": {...}}}`. Every fallible handler in this crate
//! returns `Result<_, HttpError>` so `?` just works against `ApiError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use protocol::{ApiError, ErrorBody};

pub struct HttpError(pub ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = self.0.into();
        (status, Json(body)).into_response()
    }
}
