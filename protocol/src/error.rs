//! Shared error taxonomy (spec §7). A single tagged error type crosses every
//! boundary that eventually reaches the HTTP adapter or an SSE `error` event;
//! narrower crate-local errors (store, tool, provider) convert into this one
//! at their public edge rather than leaking backend-specific types.

use serde::{Deserialize, Serialize};

/// Stable `type` string for the error taxonomy in spec §7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    Validation,
    InvalidRequest,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    TooManyRequests,
    Upstream,
    ToolError,
    Timeout,
    ServerError,
    ContentFilter,
}

impl ApiErrorType {
    /// Maps the error kind to the HTTP status code it is transported as,
    /// per spec §7. `Conflict` and `ToolError` never surface to an HTTP
    /// response directly (they are logged or fed back into the loop).
    pub fn http_status(self) -> u16 {
        match self {
            ApiErrorType::Validation => 400,
            ApiErrorType::InvalidRequest => 400,
            ApiErrorType::Authentication => 401,
            ApiErrorType::Authorization => 403,
            ApiErrorType::NotFound => 404,
            ApiErrorType::Conflict => 500,
            ApiErrorType::TooManyRequests => 429,
            ApiErrorType::Upstream => 502,
            ApiErrorType::ToolError => 500,
            ApiErrorType::Timeout => 504,
            ApiErrorType::ServerError => 500,
            ApiErrorType::ContentFilter => 400,
        }
    }
}

/// A single error, shaped for the wire (spec §6.1 error body) and for
/// `tracing::error!` fields.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl ApiError {
    pub fn new(error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            code: None,
            param: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn validation(message: impl Into<String>, param: impl Into<String>) -> Self {
        Self::new(ApiErrorType::Validation, message).with_param(param)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::Conflict, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::ServerError, message)
    }

    pub fn http_status(&self) -> u16 {
        self.error_type.http_status()
    }
}

/// Wire envelope for `{"error": {...}}` (spec §6.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ApiError,
}

impl From<ApiError> for ErrorBody {
    fn from(error: ApiError) -> Self {
        Self { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_matches_taxonomy_table() {
        assert_eq!(ApiErrorType::Validation.http_status(), 400);
        assert_eq!(ApiErrorType::Authentication.http_status(), 401);
        assert_eq!(ApiErrorType::Authorization.http_status(), 403);
        assert_eq!(ApiErrorType::NotFound.http_status(), 404);
        assert_eq!(ApiErrorType::TooManyRequests.http_status(), 429);
        assert_eq!(ApiErrorType::Upstream.http_status(), 502);
    }

    #[test]
    fn serializes_error_body_with_param() {
        let err = ApiError::validation("temperature out of range", "temperature");
        let body: ErrorBody = err.into();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["type"], "validation");
        assert_eq!(json["error"]["param"], "temperature");
        assert!(json["error"].get("code").is_none());
    }
}
