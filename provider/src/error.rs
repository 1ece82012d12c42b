//! Provider-local error type; converts to `ApiError::Upstream` at the edge.

use protocol::{ApiError, ApiErrorType};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend response was not valid JSON: {0}")]
    InvalidResponse(String),
    #[error("backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::new(ApiErrorType::Upstream, err.to_string())
    }
}
