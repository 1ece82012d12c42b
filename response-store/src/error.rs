//! Store-local error type (spec §4.2). Converts into `protocol::ApiError`
//! at the store's public edge so callers never match on storage internals.

use protocol::{ApiError, ApiErrorType};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("response not found")]
    NotFound,
    #[error("conflict saving response: {0}")]
    Conflict(String),
    #[error("store backend error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("response not found"),
            StoreError::Conflict(message) => ApiError::conflict(message),
            StoreError::Internal(message) => ApiError::new(ApiErrorType::ServerError, message),
        }
    }
}
