//! Tool-subsystem error type (spec §4.5). Most tool failures never become
//! `ApiError`s directly — they are caught at the executor boundary and fed
//! back to the model as a synthetic `ToolResult{is_error:true, ...}` — but
//! connection-level and configuration failures still need a typed shape.

use protocol::{ApiError, ApiErrorType};

#[derive(Debug, thiserror::Error)]
pub enum ToolSourceError {
    #[error("tool {0:?} not found")]
    NotFound(String),
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("json-rpc error {code}: {message}")]
    JsonRpc { code: i64, message: String },
}

impl From<ToolSourceError> for ApiError {
    fn from(err: ToolSourceError) -> Self {
        match &err {
            ToolSourceError::NotFound(name) => ApiError::not_found(format!("tool {name:?} not found")),
            ToolSourceError::InvalidInput(message) => {
                ApiError::new(ApiErrorType::InvalidRequest, message.clone())
            }
            ToolSourceError::Transport(_) | ToolSourceError::JsonRpc { .. } => {
                ApiError::new(ApiErrorType::ToolError, err.to_string())
            }
        }
    }
}
