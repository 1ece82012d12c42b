//! `FunctionProvider`: the richer contract built-in tool providers implement
//! (spec §4.5), on top of the plain `ToolExecutor` contract.

use crate::executor::ToolExecutor;
use async_trait::async_trait;
use protocol::{ApiError, ToolDefinition};

/// A tenant-scoped management endpoint a provider wants mounted under the
/// HTTP adapter (e.g. vector store CRUD for `file_search`). Kept
/// transport-agnostic: JSON in, JSON out, the HTTP adapter crate wraps it
/// into an axum handler and applies the auth middleware.
#[async_trait]
pub trait ManagementRoute: Send + Sync {
    fn method(&self) -> &str;
    fn path(&self) -> &str;
    async fn handle(&self, tenant: &str, body: serde_json::Value) -> Result<serde_json::Value, ApiError>;
}

/// A named observability counter/gauge a provider exposes. The
/// `/metrics` route collects a snapshot from every registered collector;
/// encoding into a specific metrics wire format is the HTTP adapter's job.
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;
    fn snapshot(&self) -> serde_json::Value;
}

/// Built-in tool providers (`web_search`, `code_interpreter`, `file_search`)
/// implement this in addition to `ToolExecutor` (spec §4.5).
#[async_trait]
pub trait FunctionProvider: ToolExecutor {
    fn name(&self) -> &str;

    /// Tool definitions merged into the request's tool set at every turn.
    fn tools(&self) -> Vec<ToolDefinition>;

    fn routes(&self) -> Vec<Box<dyn ManagementRoute>> {
        vec![]
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![]
    }

    async fn close(&self) -> Result<(), ApiError> {
        Ok(())
    }
}
