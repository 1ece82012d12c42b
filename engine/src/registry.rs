//! Dispatches a model-emitted tool call to the first registered executor
//! that claims it (spec §4.5, §4.7.2).

use std::sync::Arc;
use tools::ToolExecutor;

/// An ordered collection of tool executors (MCP sources, built-in providers,
/// or any other `ToolExecutor` the `gateway` bin wires in). Order matters
/// only as a tie-breaker when two executors would otherwise both claim the
/// same name, which should not happen in a well-configured deployment.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    executors: Vec<Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new(executors: Vec<Arc<dyn ToolExecutor>>) -> Self {
        Self { executors }
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Finds the executor willing to run `name`, if any. `can_execute` is
    /// async (MCP sources discover lazily), so this checks sequentially.
    pub async fn find(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        for executor in &self.executors {
            if executor.can_execute(name).await {
                return Some(Arc::clone(executor));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use protocol::{ToolCall, ToolResult};
    use tools::Kind;

    struct Stub(&'static str);

    #[async_trait]
    impl ToolExecutor for Stub {
        fn kind(&self) -> Kind {
            Kind::Function
        }

        async fn can_execute(&self, name: &str) -> bool {
            name == self.0
        }

        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult::ok(call.id.clone(), "stub")
        }
    }

    #[tokio::test]
    async fn finds_the_first_matching_executor() {
        let registry = ToolRegistry::new(vec![Arc::new(Stub("a")), Arc::new(Stub("b"))]);
        assert!(registry.find("b").await.is_some());
        assert!(registry.find("c").await.is_none());
    }
}
