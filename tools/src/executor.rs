//! `ToolExecutor` contract and tool-call filtering (spec §4.5).

use async_trait::async_trait;
use protocol::{ToolCall, ToolResult};
use std::collections::HashSet;

/// Which of the three executor kinds a tool belongs to (spec §4.5). Only
/// `Mcp` and `Sandbox` are ever dispatched by the engine; `Function` calls
/// with no server-side executor surface as `requires_action`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Function,
    Mcp,
    Sandbox,
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn kind(&self) -> Kind;

    /// Async because some executors (MCP) perform lazy, network-backed
    /// discovery on the first call (spec §4.5).
    async fn can_execute(&self, name: &str) -> bool;

    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// Intersects the model's emitted calls with `allowed_tools` (spec §4.5).
/// Calls outside the allow-list never reach an executor; they become
/// synthetic error results fed back to the model on the next turn.
pub fn filter_allowed_calls(
    calls: Vec<ToolCall>,
    allowed_tools: Option<&[String]>,
) -> (Vec<ToolCall>, Vec<ToolResult>) {
    let Some(allowed) = allowed_tools else {
        return (calls, vec![]);
    };
    if allowed.is_empty() {
        return (calls, vec![]);
    }

    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    let mut permitted = Vec::new();
    let mut rejected = Vec::new();

    for call in calls {
        if allowed.contains(call.name.as_str()) {
            permitted.push(call);
        } else {
            rejected.push(ToolResult::error(
                call.id,
                format!("tool {:?} is not in the allowed_tools list", call.name),
            ));
        }
    }

    (permitted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::CallId;

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: CallId::new(),
            name: name.to_string(),
            arguments: "{}".to_string(),
        }
    }

    #[test]
    fn no_allow_list_passes_everything_through() {
        let (permitted, rejected) = filter_allowed_calls(vec![call("web_search")], None);
        assert_eq!(permitted.len(), 1);
        assert!(rejected.is_empty());
    }

    #[test]
    fn disallowed_call_becomes_synthetic_error_result() {
        let (permitted, rejected) =
            filter_allowed_calls(vec![call("get_weather")], Some(&["web_search".to_string()]));
        assert!(permitted.is_empty());
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].is_error);
        assert!(rejected[0].output.contains("get_weather"));
    }

    #[test]
    fn mixed_calls_are_split_correctly() {
        let allowed = vec!["web_search".to_string()];
        let (permitted, rejected) =
            filter_allowed_calls(vec![call("web_search"), call("get_weather")], Some(&allowed));
        assert_eq!(permitted.len(), 1);
        assert_eq!(permitted[0].name, "web_search");
        assert_eq!(rejected.len(), 1);
    }
}
