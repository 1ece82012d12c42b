//! Inbound request shapes (spec §4.1, §6.1): `CreateResponse` body and list
//! pagination options.

use crate::ids::ResponseId;
use crate::item::{Item, ToolChoice, ToolDefinition};
use serde::{Deserialize, Serialize};

/// Either a bare string prompt or a list of input items (spec §4.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Input {
    Text(String),
    Items(Vec<Item>),
}

fn default_store() -> bool {
    true
}

impl Input {
    /// Normalizes a bare string into a single user-message item list.
    pub fn into_items(self) -> Vec<Item> {
        match self {
            Input::Text(text) => vec![Item::user_text(text)],
            Input::Items(items) => items,
        }
    }
}

/// `POST /v1/responses` request body (spec §4.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateResponseRequest {
    pub model: String,
    pub input: Input,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<ResponseId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Restricts which tool names the model may invoke this turn; absent
    /// means all of `tools` are eligible (spec §4.5 tool filtering).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// Caller-supplied policy name for truncating an over-long reconstructed
    /// chain before the first turn (spec §9 open question 3); `None` selects
    /// the engine's default no-op policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<String>,
    /// Whether to persist the finished response (spec §4.7.3). Defaults to
    /// `true`, matching the OpenResponses convention.
    #[serde(default = "default_store")]
    pub store: bool,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// `POST /v1/responses/{id}/submit_tool_outputs` body (spec §4.1, §6.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<crate::item::ToolResult>,
    #[serde(default)]
    pub stream: bool,
}

/// Cursor-paginated list query params (spec §4.2 `ListResponses`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<ResponseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<ResponseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl ListOptions {
    pub fn limit_or_default(&self, default: u32, max: u32) -> u32 {
        self.limit.unwrap_or(default).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_input_normalizes_to_single_user_item() {
        let req: CreateResponseRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-test",
            "input": "hello"
        }))
        .unwrap();
        let items = req.input.into_items();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn item_list_input_passes_through() {
        let req: CreateResponseRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-test",
            "input": [
                {"id": "item_abcdefghijklmnopqrstuvw1", "status": "completed", "type": "message",
                 "message": {"role": "user", "content": [{"type": "input_text", "text": "hi"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(req.input.into_items().len(), 1);
    }

    #[test]
    fn list_options_limit_is_clamped_to_max() {
        let opts = ListOptions {
            limit: Some(500),
            ..ListOptions::default()
        };
        assert_eq!(opts.limit_or_default(20, 100), 100);
    }

    #[test]
    fn list_options_uses_default_when_absent() {
        let opts = ListOptions::default();
        assert_eq!(opts.limit_or_default(20, 100), 20);
    }
}
