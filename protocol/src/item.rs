//! Item, content part, and tool/usage/identity types (spec §3.2).
//!
//! Items are polymorphic: each carries `id`, `type`, `status`, and exactly
//! one payload keyed by its `type`. We model this the way the corpus models
//! OpenAI-Responses-shaped wire types: an internally tagged enum
//! (`#[serde(tag = "type", rename_all = "snake_case")]`) whose variant
//! fields sit alongside `id`/`status` in the JSON object — the common
//! idiomatic-Rust rendering of a discriminated union with shared fields.

use crate::ids::{CallId, ItemId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role for `MessageData`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Input-side content part (what the caller sends).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputImage {
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// Annotation over assistant output text (char-offset citation or similar).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub annotation_type: String,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Output-side content part (what the assistant produced).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContentPart {
    OutputText {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<Annotation>,
    },
    Refusal {
        refusal: String,
    },
}

/// The `message` payload of an `Item`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageData {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<OutputContentPart>,
}

impl MessageData {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::InputText { text: text.into() }],
            output: vec![],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![],
            output: vec![OutputContentPart::OutputText {
                text: text.into(),
                annotations: vec![],
            }],
        }
    }

    /// Flattens this message's text (input or output side) into one string,
    /// used when translating to chat messages (provider adapter).
    pub fn text(&self) -> String {
        if !self.output.is_empty() {
            self.output
                .iter()
                .filter_map(|p| match p {
                    OutputContentPart::OutputText { text, .. } => Some(text.as_str()),
                    OutputContentPart::Refusal { refusal } => Some(refusal.as_str()),
                })
                .collect::<Vec<_>>()
                .join("")
        } else {
            self.content
                .iter()
                .filter_map(|p| match p {
                    ContentPart::InputText { text } => Some(text.as_str()),
                    ContentPart::InputImage { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("")
        }
    }
}

/// Code interpreter execution output (image or log entry).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeInterpreterOutput {
    Image {
        file_id: String,
    },
    Logs {
        logs: String,
    },
}

/// The `code_interpreter_call` payload of an `Item`.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CodeInterpreterCallData {
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<CodeInterpreterOutput>,
}

/// Item status, tracked independently of `Response::status` (spec §3.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    Completed,
    Incomplete,
}

/// A polymorphic response item (spec §3.2). Known kinds get a typed variant;
/// any `type` containing `:` is an opaque extension passthrough (spec §4.7.4).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemPayload {
    #[serde(rename = "message")]
    Message { message: MessageData },
    #[serde(rename = "function_call")]
    FunctionCall {
        call_id: CallId,
        name: String,
        arguments: String,
    },
    #[serde(rename = "function_call_output")]
    FunctionCallOutput {
        call_id: CallId,
        output: String,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(rename = "reasoning")]
    Reasoning { reasoning: String },
    #[serde(rename = "code_interpreter_call")]
    CodeInterpreterCall {
        #[serde(flatten)]
        data: CodeInterpreterCallData,
    },
    #[serde(rename = "mcp_call")]
    McpCall {
        call_id: CallId,
        server: String,
        name: String,
        arguments: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(rename = "file_search_call")]
    FileSearchCall {
        call_id: CallId,
        query: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        results: Vec<Value>,
    },
    #[serde(rename = "web_search_call")]
    WebSearchCall {
        call_id: CallId,
        query: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Any `type` containing `:` (e.g. `acme:telemetry`); never validated
    /// beyond JSON well-formedness (spec §4.7.4).
    #[serde(untagged)]
    Extension {
        #[serde(rename = "type")]
        item_type: String,
        #[serde(flatten)]
        payload: serde_json::Map<String, Value>,
    },
}

impl ItemPayload {
    /// The wire `type` string for this payload.
    pub fn type_name(&self) -> &str {
        match self {
            ItemPayload::Message { .. } => "message",
            ItemPayload::FunctionCall { .. } => "function_call",
            ItemPayload::FunctionCallOutput { .. } => "function_call_output",
            ItemPayload::Reasoning { .. } => "reasoning",
            ItemPayload::CodeInterpreterCall { .. } => "code_interpreter_call",
            ItemPayload::McpCall { .. } => "mcp_call",
            ItemPayload::FileSearchCall { .. } => "file_search_call",
            ItemPayload::WebSearchCall { .. } => "web_search_call",
            ItemPayload::Extension { item_type, .. } => item_type.as_str(),
        }
    }

    /// An item's `type` is an extension iff it contains a colon (spec §3.2).
    pub fn is_extension(&self) -> bool {
        self.type_name().contains(':')
    }
}

/// A full response item: identity + status + payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub status: ItemStatus,
    #[serde(flatten)]
    pub payload: ItemPayload,
}

impl Item {
    pub fn new(status: ItemStatus, payload: ItemPayload) -> Self {
        Self {
            id: ItemId::new(),
            status,
            payload,
        }
    }

    pub fn message(role: Role, content: Vec<ContentPart>) -> Self {
        Self::new(
            ItemStatus::Completed,
            ItemPayload::Message {
                message: MessageData {
                    role,
                    content,
                    output: vec![],
                },
            },
        )
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(
            ItemStatus::Completed,
            ItemPayload::Message {
                message: MessageData::user_text(text),
            },
        )
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(
            ItemStatus::Completed,
            ItemPayload::Message {
                message: MessageData::assistant_text(text),
            },
        )
    }
}

/// A tool definition offered to the model (spec §3.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    Function,
}

/// Tool choice: auto / required / none / force a specific function.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Function {
        #[serde(rename = "type")]
        choice_type: ToolType,
        name: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceMode {
    Auto,
    Required,
    None,
}

impl Default for ToolChoice {
    fn default() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Auto)
    }
}

/// One model-emitted tool call, as surfaced by the provider adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: CallId,
    pub name: String,
    /// JSON-encoded arguments string; never parsed by the engine itself
    /// (spec §4.6 translation rules) — executors parse as needed.
    pub arguments: String,
}

/// Result of executing a `ToolCall`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: CallId,
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(call_id: CallId, output: impl Into<String>) -> Self {
        Self {
            call_id,
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: CallId, output: impl Into<String>) -> Self {
        Self {
            call_id,
            output: output.into(),
            is_error: true,
        }
    }

    /// Wraps this result as a `function_call_output` item (spec §3.2).
    pub fn into_item(self) -> Item {
        Item::new(
            ItemStatus::Completed,
            ItemPayload::FunctionCallOutput {
                call_id: self.call_id,
                output: self.output,
                is_error: self.is_error,
            },
        )
    }
}

/// Token usage for a response (spec §3.2).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Authenticated caller identity (spec §3.2). `metadata["tenant_id"]` is the
/// storage scoping key consumed by the store contract.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            service_tier: None,
            scopes: vec![],
            metadata: std::collections::HashMap::new(),
        }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.metadata.get("tenant_id").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **P1 (ID roundtrip)**: items round-trip through serde with all fields equal.
    #[test]
    fn item_message_roundtrip() {
        let item = Item::user_text("hi there");
        let json = serde_json::to_string(&item).unwrap();
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(item.id, back.id);
        match (&item.payload, &back.payload) {
            (ItemPayload::Message { message: a }, ItemPayload::Message { message: b }) => {
                assert_eq!(a.text(), b.text());
            }
            _ => panic!("expected message payload"),
        }
    }

    #[test]
    fn function_call_output_roundtrip_preserves_is_error() {
        let result = ToolResult::error(CallId::new(), "boom");
        let item = result.into_item();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "function_call_output");
        assert_eq!(json["is_error"], true);
        let back: Item = serde_json::from_value(json).unwrap();
        match back.payload {
            ItemPayload::FunctionCallOutput { is_error, .. } => assert!(is_error),
            _ => panic!("expected function_call_output"),
        }
    }

    #[test]
    fn extension_item_type_contains_colon() {
        let json = serde_json::json!({
            "id": "item_abcdefghijklmnopqrstuvw1",
            "status": "completed",
            "type": "acme:telemetry",
            "payload": {"latency_ms": 12}
        });
        let item: Item = serde_json::from_value(json).unwrap();
        assert!(item.payload.is_extension());
        assert_eq!(item.payload.type_name(), "acme:telemetry");
    }

    #[test]
    fn tool_choice_function_roundtrips() {
        let choice = ToolChoice::Function {
            choice_type: ToolType::Function,
            name: "get_weather".to_string(),
        };
        let json = serde_json::to_value(&choice).unwrap();
        assert_eq!(json["name"], "get_weather");
        let back: ToolChoice = serde_json::from_value(json).unwrap();
        match back {
            ToolChoice::Function { name, .. } => assert_eq!(name, "get_weather"),
            _ => panic!("expected function choice"),
        }
    }

    #[test]
    fn usage_add_accumulates() {
        let mut total = Usage::default();
        total.add(&Usage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        });
        total.add(&Usage {
            input_tokens: 2,
            output_tokens: 1,
            total_tokens: 3,
        });
        assert_eq!(total.total_tokens, 18);
    }
}
