//! OpenAI chat-completions wire shapes and the `Item` <-> chat message
//! translation rules (spec §4.6).

use protocol::{ContentPart, Item, ItemPayload, OutputContentPart, Role};
use serde::{Deserialize, Serialize};

/// A chat message's `content`: bare text collapses to a string; a message
/// with more than one part (e.g. text + image) is sent as an array, the
/// same collapsing rule most OpenAI-compatible backends apply.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    Text { text: String },
    ImageUrl { image_url: ChatImageUrl },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatImageUrl {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ChatToolCallFunction,
}

/// One entry of the `messages` array sent to an OpenAI-compatible backend.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ChatContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, text: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(ChatContent::Text(text)),
            ..Default::default()
        }
    }
}

fn input_parts_to_chat_content(parts: &[ContentPart]) -> ChatContent {
    if let [ContentPart::InputText { text }] = parts {
        return ChatContent::Text(text.clone());
    }
    ChatContent::Parts(
        parts
            .iter()
            .map(|p| match p {
                ContentPart::InputText { text } => ChatContentPart::Text { text: text.clone() },
                ContentPart::InputImage { image_url, file_id, .. } => ChatContentPart::ImageUrl {
                    image_url: ChatImageUrl {
                        url: image_url
                            .clone()
                            .or_else(|| file_id.clone())
                            .unwrap_or_default(),
                    },
                },
            })
            .collect(),
    )
}

/// Translates a flattened, chronologically ordered item list into the chat
/// message array a `/v1/chat/completions`-shaped backend expects (spec §4.6).
///
/// `reasoning`, `*_call`, and extension items carry no direct chat-message
/// analogue; reasoning and extension items are dropped (they are an engine
/// / observability concern, not something the backend model ever re-reads),
/// while tool-shaped calls (function, mcp, code interpreter, web/file search)
/// round-trip as a synthetic `assistant` tool_call paired with a `tool`
/// message carrying its output, so the model sees its own prior tool use.
pub fn items_to_chat_messages(items: &[Item], instructions: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(items.len() + 1);
    if let Some(instructions) = instructions {
        if !instructions.is_empty() {
            messages.push(ChatMessage::text("system", instructions.to_string()));
        }
    }

    for item in items {
        match &item.payload {
            ItemPayload::Message { message } => {
                if !message.output.is_empty() {
                    let has_refusal = message
                        .output
                        .iter()
                        .any(|p| matches!(p, OutputContentPart::Refusal { .. }));
                    if has_refusal {
                        messages.push(ChatMessage::text("assistant", message.text()));
                    } else {
                        messages.push(ChatMessage::text(
                            role_str(message.role),
                            message.text(),
                        ));
                    }
                } else {
                    let role = role_str(message.role);
                    messages.push(ChatMessage {
                        role: role.to_string(),
                        content: Some(input_parts_to_chat_content(&message.content)),
                        ..Default::default()
                    });
                }
            }
            ItemPayload::FunctionCall { call_id, name, arguments } => {
                messages.push(tool_call_message(call_id.to_string(), name.clone(), arguments.clone()));
            }
            ItemPayload::FunctionCallOutput { call_id, output, .. } => {
                messages.push(tool_result_message(call_id.to_string(), output.clone()));
            }
            ItemPayload::McpCall { call_id, name, arguments, output, .. } => {
                messages.push(tool_call_message(call_id.to_string(), name.clone(), arguments.clone()));
                if let Some(output) = output {
                    messages.push(tool_result_message(call_id.to_string(), output.clone()));
                }
            }
            ItemPayload::WebSearchCall { call_id, query, output } => {
                messages.push(tool_call_message(
                    call_id.to_string(),
                    "web_search".to_string(),
                    serde_json::json!({ "query": query }).to_string(),
                ));
                if let Some(output) = output {
                    messages.push(tool_result_message(call_id.to_string(), output.clone()));
                }
            }
            ItemPayload::FileSearchCall { call_id, query, results } => {
                messages.push(tool_call_message(
                    call_id.to_string(),
                    "file_search".to_string(),
                    serde_json::json!({ "query": query }).to_string(),
                ));
                let summary = serde_json::to_string(results).unwrap_or_default();
                messages.push(tool_result_message(call_id.to_string(), summary));
            }
            ItemPayload::CodeInterpreterCall { data } => {
                messages.push(tool_call_message(
                    item.id.to_string(),
                    "code_interpreter".to_string(),
                    serde_json::json!({ "code": data.code }).to_string(),
                ));
                let summary = serde_json::to_string(&data.outputs).unwrap_or_default();
                messages.push(tool_result_message(item.id.to_string(), summary));
            }
            ItemPayload::Reasoning { .. } => {}
            ItemPayload::Extension { .. } => {}
        }
    }

    messages
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn tool_call_message(call_id: String, name: String, arguments: String) -> ChatMessage {
    ChatMessage {
        role: "assistant".to_string(),
        content: None,
        tool_calls: Some(vec![ChatToolCall {
            id: call_id,
            kind: "function".to_string(),
            function: ChatToolCallFunction { name, arguments },
        }]),
        tool_call_id: None,
        name: None,
    }
}

fn tool_result_message(call_id: String, output: String) -> ChatMessage {
    ChatMessage {
        role: "tool".to_string(),
        content: Some(ChatContent::Text(output)),
        tool_calls: None,
        tool_call_id: Some(call_id),
        name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{CallId, ItemStatus, MessageData};

    #[test]
    fn bare_text_message_collapses_to_string_content() {
        let item = Item::user_text("hello there");
        let messages = items_to_chat_messages(std::slice::from_ref(&item), None);
        match &messages[0].content {
            Some(ChatContent::Text(t)) => assert_eq!(t, "hello there"),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[test]
    fn multimodal_input_becomes_a_parts_array() {
        let item = Item::message(
            Role::User,
            vec![
                ContentPart::InputText { text: "what is this?".to_string() },
                ContentPart::InputImage {
                    image_url: Some("https://example.com/cat.png".to_string()),
                    file_id: None,
                    detail: None,
                },
            ],
        );
        let messages = items_to_chat_messages(std::slice::from_ref(&item), None);
        match &messages[0].content {
            Some(ChatContent::Parts(parts)) => assert_eq!(parts.len(), 2),
            other => panic!("expected parts content, got {other:?}"),
        }
    }

    #[test]
    fn instructions_become_a_leading_system_message() {
        let messages = items_to_chat_messages(&[], Some("be terse"));
        assert_eq!(messages[0].role, "system");
    }

    #[test]
    fn function_call_and_output_round_trip_as_assistant_then_tool_messages() {
        let call_id = CallId::new();
        let call = Item::new(
            ItemStatus::Completed,
            ItemPayload::FunctionCall {
                call_id: call_id.clone(),
                name: "get_weather".to_string(),
                arguments: r#"{"city":"nyc"}"#.to_string(),
            },
        );
        let output = Item::new(
            ItemStatus::Completed,
            ItemPayload::FunctionCallOutput {
                call_id: call_id.clone(),
                output: "72F and sunny".to_string(),
                is_error: false,
            },
        );
        let messages = items_to_chat_messages(&[call, output], None);
        assert_eq!(messages[0].role, "assistant");
        assert!(messages[0].tool_calls.is_some());
        assert_eq!(messages[1].role, "tool");
        assert_eq!(messages[1].tool_call_id.as_deref(), Some(call_id.to_string().as_str()));
    }

    #[test]
    fn reasoning_items_are_dropped_from_chat_translation() {
        let item = Item::new(ItemStatus::Completed, ItemPayload::Reasoning { reasoning: "thinking...".to_string() });
        let messages = items_to_chat_messages(std::slice::from_ref(&item), None);
        assert!(messages.is_empty());
    }

    #[test]
    fn assistant_message_output_collapses_to_text_even_with_refusal() {
        let item = Item::new(
            ItemStatus::Completed,
            ItemPayload::Message {
                message: MessageData {
                    role: Role::Assistant,
                    content: vec![],
                    output: vec![OutputContentPart::Refusal { refusal: "cannot help with that".to_string() }],
                },
            },
        );
        let messages = items_to_chat_messages(std::slice::from_ref(&item), None);
        assert_eq!(messages[0].role, "assistant");
        match &messages[0].content {
            Some(ChatContent::Text(t)) => assert_eq!(t, "cannot help with that"),
            other => panic!("expected text content, got {other:?}"),
        }
    }
}
