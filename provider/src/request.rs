//! `ProviderRequest`: the engine's backend-agnostic call shape, plus its
//! translation into the OpenAI-compatible wire request (spec §4.6).

use crate::message::ChatMessage;
use protocol::{ToolChoice, ToolChoiceMode, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the engine asks a backend provider to do for one model turn.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u64>,
    pub stream: bool,
    pub response_format: Option<Value>,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct ChatFunctionDef {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: Value,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct ChatToolDef {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunctionDef,
}

impl From<&ToolDefinition> for ChatToolDef {
    fn from(tool: &ToolDefinition) -> Self {
        ChatToolDef {
            kind: "function",
            function: ChatFunctionDef {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ChatToolChoice {
    Mode(&'static str),
    Function { #[serde(rename = "type")] kind: &'static str, function: ChatToolChoiceFunction },
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct ChatToolChoiceFunction {
    name: String,
}

fn tool_choice_to_wire(choice: &ToolChoice) -> ChatToolChoice {
    match choice {
        ToolChoice::Mode(ToolChoiceMode::Auto) => ChatToolChoice::Mode("auto"),
        ToolChoice::Mode(ToolChoiceMode::None) => ChatToolChoice::Mode("none"),
        ToolChoice::Mode(ToolChoiceMode::Required) => ChatToolChoice::Mode("required"),
        ToolChoice::Function { name, .. } => ChatToolChoice::Function {
            kind: "function",
            function: ChatToolChoiceFunction { name: name.clone() },
        },
    }
}

/// The wire-shaped `/v1/chat/completions` request body.
#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) tools: Vec<ChatToolDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_choice: Option<ChatToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u64>,
    pub(crate) stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) response_format: Option<Value>,
}

impl From<&ProviderRequest> for ChatCompletionRequest {
    fn from(request: &ProviderRequest) -> Self {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.clone(),
            tools: request.tools.iter().map(ChatToolDef::from).collect(),
            tool_choice: if request.tools.is_empty() {
                None
            } else {
                Some(tool_choice_to_wire(&request.tool_choice))
            },
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_output_tokens,
            stream: request.stream,
            response_format: request.response_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_auto_serializes_as_bare_string() {
        let wire = tool_choice_to_wire(&ToolChoice::Mode(ToolChoiceMode::Auto));
        assert_eq!(serde_json::to_value(&wire).unwrap(), serde_json::json!("auto"));
    }

    #[test]
    fn function_tool_choice_nests_under_function_key() {
        let choice = ToolChoice::Function {
            choice_type: protocol::ToolType::Function,
            name: "get_weather".to_string(),
        };
        let wire = tool_choice_to_wire(&choice);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["function"]["name"], "get_weather");
    }

    #[test]
    fn request_without_tools_omits_tool_choice_even_if_set() {
        let request = ProviderRequest {
            model: "m".to_string(),
            messages: vec![],
            tools: vec![],
            tool_choice: ToolChoice::Mode(ToolChoiceMode::Required),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            stream: false,
            response_format: None,
        };
        let wire = ChatCompletionRequest::from(&request);
        assert!(wire.tool_choice.is_none());
    }
}
