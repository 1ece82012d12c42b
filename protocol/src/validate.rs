//! Request validation (spec §4.1): `Validate(request, config) -> error?`.

use crate::error::ApiError;
use crate::item::{ItemPayload, ToolChoice};
use crate::request::CreateResponseRequest;
use std::collections::HashSet;

/// Config knobs validation needs; kept minimal so `protocol` does not depend
/// on the `config` crate. The engine's config type converts into this.
#[derive(Clone, Copy, Debug)]
pub struct ValidateConfig {
    pub default_model: Option<&'static str>,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self { default_model: None }
    }
}

/// Validates a `CreateResponseRequest` against the constraint table in
/// spec §4.1, returning the first violation found.
pub fn validate(request: &CreateResponseRequest, _config: &ValidateConfig) -> Result<(), ApiError> {
    if request.model.trim().is_empty() {
        return Err(ApiError::validation("model must not be empty", "model"));
    }

    match &request.input {
        crate::request::Input::Text(text) if text.is_empty() => {
            return Err(ApiError::validation("input must not be empty", "input"));
        }
        crate::request::Input::Items(items) if items.is_empty() => {
            return Err(ApiError::validation(
                "input must contain at least one item",
                "input",
            ));
        }
        crate::request::Input::Items(items) => {
            for (idx, item) in items.iter().enumerate() {
                validate_item_self_consistency(item, idx)?;
            }
        }
        crate::request::Input::Text(_) => {}
    }

    if let Some(temperature) = request.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ApiError::validation(
                "temperature must be in [0, 2]",
                "temperature",
            ));
        }
    }

    if let Some(top_p) = request.top_p {
        if !(top_p > 0.0 && top_p <= 1.0) {
            return Err(ApiError::validation("top_p must be in (0, 1]", "top_p"));
        }
    }

    if let Some(max_output_tokens) = request.max_output_tokens {
        if max_output_tokens == 0 {
            return Err(ApiError::validation(
                "max_output_tokens must be > 0",
                "max_output_tokens",
            ));
        }
    }

    let mut seen_names = HashSet::with_capacity(request.tools.len());
    for tool in &request.tools {
        if !seen_names.insert(tool.name.as_str()) {
            return Err(ApiError::validation(
                format!("duplicate tool name {:?}", tool.name),
                "tools",
            ));
        }
    }

    if let Some(ToolChoice::Function { name, .. }) = &request.tool_choice {
        if !request.tools.iter().any(|tool| &tool.name == name) {
            return Err(ApiError::validation(
                format!("tool_choice references undefined tool {:?}", name),
                "tool_choice",
            ));
        }
    }

    if let Some(previous_response_id) = &request.previous_response_id {
        if previous_response_id.as_str().is_empty() {
            return Err(ApiError::validation(
                "previous_response_id must not be empty when set",
                "previous_response_id",
            ));
        }
    }

    Ok(())
}

fn validate_item_self_consistency(item: &crate::item::Item, idx: usize) -> Result<(), ApiError> {
    let path = format!("input[{idx}]");
    match &item.payload {
        ItemPayload::Message { .. }
        | ItemPayload::FunctionCall { .. }
        | ItemPayload::FunctionCallOutput { .. }
        | ItemPayload::Reasoning { .. }
        | ItemPayload::CodeInterpreterCall { .. }
        | ItemPayload::McpCall { .. }
        | ItemPayload::FileSearchCall { .. }
        | ItemPayload::WebSearchCall { .. } => Ok(()),
        ItemPayload::Extension { item_type, .. } => {
            if item_type.contains(':') {
                Ok(())
            } else {
                Err(ApiError::validation(
                    format!("unrecognized item type {:?}", item_type),
                    path,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ToolDefinition, ToolType};
    use crate::request::Input;

    fn base_request() -> CreateResponseRequest {
        CreateResponseRequest {
            model: "gpt-test".to_string(),
            input: Input::Text("hi".to_string()),
            instructions: None,
            previous_response_id: None,
            tools: vec![],
            tool_choice: None,
            allowed_tools: None,
            stream: false,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            max_turns: None,
            truncation: None,
            store: true,
            metadata: Default::default(),
            extensions: Default::default(),
        }
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut req = base_request();
        req.model = "".to_string();
        let err = validate(&req, &ValidateConfig::default()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("model"));
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let mut req = base_request();
        req.input = Input::Items(vec![]);
        let err = validate(&req, &ValidateConfig::default()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("input"));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut req = base_request();
        req.temperature = Some(2.5);
        let err = validate(&req, &ValidateConfig::default()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("temperature"));
    }

    #[test]
    fn top_p_of_zero_is_rejected() {
        let mut req = base_request();
        req.top_p = Some(0.0);
        assert!(validate(&req, &ValidateConfig::default()).is_err());
    }

    #[test]
    fn duplicate_tool_names_are_rejected() {
        let mut req = base_request();
        req.tools = vec![
            ToolDefinition {
                tool_type: ToolType::Function,
                name: "get_weather".to_string(),
                description: None,
                parameters: serde_json::json!({}),
                strict: None,
            },
            ToolDefinition {
                tool_type: ToolType::Function,
                name: "get_weather".to_string(),
                description: None,
                parameters: serde_json::json!({}),
                strict: None,
            },
        ];
        let err = validate(&req, &ValidateConfig::default()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("tools"));
    }

    #[test]
    fn tool_choice_referencing_unknown_function_is_rejected() {
        let mut req = base_request();
        req.tool_choice = Some(ToolChoice::Function {
            choice_type: ToolType::Function,
            name: "nonexistent".to_string(),
        });
        let err = validate(&req, &ValidateConfig::default()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("tool_choice"));
    }

    #[test]
    fn valid_request_passes() {
        let req = base_request();
        assert!(validate(&req, &ValidateConfig::default()).is_ok());
    }

    #[test]
    fn item_list_input_with_valid_items_passes() {
        let mut req = base_request();
        req.input = Input::Items(vec![Item::user_text("hi")]);
        assert!(validate(&req, &ValidateConfig::default()).is_ok());
    }
}
