//! `VllmResponsesProvider`: the `vllm-responses` backend (spec §4.6) — an
//! upstream that already speaks OpenResponses. It is treated identically to
//! `OpenAiCompatibleProvider` at the `BackendProvider` interface: the engine
//! never knows which wire protocol ran underneath. Chat messages are folded
//! back into a minimal OpenResponses `input` array for the proxied request,
//! and the upstream's own `StreamEvent`/`Response` shapes are translated
//! back into `ProviderEvent`/`ProviderResponse`.

use crate::client::BackendProvider;
use crate::error::ProviderError;
use crate::message::{ChatContent, ChatMessage};
use crate::request::ProviderRequest;
use crate::response::{FinishReason, ProviderEvent, ProviderResponse};
use async_trait::async_trait;
use futures::StreamExt;
use protocol::{Response, ResponseStatus, StreamEvent, ToolCall, Usage};
use serde_json::Value;
use tokio::sync::mpsc;

pub struct VllmResponsesProvider {
    backend_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl VllmResponsesProvider {
    pub fn new(backend_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            api_key,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/responses", self.backend_url.trim_end_matches('/'))
    }

    /// Folds chat messages back into an OpenResponses-shaped `input` array.
    /// Multimodal parts collapse to their text fragments; this provider
    /// only forwards to upstream OpenResponses gateways, which are expected
    /// to accept the same `message`/`function_call`/`function_call_output`
    /// item shapes this crate itself defines.
    fn messages_to_input(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .filter_map(|m| match m.role.as_str() {
                "tool" => Some(serde_json::json!({
                    "type": "function_call_output",
                    "call_id": m.tool_call_id,
                    "output": content_text(&m.content),
                })),
                "assistant" if m.tool_calls.is_some() => {
                    let call = m.tool_calls.as_ref().unwrap().first()?;
                    Some(serde_json::json!({
                        "type": "function_call",
                        "call_id": call.id,
                        "name": call.function.name,
                        "arguments": call.function.arguments,
                    }))
                }
                role => Some(serde_json::json!({
                    "type": "message",
                    "role": role,
                    "content": [{ "type": "input_text", "text": content_text(&m.content) }],
                })),
            })
            .collect()
    }

    fn request_builder(&self, body: &Value) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(self.url()).json(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        builder
    }

    fn request_body(request: &ProviderRequest) -> Value {
        serde_json::json!({
            "model": request.model,
            "input": Self::messages_to_input(&request.messages),
            "tools": request.tools,
            "tool_choice": request.tool_choice,
            "temperature": request.temperature,
            "top_p": request.top_p,
            "max_output_tokens": request.max_output_tokens,
            "stream": request.stream,
        })
    }
}

fn content_text(content: &Option<ChatContent>) -> String {
    match content {
        Some(ChatContent::Text(t)) => t.clone(),
        Some(ChatContent::Parts(parts)) => parts
            .iter()
            .filter_map(|p| match p {
                crate::message::ChatContentPart::Text { text } => Some(text.clone()),
                crate::message::ChatContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(""),
        None => String::new(),
    }
}

fn finish_reason_for_response(response: &Response, terminal_status: ResponseStatus) -> FinishReason {
    match terminal_status {
        ResponseStatus::Completed => FinishReason::Stop,
        ResponseStatus::Incomplete => match response.incomplete_reason {
            Some(protocol::IncompleteReason::MaxOutputTokens) => FinishReason::Length,
            Some(protocol::IncompleteReason::ContentFilter) => FinishReason::ContentFilter,
            _ => FinishReason::Other("incomplete".to_string()),
        },
        ResponseStatus::RequiresAction => FinishReason::ToolCalls,
        ResponseStatus::Failed => FinishReason::Other("failed".to_string()),
        ResponseStatus::Cancelled => FinishReason::Other("cancelled".to_string()),
        ResponseStatus::InProgress => FinishReason::Other("in_progress".to_string()),
    }
}

#[async_trait]
impl BackendProvider for VllmResponsesProvider {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut body = Self::request_body(request);
        body["stream"] = Value::Bool(false);

        let http_response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let text = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendStatus { status: status.as_u16(), body: text });
        }

        let response: Response = http_response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let tool_calls: Vec<ToolCall> = response
            .required_action
            .as_ref()
            .map(|action| action.submit_tool_outputs.tool_calls.clone())
            .unwrap_or_default();
        let content = response.error.as_ref().map(|e| e.message.clone());

        Ok(ProviderResponse {
            content,
            reasoning_content: None,
            tool_calls,
            usage: Some(Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                total_tokens: response.usage.total_tokens,
            }),
            finish_reason: finish_reason_for_response(&response, response.status),
        })
    }

    async fn invoke_stream(
        &self,
        request: &ProviderRequest,
        events: mpsc::Sender<ProviderEvent>,
    ) -> Result<(), ProviderError> {
        let mut body = Self::request_body(request);
        body["stream"] = Value::Bool(true);

        let http_response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let text = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendStatus { status: status.as_u16(), body: text });
        }

        let mut buffer = String::new();
        let mut stream = http_response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::Transport(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let line = buffer[..pos].to_string();
                buffer.drain(..pos + 2);
                let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
                    continue;
                };
                let event: StreamEvent = match serde_json::from_str(data.trim()) {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = events
                            .send(ProviderEvent::Error { message: format!("malformed upstream event: {e}") })
                            .await;
                        continue;
                    }
                };
                match event {
                    StreamEvent::OutputTextDelta { delta, .. } => {
                        let _ = events.send(ProviderEvent::ContentDelta { delta }).await;
                    }
                    StreamEvent::ReasoningDelta { delta, .. } => {
                        let _ = events.send(ProviderEvent::ReasoningDelta { delta }).await;
                    }
                    StreamEvent::FunctionCallArgumentsDelta { item_id, delta, .. } => {
                        let _ = events
                            .send(ProviderEvent::ToolCallDelta {
                                index: 0,
                                id: Some(item_id.to_string()),
                                name: None,
                                arguments_delta: delta,
                            })
                            .await;
                    }
                    StreamEvent::ResponseCompleted { response, .. } => {
                        let _ = events
                            .send(ProviderEvent::Completed {
                                finish_reason: finish_reason_for_response(&response, ResponseStatus::Completed),
                                usage: Some(Usage {
                                    input_tokens: response.usage.input_tokens,
                                    output_tokens: response.usage.output_tokens,
                                    total_tokens: response.usage.total_tokens,
                                }),
                            })
                            .await;
                    }
                    StreamEvent::ResponseIncomplete { response, .. } => {
                        let _ = events
                            .send(ProviderEvent::Completed {
                                finish_reason: finish_reason_for_response(&response, ResponseStatus::Incomplete),
                                usage: Some(Usage {
                                    input_tokens: response.usage.input_tokens,
                                    output_tokens: response.usage.output_tokens,
                                    total_tokens: response.usage.total_tokens,
                                }),
                            })
                            .await;
                    }
                    StreamEvent::ResponseFailed { response, .. } => {
                        let _ = events
                            .send(ProviderEvent::Completed {
                                finish_reason: finish_reason_for_response(&response, ResponseStatus::Failed),
                                usage: None,
                            })
                            .await;
                    }
                    StreamEvent::Error { error, .. } => {
                        let _ = events.send(ProviderEvent::Error { message: error.message }).await;
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatContentPart, ChatImageUrl};

    #[test]
    fn content_text_collapses_parts_to_concatenated_text() {
        let content = Some(ChatContent::Parts(vec![
            ChatContentPart::Text { text: "a".to_string() },
            ChatContentPart::ImageUrl { image_url: ChatImageUrl { url: "x".to_string() } },
            ChatContentPart::Text { text: "b".to_string() },
        ]));
        assert_eq!(content_text(&content), "ab");
    }

    #[test]
    fn tool_message_becomes_function_call_output_item() {
        let message = ChatMessage {
            role: "tool".to_string(),
            content: Some(ChatContent::Text("72F".to_string())),
            tool_calls: None,
            tool_call_id: Some("call_abc".to_string()),
            name: None,
        };
        let input = VllmResponsesProvider::messages_to_input(&[message]);
        assert_eq!(input[0]["type"], "function_call_output");
        assert_eq!(input[0]["output"], "72F");
    }

    #[test]
    fn url_appends_v1_responses() {
        let provider = VllmResponsesProvider::new("http://upstream:9000", None);
        assert_eq!(provider.url(), "http://upstream:9000/v1/responses");
    }
}
