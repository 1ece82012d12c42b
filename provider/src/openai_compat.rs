//! `OpenAiCompatibleProvider`: a `BackendProvider` for any `/v1/chat/completions`-
//! shaped backend (vLLM, LiteLLM, and compatible gateways). Non-streaming
//! calls are a single JSON round trip; streaming calls read an SSE body one
//! `data: ` line at a time, the read-side mirror of the corpus's
//! `openai_sse` write-side chunk model.

use crate::client::BackendProvider;
use crate::error::ProviderError;
use crate::request::{ChatCompletionRequest, ProviderRequest};
use crate::response::{FinishReason, ProviderEvent, ProviderResponse};
use async_trait::async_trait;
use futures::StreamExt;
use protocol::{CallId, ToolCall, Usage};
use serde::Deserialize;
use std::str::FromStr;
use tokio::sync::mpsc;

pub struct OpenAiCompatibleProvider {
    backend_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(backend_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            api_key,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.backend_url.trim_end_matches('/'))
    }

    fn request_builder(&self, body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(self.url()).json(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        builder
    }
}

#[derive(Deserialize)]
struct WireToolCallFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    function: Option<WireToolCallFunction>,
}

#[derive(Deserialize, Default)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: WireMessage,
    #[serde(default)]
    delta: Option<WireMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct WireChatCompletion {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

fn coerce_call_id(raw: &str) -> CallId {
    CallId::from_str(raw).unwrap_or_else(|_| {
        CallId::try_from(format!("{}{raw}", CallId::PREFIX)).unwrap_or_else(|_| CallId::new())
    })
}

fn usage_from_wire(usage: WireUsage) -> Usage {
    Usage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

#[async_trait]
impl BackendProvider for OpenAiCompatibleProvider {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut body = ChatCompletionRequest::from(request);
        body.stream = false;

        let response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendStatus { status: status.as_u16(), body: text });
        }

        let parsed: WireChatCompletion = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .filter_map(|tc| {
                let function = tc.function?;
                Some(ToolCall {
                    id: tc.id.as_deref().map(coerce_call_id).unwrap_or_else(CallId::new),
                    name: function.name.unwrap_or_default(),
                    arguments: function.arguments.unwrap_or_default(),
                })
            })
            .collect();

        Ok(ProviderResponse {
            content: choice.message.content,
            reasoning_content: choice.message.reasoning_content,
            tool_calls,
            usage: parsed.usage.map(usage_from_wire),
            finish_reason: FinishReason::from(choice.finish_reason.as_deref().unwrap_or("stop")),
        })
    }

    async fn invoke_stream(
        &self,
        request: &ProviderRequest,
        events: mpsc::Sender<ProviderEvent>,
    ) -> Result<(), ProviderError> {
        let mut body = ChatCompletionRequest::from(request);
        body.stream = true;

        let response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendStatus { status: status.as_u16(), body: text });
        }

        let mut buffer = String::new();
        let mut stream = response.bytes_stream();
        let mut usage = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::Transport(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let line = buffer[..pos].to_string();
                buffer.drain(..pos + 2);
                let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    continue;
                }
                let parsed: WireChatCompletion = match serde_json::from_str(data) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        let _ = events
                            .send(ProviderEvent::Error { message: format!("malformed stream chunk: {e}") })
                            .await;
                        continue;
                    }
                };
                if let Some(wire_usage) = parsed.usage {
                    usage = Some(usage_from_wire(wire_usage));
                }
                let Some(choice) = parsed.choices.into_iter().next() else { continue };
                let delta = choice.delta.unwrap_or_default();

                if let Some(content) = delta.content {
                    if !content.is_empty() {
                        let _ = events.send(ProviderEvent::ContentDelta { delta: content }).await;
                    }
                }
                if let Some(reasoning) = delta.reasoning_content {
                    if !reasoning.is_empty() {
                        let _ = events.send(ProviderEvent::ReasoningDelta { delta: reasoning }).await;
                    }
                }
                for tc in delta.tool_calls {
                    let _ = events
                        .send(ProviderEvent::ToolCallDelta {
                            index: tc.index.unwrap_or(0),
                            id: tc.id.clone(),
                            name: tc.function.as_ref().and_then(|f| f.name.clone()),
                            arguments_delta: tc.function.and_then(|f| f.arguments).unwrap_or_default(),
                        })
                        .await;
                }
                if let Some(finish_reason) = choice.finish_reason {
                    let _ = events
                        .send(ProviderEvent::Completed {
                            finish_reason: FinishReason::from(finish_reason.as_str()),
                            usage: usage.clone(),
                        })
                        .await;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_call_id_passes_through_already_prefixed_ids() {
        let id = coerce_call_id("call_abc123");
        assert_eq!(id.as_str(), "call_abc123");
    }

    #[test]
    fn coerce_call_id_prefixes_ids_missing_the_call_prefix() {
        let id = coerce_call_id("chatcmpl-tool-xyz");
        assert!(id.as_str().starts_with("call_"));
        assert!(id.as_str().contains("chatcmpl-tool-xyz"));
    }

    #[test]
    fn url_appends_v1_chat_completions() {
        let provider = OpenAiCompatibleProvider::new("http://localhost:8000", None);
        assert_eq!(provider.url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn url_trims_trailing_slash_before_appending() {
        let provider = OpenAiCompatibleProvider::new("http://localhost:8000/", None);
        assert_eq!(provider.url(), "http://localhost:8000/v1/chat/completions");
    }
}
