//! `ProviderResponse`/`ProviderEvent` and the backend's `finish_reason`
//! union, plus its classification into what the engine does next (spec §4.6).

use protocol::{IncompleteReason, ToolCall, Usage};
use serde::{Deserialize, Serialize};

/// The raw `finish_reason` string a chat-completions-shaped backend returns,
/// modeled as a closed union with an escape hatch for values we don't know
/// about yet (new backends sometimes add their own).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(FinishReason::from(raw.as_str()))
    }
}

impl Serialize for FinishReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(s) => s.as_str(),
        };
        serializer.serialize_str(raw)
    }
}

/// What the engine should do in response to a `finish_reason` (spec §4.6
/// translation rules: stop -> completed, length -> incomplete(max_output_tokens),
/// tool_calls -> the turn loop continues, content_filter -> failed(content_filter),
/// anything else -> failed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishOutcome {
    Completed,
    Incomplete(IncompleteReason),
    ContinueLoop,
    Failed { content_filter: bool },
}

impl FinishReason {
    pub fn classify(&self) -> FinishOutcome {
        match self {
            FinishReason::Stop => FinishOutcome::Completed,
            FinishReason::Length => FinishOutcome::Incomplete(IncompleteReason::MaxOutputTokens),
            FinishReason::ToolCalls => FinishOutcome::ContinueLoop,
            FinishReason::ContentFilter => FinishOutcome::Failed { content_filter: true },
            FinishReason::Other(_) => FinishOutcome::Failed { content_filter: false },
        }
    }
}

/// The complete (non-streaming) result of one backend turn.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
}

/// One increment of a streamed backend turn.
#[derive(Clone, Debug)]
pub enum ProviderEvent {
    ContentDelta { delta: String },
    ReasoningDelta { delta: String },
    ToolCallDelta { index: usize, id: Option<String>, name: Option<String>, arguments_delta: String },
    Completed { finish_reason: FinishReason, usage: Option<Usage> },
    Error { message: String },
}
