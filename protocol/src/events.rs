//! SSE streaming event taxonomy (spec §3.5). Every event carries `type`,
//! `sequence_number`, and kind-specific fields; the internally tagged enum
//! mirrors the `Item`/`ItemPayload` representation for the same reason —
//! a single `type` string discriminates the wire object.

use crate::error::ApiError;
use crate::ids::ItemId;
use crate::item::Item;
use crate::response::Response;
use serde::{Deserialize, Serialize};

/// One SSE event in a streamed response (spec §3.5). `sequence_number` is
/// strictly increasing within a stream (property P6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    #[serde(rename = "response.created")]
    ResponseCreated { sequence_number: u64, response: Response },
    #[serde(rename = "response.in_progress")]
    ResponseInProgress { sequence_number: u64, response: Response },
    #[serde(rename = "response.completed")]
    ResponseCompleted { sequence_number: u64, response: Response },
    #[serde(rename = "response.incomplete")]
    ResponseIncomplete { sequence_number: u64, response: Response },
    #[serde(rename = "response.failed")]
    ResponseFailed { sequence_number: u64, response: Response },
    #[serde(rename = "response.cancelled")]
    ResponseCancelled { sequence_number: u64, response: Response },
    /// Standalone pre-response error: no `Response` exists yet (spec §3.5).
    #[serde(rename = "error")]
    Error { sequence_number: u64, error: ApiError },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        sequence_number: u64,
        output_index: usize,
        item: Item,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        sequence_number: u64,
        output_index: usize,
        item: Item,
    },

    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        content_index: usize,
        part: serde_json::Value,
    },
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        content_index: usize,
        part: serde_json::Value,
    },

    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        content_index: usize,
        text: String,
    },

    #[serde(rename = "response.refusal.delta")]
    RefusalDelta {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.refusal.done")]
    RefusalDone {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        content_index: usize,
        refusal: String,
    },

    #[serde(rename = "response.reasoning.delta")]
    ReasoningDelta {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        delta: String,
    },
    #[serde(rename = "response.reasoning.done")]
    ReasoningDone {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        text: String,
    },

    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        delta: String,
    },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        sequence_number: u64,
        item_id: ItemId,
        output_index: usize,
        arguments: String,
    },

    #[serde(rename = "response.mcp_call.in_progress")]
    McpCallInProgress { sequence_number: u64, item_id: ItemId },
    #[serde(rename = "response.mcp_call.completed")]
    McpCallCompleted { sequence_number: u64, item_id: ItemId },
    #[serde(rename = "response.mcp_call.failed")]
    McpCallFailed {
        sequence_number: u64,
        item_id: ItemId,
        error: ApiError,
    },

    #[serde(rename = "response.file_search_call.in_progress")]
    FileSearchCallInProgress { sequence_number: u64, item_id: ItemId },
    #[serde(rename = "response.file_search_call.searching")]
    FileSearchCallSearching { sequence_number: u64, item_id: ItemId },
    #[serde(rename = "response.file_search_call.completed")]
    FileSearchCallCompleted { sequence_number: u64, item_id: ItemId },

    #[serde(rename = "response.web_search_call.in_progress")]
    WebSearchCallInProgress { sequence_number: u64, item_id: ItemId },
    #[serde(rename = "response.web_search_call.searching")]
    WebSearchCallSearching { sequence_number: u64, item_id: ItemId },
    #[serde(rename = "response.web_search_call.completed")]
    WebSearchCallCompleted { sequence_number: u64, item_id: ItemId },
}

impl StreamEvent {
    pub fn sequence_number(&self) -> u64 {
        match self {
            StreamEvent::ResponseCreated { sequence_number, .. }
            | StreamEvent::ResponseInProgress { sequence_number, .. }
            | StreamEvent::ResponseCompleted { sequence_number, .. }
            | StreamEvent::ResponseIncomplete { sequence_number, .. }
            | StreamEvent::ResponseFailed { sequence_number, .. }
            | StreamEvent::ResponseCancelled { sequence_number, .. }
            | StreamEvent::Error { sequence_number, .. }
            | StreamEvent::OutputItemAdded { sequence_number, .. }
            | StreamEvent::OutputItemDone { sequence_number, .. }
            | StreamEvent::ContentPartAdded { sequence_number, .. }
            | StreamEvent::ContentPartDone { sequence_number, .. }
            | StreamEvent::OutputTextDelta { sequence_number, .. }
            | StreamEvent::OutputTextDone { sequence_number, .. }
            | StreamEvent::RefusalDelta { sequence_number, .. }
            | StreamEvent::RefusalDone { sequence_number, .. }
            | StreamEvent::ReasoningDelta { sequence_number, .. }
            | StreamEvent::ReasoningDone { sequence_number, .. }
            | StreamEvent::FunctionCallArgumentsDelta { sequence_number, .. }
            | StreamEvent::FunctionCallArgumentsDone { sequence_number, .. }
            | StreamEvent::McpCallInProgress { sequence_number, .. }
            | StreamEvent::McpCallCompleted { sequence_number, .. }
            | StreamEvent::McpCallFailed { sequence_number, .. }
            | StreamEvent::FileSearchCallInProgress { sequence_number, .. }
            | StreamEvent::FileSearchCallSearching { sequence_number, .. }
            | StreamEvent::FileSearchCallCompleted { sequence_number, .. }
            | StreamEvent::WebSearchCallInProgress { sequence_number, .. }
            | StreamEvent::WebSearchCallSearching { sequence_number, .. }
            | StreamEvent::WebSearchCallCompleted { sequence_number, .. } => *sequence_number,
        }
    }

    /// True for the five events that legally terminate a stream, per
    /// invariant 5 (a standalone `error` also terminates, but only
    /// pre-response — callers check that separately).
    pub fn is_terminal_response_event(&self) -> bool {
        matches!(
            self,
            StreamEvent::ResponseCompleted { .. }
                | StreamEvent::ResponseIncomplete { .. }
                | StreamEvent::ResponseFailed { .. }
                | StreamEvent::ResponseCancelled { .. }
        )
    }
}

/// Assigns strictly increasing `sequence_number`s to a stream of events.
/// Grounded in the teacher's `Envelope`/`EnvelopeState` counter pattern:
/// one counter per stream, incremented under the writer's exclusive access.
#[derive(Debug, Default)]
pub struct SequenceCounter(u64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> u64 {
        let current = self.0;
        self.0 += 1;
        current
    }
}
