//! Backend provider adapter (spec §4.6): translates between the engine's
//! backend-agnostic `ProviderRequest`/`ProviderResponse`/`ProviderEvent`
//! shapes and whichever wire protocol the configured backend actually
//! speaks (`vllm`/`litellm` via OpenAI-compatible chat completions, or
//! `vllm-responses` via a pass-through to an upstream OpenResponses
//! gateway).

pub mod client;
pub mod error;
pub mod message;
pub mod openai_compat;
pub mod passthrough;
pub mod request;
pub mod response;

pub use client::BackendProvider;
pub use error::ProviderError;
pub use message::{items_to_chat_messages, ChatContent, ChatContentPart, ChatImageUrl, ChatMessage};
pub use openai_compat::OpenAiCompatibleProvider;
pub use passthrough::VllmResponsesProvider;
pub use request::ProviderRequest;
pub use response::{FinishOutcome, FinishReason, ProviderEvent, ProviderResponse};
