//! `BackendProvider`: the trait the engine calls to run one model turn
//! against whichever backend is configured (spec §4.6). Mirrors the
//! corpus's `invoke` / `invoke_stream` split, generalized from chat-only
//! text deltas to the richer `ProviderEvent` taxonomy (tool-call deltas,
//! reasoning deltas, a terminal `finish_reason`).

use crate::error::ProviderError;
use crate::request::ProviderRequest;
use crate::response::{ProviderEvent, ProviderResponse};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Streaming variant. Default implementation calls `invoke()` and
    /// replays it as a single content delta plus a `Completed` event, for
    /// backends (or tests) that never stream.
    async fn invoke_stream(
        &self,
        request: &ProviderRequest,
        events: mpsc::Sender<ProviderEvent>,
    ) -> Result<(), ProviderError> {
        let response = self.invoke(request).await?;
        if let Some(content) = response.content {
            if !content.is_empty() {
                let _ = events.send(ProviderEvent::ContentDelta { delta: content }).await;
            }
        }
        for (index, call) in response.tool_calls.iter().enumerate() {
            let _ = events
                .send(ProviderEvent::ToolCallDelta {
                    index,
                    id: Some(call.id.to_string()),
                    name: Some(call.name.clone()),
                    arguments_delta: call.arguments.clone(),
                })
                .await;
        }
        let _ = events
            .send(ProviderEvent::Completed {
                finish_reason: response.finish_reason,
                usage: response.usage,
            })
            .await;
        Ok(())
    }
}
