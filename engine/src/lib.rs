//! The agentic engine (spec §4.7): `CreateResponse(ctx, request, writer) -> error`.
//!
//! Orchestrates preflight (validation, chain reconstruction, truncation, tool
//! merging), the turn loop (provider invocation, tool dispatch, bounded
//! parallelism), streaming event emission, and finalization/persistence.
//! Grounded in the teacher's `serve/src/run/delivery.rs` producer-task /
//! consumer-loop shape: one task drives the provider and feeds an mpsc
//! channel of `ProviderEvent`s, the caller's task consumes it and emits the
//! protocol-level `StreamEvent`s.

pub mod chain;
pub mod config;
pub mod registry;
pub mod tools_merge;
pub mod truncation;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use protocol::{
    ApiError, ApiErrorType, CallId, IncompleteReason, Item, ItemId, ItemPayload, ItemStatus,
    MessageData, RequiredAction, RequiredActionType, Response, ResponseId, ResponseStatus, Role,
    SequenceCounter, StreamEvent, SubmitToolOutputs, ToolCall, ToolResult,
};
use provider::{items_to_chat_messages, BackendProvider, FinishOutcome, FinishReason, ProviderEvent, ProviderRequest};
use response_store::{ResponseStore, StoreContext};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tools::{filter_allowed_calls, FunctionProvider, Kind};

pub use config::EngineConfig;
pub use registry::ToolRegistry;

/// Everything the engine needs to run one `CreateResponse` call, wired by the
/// `gateway` binary at startup.
pub struct Engine {
    store: Option<Arc<dyn ResponseStore>>,
    registry: ToolRegistry,
    /// Built-in providers contribute their `ToolDefinition`s to every turn's
    /// merged tool set (spec §4.7.1 step 5). MCP sources are dispatch-only
    /// here (see the MCP tool-listing note in `DESIGN.md`): their tools must
    /// already be named in `request.tools` for the model to call them.
    tool_providers: Vec<Arc<dyn FunctionProvider>>,
    provider: Arc<dyn BackendProvider>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        store: Option<Arc<dyn ResponseStore>>,
        registry: ToolRegistry,
        tool_providers: Vec<Arc<dyn FunctionProvider>>,
        provider: Arc<dyn BackendProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            tool_providers,
            provider,
            config,
        }
    }

    fn merged_provider_tools(&self) -> Vec<protocol::ToolDefinition> {
        self.tool_providers.iter().flat_map(|p| p.tools()).collect()
    }

    /// Runs the full agentic loop for one request (spec §4.7). `events`, when
    /// `Some`, receives every `StreamEvent` in emission order and is the SSE
    /// path; `None` is the plain-JSON path, which still drives the same turn
    /// loop internally — a backend with no real streaming support already
    /// degrades to one `ContentDelta` + `Completed` via `BackendProvider`'s
    /// default `invoke_stream`, so both paths share this one code path.
    #[tracing::instrument(skip_all, fields(response_id = tracing::field::Empty, model = %request.model))]
    pub async fn create_response(
        &self,
        ctx: &StoreContext,
        request: protocol::CreateResponseRequest,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<Response, ApiError> {
        let mut request = request;
        if request.model.trim().is_empty() {
            if let Some(default_model) = &self.config.default_model {
                request.model = default_model.clone();
            }
        }
        protocol::validate(&request, &protocol::ValidateConfig::default())?;

        let mut history = Vec::new();
        if let Some(previous_id) = &request.previous_response_id {
            let store = self
                .store
                .as_ref()
                .ok_or_else(|| ApiError::invalid_request("previous_response_id requires a configured store"))?;
            history = chain::reconstruct_chain(store, ctx, previous_id).await?;
        }
        history = truncation::apply(history, request.truncation.as_deref());

        let own_input_items = request.input.clone().into_items();
        let mut full_input = history;
        full_input.extend(own_input_items.iter().cloned());

        let merged_tools = tools_merge::merge_tools(&request.tools, self.merged_provider_tools());

        let response_id = ResponseId::new();
        tracing::Span::current().record("response_id", tracing::field::display(&response_id));
        let mut response = Response {
            id: response_id,
            status: ResponseStatus::InProgress,
            created_at: Utc::now(),
            previous_response_id: request.previous_response_id.clone(),
            model: request.model.clone(),
            instructions: request.instructions.clone(),
            tools: merged_tools.clone(),
            tool_choice: request.tool_choice.clone().unwrap_or_default(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            usage: protocol::Usage::default(),
            output: Vec::new(),
            incomplete_reason: None,
            required_action: None,
            error: None,
            deleted_at: None,
            metadata: request.metadata.clone(),
            extensions: request.extensions.clone(),
        };

        let mut seq = SequenceCounter::new();
        if let Some(tx) = &events {
            emit(tx, StreamEvent::ResponseCreated { sequence_number: seq.next(), response: response.clone() }).await;
            emit(tx, StreamEvent::ResponseInProgress { sequence_number: seq.next(), response: response.clone() }).await;
        }

        let max_turns = request.max_turns.unwrap_or(self.config.max_turns).max(1);
        let mut accumulated_output: Vec<Item> = Vec::new();
        let mut turn_messages = items_to_chat_messages(&full_input, request.instructions.as_deref());

        let mut outcome: Result<(), ApiError> = Ok(());
        let mut turns_exhausted = true;

        'turns: for _turn in 0..max_turns {
            let provider_request = ProviderRequest {
                model: response.model.clone(),
                messages: turn_messages.clone(),
                tools: merged_tools.clone(),
                tool_choice: response.tool_choice.clone(),
                temperature: response.temperature,
                top_p: response.top_p,
                max_output_tokens: response.max_output_tokens,
                stream: true,
                response_format: None,
            };

            let turn_result = match self.run_turn(&provider_request, &mut seq, events.as_ref(), &mut accumulated_output).await {
                Ok(result) => result,
                Err(err) => {
                    outcome = Err(err);
                    turns_exhausted = false;
                    break 'turns;
                }
            };
            response.usage.add(&turn_result.usage);

            match turn_result.finish.classify() {
                FinishOutcome::Completed => {
                    turns_exhausted = false;
                    break 'turns;
                }
                FinishOutcome::Incomplete(reason) => {
                    response.incomplete_reason = Some(reason);
                    turns_exhausted = false;
                    break 'turns;
                }
                FinishOutcome::Failed { content_filter } => {
                    outcome = Err(if content_filter {
                        ApiError::new(ApiErrorType::ContentFilter, "backend flagged the response for content policy")
                    } else {
                        ApiError::new(ApiErrorType::Upstream, "backend finished with an unrecognized reason")
                    });
                    turns_exhausted = false;
                    break 'turns;
                }
                FinishOutcome::ContinueLoop => {
                    let calls = turn_result.tool_calls;
                    if calls.is_empty() {
                        turns_exhausted = false;
                        break 'turns;
                    }

                    let (permitted, rejected) = filter_allowed_calls(calls, request.allowed_tools.as_deref());
                    for result in rejected {
                        accumulated_output.push(result.into_item());
                    }

                    let mut requires_action_calls = Vec::new();
                    let mut to_dispatch = Vec::new();
                    for call in permitted {
                        if self.registry.find(&call.name).await.is_some() {
                            to_dispatch.push(call);
                        } else {
                            requires_action_calls.push(call);
                        }
                    }

                    if !requires_action_calls.is_empty() {
                        for call in &requires_action_calls {
                            let item = Item::new(
                                ItemStatus::InProgress,
                                ItemPayload::FunctionCall {
                                    call_id: call.id.clone(),
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            );
                            if let Some(tx) = &events {
                                emit(
                                    tx,
                                    StreamEvent::OutputItemAdded {
                                        sequence_number: seq.next(),
                                        output_index: accumulated_output.len(),
                                        item: item.clone(),
                                    },
                                )
                                .await;
                            }
                            accumulated_output.push(item);
                        }
                        let _ = response.transition(ResponseStatus::RequiresAction);
                        response.required_action = Some(RequiredAction {
                            action_type: RequiredActionType::SubmitToolOutputs,
                            submit_tool_outputs: SubmitToolOutputs { tool_calls: requires_action_calls },
                        });
                        turns_exhausted = false;
                        break 'turns;
                    }

                    let dispatched = self.dispatch_tools(to_dispatch, events.as_ref(), &mut seq).await;
                    for result in dispatched {
                        accumulated_output.push(result.into_item());
                    }

                    let mut with_history = full_input.clone();
                    with_history.extend(accumulated_output.iter().cloned());
                    turn_messages = items_to_chat_messages(&with_history, request.instructions.as_deref());
                }
            }
        }

        if turns_exhausted {
            response.incomplete_reason = Some(IncompleteReason::MaxTurns);
        }
        response.output = accumulated_output;

        if let Err(err) = &outcome {
            let _ = response.transition(ResponseStatus::Failed);
            response.error = Some(err.clone());
            if let Some(tx) = &events {
                emit(tx, StreamEvent::ResponseFailed { sequence_number: seq.next(), response: response.clone() }).await;
            }
        } else if response.status == ResponseStatus::RequiresAction {
            // No dedicated terminal StreamEvent family for requires_action
            // (spec §3.5); callers observe it via the synchronous return
            // value and the already-emitted response.in_progress snapshot.
        } else if response.incomplete_reason.is_some() {
            let _ = response.transition(ResponseStatus::Incomplete);
            if let Some(tx) = &events {
                emit(tx, StreamEvent::ResponseIncomplete { sequence_number: seq.next(), response: response.clone() }).await;
            }
        } else {
            let _ = response.transition(ResponseStatus::Completed);
            if let Some(tx) = &events {
                emit(tx, StreamEvent::ResponseCompleted { sequence_number: seq.next(), response: response.clone() }).await;
            }
        }

        if request.store {
            if let Some(store) = &self.store {
                if let Err(err) = store.save_response(ctx, response.clone(), own_input_items).await {
                    tracing::warn!(response_id = %response.id, error = %err, "failed to persist response");
                }
            }
        }

        // `outcome` is already fully captured into `response.status`/`response.error`
        // and, for streaming callers, into the terminal `StreamEvent` emitted above.
        // A mid-loop failure is not a transport error: the caller (HTTP adapter) still
        // gets a `Response` body with status `failed`, matching spec §4.7.3's
        // "never rewrite earlier events" propagation policy. Only preflight errors
        // (validation, chain reconstruction) — which return via `?` before any
        // `Response` exists — surface as `Err` from this function.
        let _ = outcome;
        Ok(response)
    }

    /// Drives one model turn to completion, translating `ProviderEvent`s into
    /// `StreamEvent`s as they arrive and accumulating the turn's message,
    /// reasoning, and tool-call output. Spawns the provider call as its own
    /// task so it can write into the channel while this function
    /// concurrently drains it (the teacher's producer-task / consumer-loop
    /// shape).
    #[tracing::instrument(skip_all)]
    async fn run_turn(
        &self,
        request: &ProviderRequest,
        seq: &mut SequenceCounter,
        events: Option<&mpsc::Sender<StreamEvent>>,
        accumulated_output: &mut Vec<Item>,
    ) -> Result<TurnResult, ApiError> {
        let (tx, mut rx) = mpsc::channel::<ProviderEvent>(64);
        let provider = Arc::clone(&self.provider);
        let request_owned = request.clone();
        let handle = tokio::spawn(async move { provider.invoke_stream(&request_owned, tx).await });

        let mut next_output_index = accumulated_output.len();

        let message_item_id = ItemId::new();
        let mut message_output_index = None;
        let mut message_text = String::new();

        let mut reasoning_item_id = None;
        let mut reasoning_output_index = None;
        let mut reasoning_text = String::new();

        let mut tool_accum: HashMap<usize, ToolCallAccum> = HashMap::new();
        let mut tool_order: Vec<usize> = Vec::new();

        let mut usage = protocol::Usage::default();
        let mut finish = None;
        let mut stream_error = None;

        while let Some(event) = rx.recv().await {
            match event {
                ProviderEvent::ContentDelta { delta } => {
                    if delta.is_empty() {
                        continue;
                    }
                    if message_output_index.is_none() {
                        let assigned = next_output_index;
                        next_output_index += 1;
                        message_output_index = Some(assigned);
                        if let Some(tx) = events {
                            let placeholder = Item {
                                id: message_item_id.clone(),
                                status: ItemStatus::InProgress,
                                payload: ItemPayload::Message {
                                    message: MessageData { role: Role::Assistant, content: vec![], output: vec![] },
                                },
                            };
                            emit(tx, StreamEvent::OutputItemAdded { sequence_number: seq.next(), output_index: assigned, item: placeholder }).await;
                        }
                    }
                    message_text.push_str(&delta);
                    if let Some(tx) = events {
                        emit(
                            tx,
                            StreamEvent::OutputTextDelta {
                                sequence_number: seq.next(),
                                item_id: message_item_id.clone(),
                                output_index: message_output_index.unwrap(),
                                content_index: 0,
                                delta,
                            },
                        )
                        .await;
                    }
                }
                ProviderEvent::ReasoningDelta { delta } => {
                    if delta.is_empty() {
                        continue;
                    }
                    let item_id = reasoning_item_id.get_or_insert_with(ItemId::new).clone();
                    if reasoning_output_index.is_none() {
                        let assigned = next_output_index;
                        next_output_index += 1;
                        reasoning_output_index = Some(assigned);
                    }
                    reasoning_text.push_str(&delta);
                    if let Some(tx) = events {
                        emit(
                            tx,
                            StreamEvent::ReasoningDelta {
                                sequence_number: seq.next(),
                                item_id,
                                output_index: reasoning_output_index.unwrap(),
                                delta,
                            },
                        )
                        .await;
                    }
                }
                ProviderEvent::ToolCallDelta { index, id, name, arguments_delta } => {
                    let first_time = !tool_accum.contains_key(&index);
                    if first_time {
                        tool_order.push(index);
                        let assigned = next_output_index;
                        next_output_index += 1;
                        tool_accum.insert(
                            index,
                            ToolCallAccum { id: None, name: None, arguments: String::new(), item_id: ItemId::new(), output_index: assigned },
                        );
                    }
                    {
                        let entry = tool_accum.get_mut(&index).expect("just inserted or present");
                        if let Some(id) = &id {
                            entry.id = Some(coerce_call_id(id));
                        }
                        if let Some(name) = &name {
                            entry.name = Some(name.clone());
                        }
                        entry.arguments.push_str(&arguments_delta);
                    }
                    let entry = tool_accum.get(&index).expect("present");
                    if first_time {
                        if let Some(tx) = events {
                            let placeholder = Item {
                                id: entry.item_id.clone(),
                                status: ItemStatus::InProgress,
                                payload: ItemPayload::FunctionCall {
                                    call_id: entry.id.clone().unwrap_or_else(CallId::new),
                                    name: entry.name.clone().unwrap_or_default(),
                                    arguments: String::new(),
                                },
                            };
                            emit(tx, StreamEvent::OutputItemAdded { sequence_number: seq.next(), output_index: entry.output_index, item: placeholder }).await;
                        }
                    }
                    if let Some(tx) = events {
                        emit(
                            tx,
                            StreamEvent::FunctionCallArgumentsDelta {
                                sequence_number: seq.next(),
                                item_id: entry.item_id.clone(),
                                output_index: entry.output_index,
                                delta: arguments_delta,
                            },
                        )
                        .await;
                    }
                }
                ProviderEvent::Completed { finish_reason, usage: turn_usage } => {
                    finish = Some(finish_reason);
                    if let Some(turn_usage) = turn_usage {
                        usage = turn_usage;
                    }
                }
                ProviderEvent::Error { message } => {
                    stream_error = Some(message);
                }
            }
        }

        handle
            .await
            .map_err(|e| ApiError::server_error(format!("provider task panicked: {e}")))?
            .map_err(ApiError::from)?;

        if let Some(message) = stream_error {
            return Err(ApiError::new(ApiErrorType::Upstream, message));
        }

        if let Some(output_index) = message_output_index {
            if let Some(tx) = events {
                emit(
                    tx,
                    StreamEvent::OutputTextDone {
                        sequence_number: seq.next(),
                        item_id: message_item_id.clone(),
                        output_index,
                        content_index: 0,
                        text: message_text.clone(),
                    },
                )
                .await;
            }
            let item = Item {
                id: message_item_id,
                status: ItemStatus::Completed,
                payload: ItemPayload::Message { message: MessageData::assistant_text(message_text) },
            };
            if let Some(tx) = events {
                emit(tx, StreamEvent::OutputItemDone { sequence_number: seq.next(), output_index, item: item.clone() }).await;
            }
            accumulated_output.push(item);
        }

        if let (Some(item_id), Some(output_index)) = (reasoning_item_id, reasoning_output_index) {
            if let Some(tx) = events {
                emit(tx, StreamEvent::ReasoningDone { sequence_number: seq.next(), item_id: item_id.clone(), output_index, text: reasoning_text.clone() }).await;
            }
            accumulated_output.push(Item {
                id: item_id,
                status: ItemStatus::Completed,
                payload: ItemPayload::Reasoning { reasoning: reasoning_text },
            });
        }

        let mut tool_calls = Vec::new();
        for index in tool_order {
            let accum = tool_accum.remove(&index).expect("tracked in tool_order");
            let id = accum.id.clone().unwrap_or_else(CallId::new);
            let name = accum.name.clone().unwrap_or_default();
            if let Some(tx) = events {
                emit(
                    tx,
                    StreamEvent::FunctionCallArgumentsDone {
                        sequence_number: seq.next(),
                        item_id: accum.item_id.clone(),
                        output_index: accum.output_index,
                        arguments: accum.arguments.clone(),
                    },
                )
                .await;
                let item = Item {
                    id: accum.item_id.clone(),
                    status: ItemStatus::Completed,
                    payload: ItemPayload::FunctionCall { call_id: id.clone(), name: name.clone(), arguments: accum.arguments.clone() },
                };
                emit(tx, StreamEvent::OutputItemDone { sequence_number: seq.next(), output_index: accum.output_index, item }).await;
            }
            tool_calls.push(ToolCall { id, name, arguments: accum.arguments });
        }

        Ok(TurnResult {
            usage,
            finish: finish.unwrap_or(FinishReason::Stop),
            tool_calls,
        })
    }

    /// Executes `calls` against `self.registry`, bounded by
    /// `config.max_parallel_tools` concurrent executions (spec §5), emitting
    /// the executor-kind lifecycle events from spec §3.5 around each call.
    async fn dispatch_tools(
        &self,
        calls: Vec<ToolCall>,
        events: Option<&mpsc::Sender<StreamEvent>>,
        seq: &mut SequenceCounter,
    ) -> Vec<ToolResult> {
        let bound = self.config.max_parallel_tools.max(1);
        let mut pending = calls.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut results = Vec::new();

        for call in pending.by_ref().take(bound) {
            self.begin_call_lifecycle(&call, events, seq).await;
            in_flight.push(self.execute_one(call));
        }

        while let Some((call, result)) = in_flight.next().await {
            self.end_call_lifecycle(&call, events, seq).await;
            results.push(result);
            if let Some(next_call) = pending.next() {
                self.begin_call_lifecycle(&next_call, events, seq).await;
                in_flight.push(self.execute_one(next_call));
            }
        }

        results
    }

    #[tracing::instrument(skip_all, fields(tool = %call.name, call_id = %call.id))]
    async fn execute_one(&self, call: ToolCall) -> (ToolCall, ToolResult) {
        let result = match self.registry.find(&call.name).await {
            Some(executor) => executor.execute(&call).await,
            None => ToolResult::error(call.id.clone(), format!("no executor claims tool {:?}", call.name)),
        };
        (call, result)
    }

    async fn lifecycle_family(&self, call: &ToolCall) -> ToolLifecycleFamily {
        match self.registry.find(&call.name).await {
            Some(executor) if executor.kind() == Kind::Mcp => ToolLifecycleFamily::Mcp,
            Some(_) if call.name == "web_search" => ToolLifecycleFamily::WebSearch,
            Some(_) if call.name == "file_search" => ToolLifecycleFamily::FileSearch,
            _ => ToolLifecycleFamily::None,
        }
    }

    async fn begin_call_lifecycle(&self, call: &ToolCall, events: Option<&mpsc::Sender<StreamEvent>>, seq: &mut SequenceCounter) {
        let Some(tx) = events else { return };
        let item_id = ItemId::new();
        match self.lifecycle_family(call).await {
            ToolLifecycleFamily::Mcp => {
                emit(tx, StreamEvent::McpCallInProgress { sequence_number: seq.next(), item_id }).await;
            }
            ToolLifecycleFamily::WebSearch => {
                emit(tx, StreamEvent::WebSearchCallInProgress { sequence_number: seq.next(), item_id: item_id.clone() }).await;
                emit(tx, StreamEvent::WebSearchCallSearching { sequence_number: seq.next(), item_id }).await;
            }
            ToolLifecycleFamily::FileSearch => {
                emit(tx, StreamEvent::FileSearchCallInProgress { sequence_number: seq.next(), item_id: item_id.clone() }).await;
                emit(tx, StreamEvent::FileSearchCallSearching { sequence_number: seq.next(), item_id }).await;
            }
            ToolLifecycleFamily::None => {}
        }
    }

    async fn end_call_lifecycle(&self, call: &ToolCall, events: Option<&mpsc::Sender<StreamEvent>>, seq: &mut SequenceCounter) {
        let Some(tx) = events else { return };
        let item_id = ItemId::new();
        match self.lifecycle_family(call).await {
            ToolLifecycleFamily::Mcp => {
                emit(tx, StreamEvent::McpCallCompleted { sequence_number: seq.next(), item_id }).await;
            }
            ToolLifecycleFamily::WebSearch => {
                emit(tx, StreamEvent::WebSearchCallCompleted { sequence_number: seq.next(), item_id }).await;
            }
            ToolLifecycleFamily::FileSearch => {
                emit(tx, StreamEvent::FileSearchCallCompleted { sequence_number: seq.next(), item_id }).await;
            }
            ToolLifecycleFamily::None => {}
        }
    }
}

enum ToolLifecycleFamily {
    Mcp,
    WebSearch,
    FileSearch,
    None,
}

struct TurnResult {
    usage: protocol::Usage,
    finish: FinishReason,
    tool_calls: Vec<ToolCall>,
}

#[derive(Clone)]
struct ToolCallAccum {
    id: Option<CallId>,
    name: Option<String>,
    arguments: String,
    item_id: ItemId,
    output_index: usize,
}

fn coerce_call_id(raw: &str) -> CallId {
    CallId::from_str(raw).unwrap_or_else(|_| {
        CallId::try_from(format!("{}{raw}", CallId::PREFIX)).unwrap_or_else(|_| CallId::new())
    })
}

async fn emit(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) {
    let _ = tx.send(event).await;
}

/// Resumes a `requires_action` response with client-submitted tool outputs
/// (spec §4.1 `submit_tool_outputs`), re-entering the turn loop.
#[async_trait]
pub trait ResumableEngine {
    async fn submit_tool_outputs(
        &self,
        ctx: &StoreContext,
        response_id: &ResponseId,
        tool_outputs: Vec<ToolResult>,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<Response, ApiError>;
}

#[async_trait]
impl ResumableEngine for Engine {
    async fn submit_tool_outputs(
        &self,
        ctx: &StoreContext,
        response_id: &ResponseId,
        tool_outputs: Vec<ToolResult>,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<Response, ApiError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| ApiError::server_error("submit_tool_outputs requires a configured store"))?;
        let mut response = store.get_response(ctx, response_id).await?;
        if response.status != ResponseStatus::RequiresAction {
            return Err(ApiError::invalid_request(format!(
                "response {response_id} is not awaiting tool outputs"
            )));
        }

        let mut history = chain::reconstruct_chain(store, ctx, response_id).await?;
        history.extend(response.output.clone());
        for result in tool_outputs {
            history.push(result.into_item());
        }

        let _ = response.transition(ResponseStatus::InProgress);
        response.required_action = None;

        let request = protocol::CreateResponseRequest {
            model: response.model.clone(),
            input: protocol::Input::Items(history),
            instructions: response.instructions.clone(),
            previous_response_id: None,
            tools: response.tools.clone(),
            tool_choice: Some(response.tool_choice.clone()),
            allowed_tools: None,
            stream: events.is_some(),
            temperature: response.temperature,
            top_p: response.top_p,
            max_output_tokens: response.max_output_tokens,
            max_turns: None,
            truncation: None,
            store: true,
            metadata: response.metadata.clone(),
            extensions: response.extensions.clone(),
        };

        self.create_response(ctx, request, events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use protocol::{CreateResponseRequest, Input};
    use provider::{ProviderError, ProviderResponse};
    use response_store::InMemoryResponseStore;

    struct EchoProvider;

    #[async_trait]
    impl BackendProvider for EchoProvider {
        async fn invoke(&self, _request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                content: Some("hello from the model".to_string()),
                reasoning_content: None,
                tool_calls: vec![],
                usage: Some(protocol::Usage { input_tokens: 3, output_tokens: 4, total_tokens: 7 }),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    struct ToolCallingProvider {
        served: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl BackendProvider for ToolCallingProvider {
        async fn invoke(&self, _request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            if !self.served.swap(true, std::sync::atomic::Ordering::SeqCst) {
                Ok(ProviderResponse {
                    content: None,
                    reasoning_content: None,
                    tool_calls: vec![ToolCall { id: CallId::new(), name: "get_weather".to_string(), arguments: "{}".to_string() }],
                    usage: None,
                    finish_reason: FinishReason::ToolCalls,
                })
            } else {
                Ok(ProviderResponse {
                    content: Some("it is sunny".to_string()),
                    reasoning_content: None,
                    tool_calls: vec![],
                    usage: None,
                    finish_reason: FinishReason::Stop,
                })
            }
        }
    }

    struct WeatherExecutor;

    #[async_trait]
    impl tools::ToolExecutor for WeatherExecutor {
        fn kind(&self) -> Kind {
            Kind::Function
        }
        async fn can_execute(&self, name: &str) -> bool {
            name == "get_weather"
        }
        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult::ok(call.id.clone(), "72F and sunny")
        }
    }

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

    #[tokio::test]
    async fn simple_turn_completes_and_persists() {
        let store: Arc<dyn ResponseStore> = Arc::new(InMemoryResponseStore::unbounded());
        let engine = Engine::new(
            Some(Arc::clone(&store)),
            ToolRegistry::default(),
            vec![],
            Arc::new(EchoProvider),
            EngineConfig::default(),
        );
        let ctx = StoreContext::single_tenant();
        let response = engine.create_response(&ctx, base_request(), None).await.unwrap();
        assert_eq!(response.status, ResponseStatus::Completed);
        assert_eq!(response.usage.total_tokens, 7);
        assert_eq!(response.output.len(), 1);

        let stored = store.get_response(&ctx, &response.id).await.unwrap();
        assert_eq!(stored.status, ResponseStatus::Completed);
    }

    #[tokio::test]
    async fn tool_call_with_registered_executor_continues_the_loop() {
        let registry = ToolRegistry::new(vec![Arc::new(WeatherExecutor)]);
        let engine = Engine::new(
            None,
            registry,
            vec![],
            Arc::new(ToolCallingProvider { served: std::sync::atomic::AtomicBool::new(false) }),
            EngineConfig::default(),
        );
        let ctx = StoreContext::single_tenant();
        let response = engine.create_response(&ctx, base_request(), None).await.unwrap();
        assert_eq!(response.status, ResponseStatus::Completed);
        let has_tool_output = response
            .output
            .iter()
            .any(|item| matches!(item.payload, ItemPayload::FunctionCallOutput { .. }));
        assert!(has_tool_output);
    }

    #[tokio::test]
    async fn unregistered_function_tool_suspends_as_requires_action() {
        let engine = Engine::new(
            None,
            ToolRegistry::default(),
            vec![],
            Arc::new(ToolCallingProvider { served: std::sync::atomic::AtomicBool::new(false) }),
            EngineConfig::default(),
        );
        let ctx = StoreContext::single_tenant();
        let mut request = base_request();
        request.store = false;
        let response = engine.create_response(&ctx, request, None).await.unwrap();
        assert_eq!(response.status, ResponseStatus::RequiresAction);
        assert!(response.required_action.is_some());
    }

    #[tokio::test]
    async fn streaming_path_emits_sequence_numbers_in_strictly_increasing_order() {
        let engine = Engine::new(
            None,
            ToolRegistry::default(),
            vec![],
            Arc::new(EchoProvider),
            EngineConfig::default(),
        );
        let ctx = StoreContext::single_tenant();
        let (tx, mut rx) = mpsc::channel(64);
        let mut request = base_request();
        request.store = false;
        request.stream = true;
        engine.create_response(&ctx, request, Some(tx)).await.unwrap();

        let mut last = None;
        let mut saw_completed = false;
        while let Some(event) = rx.recv().await {
            let n = event.sequence_number();
            if let Some(prev) = last {
                assert!(n > prev);
            }
            last = Some(n);
            if event.is_terminal_response_event() {
                saw_completed = true;
            }
        }
        assert!(saw_completed);
    }

    #[tokio::test]
    async fn turn_exhaustion_without_terminal_finish_reason_is_incomplete_max_turns() {
        struct NeverStopsProvider;
        #[async_trait]
        impl BackendProvider for NeverStopsProvider {
            async fn invoke(&self, _request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Ok(ProviderResponse {
                    content: None,
                    reasoning_content: None,
                    tool_calls: vec![ToolCall { id: CallId::new(), name: "get_weather".to_string(), arguments: "{}".to_string() }],
                    usage: None,
                    finish_reason: FinishReason::ToolCalls,
                })
            }
        }
        let registry = ToolRegistry::new(vec![Arc::new(WeatherExecutor)]);
        let engine = Engine::new(
            None,
            registry,
            vec![],
            Arc::new(NeverStopsProvider),
            EngineConfig { max_turns: 2, ..EngineConfig::default() },
        );
        let ctx = StoreContext::single_tenant();
        let mut request = base_request();
        request.store = false;
        let response = engine.create_response(&ctx, request, None).await.unwrap();
        assert_eq!(response.status, ResponseStatus::Incomplete);
        assert_eq!(response.incomplete_reason, Some(IncompleteReason::MaxTurns));
    }
}
