//! OpenResponses wire protocol: typed IDs, items, responses, requests,
//! validation, and the SSE event taxonomy. Every other crate in this
//! workspace depends on `protocol` for its shared vocabulary; nothing in
//! here depends on storage, tool execution, or the HTTP layer.

pub mod error;
pub mod events;
pub mod ids;
pub mod item;
pub mod request;
pub mod response;
pub mod validate;

pub use error::{ApiError, ApiErrorType, ErrorBody};
pub use events::{SequenceCounter, StreamEvent};
pub use ids::{CallId, IdParseError, ItemId, MsgId, ResponseId};
pub use item::{
    Annotation, CodeInterpreterCallData, CodeInterpreterOutput, ContentPart, Identity, Item,
    ItemPayload, ItemStatus, MessageData, OutputContentPart, Role, ToolCall, ToolChoice,
    ToolChoiceMode, ToolDefinition, ToolResult, ToolType, Usage,
};
pub use request::{CreateResponseRequest, Input, ListOptions, SortOrder, SubmitToolOutputsRequest};
pub use response::{
    validate_response_transition, IncompleteReason, RequiredAction, RequiredActionType, Response,
    ResponseStatus, SubmitToolOutputs,
};
pub use validate::{validate, ValidateConfig};
