//! The `Response` entity and its status state machine (spec §3.1, §3.3).

use crate::error::ApiError;
use crate::ids::ResponseId;
use crate::item::{ToolChoice, ToolDefinition, Usage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a `Response` (spec §3.3).
///
/// Legal transitions:
/// `in_progress -> {completed, incomplete, failed, cancelled, requires_action}`
/// `requires_action -> {in_progress, cancelled, failed}`
/// all others are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
    Incomplete,
    Failed,
    Cancelled,
    RequiresAction,
}

impl ResponseStatus {
    /// True if no further transition is legal out of this status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResponseStatus::InProgress | ResponseStatus::RequiresAction)
    }

    /// Validates a status transition per the state machine in spec §3.3.
    pub fn can_transition_to(self, next: ResponseStatus) -> bool {
        use ResponseStatus::*;
        match (self, next) {
            (InProgress, Completed)
            | (InProgress, Incomplete)
            | (InProgress, Failed)
            | (InProgress, Cancelled)
            | (InProgress, RequiresAction) => true,
            (RequiresAction, InProgress) | (RequiresAction, Cancelled) | (RequiresAction, Failed) => true,
            _ => false,
        }
    }
}

/// `ValidateResponseTransition(from, to)` (spec §4.1): `from = None` stands
/// for the initial/unset status, out of which only `in_progress` is legal
/// (scenario S3). Returns a stable-coded `invalid_request` error so callers
/// in the engine and in persistence layers can match on `code()` rather than
/// parsing a message.
pub fn validate_response_transition(
    from: Option<ResponseStatus>,
    to: ResponseStatus,
) -> Result<(), ApiError> {
    let legal = match from {
        None => to == ResponseStatus::InProgress,
        Some(from) => from.can_transition_to(to),
    };
    if legal {
        return Ok(());
    }
    let from_label = from.map(|s| format!("{s:?}")).unwrap_or_else(|| "(initial)".to_string());
    Err(ApiError::invalid_request(format!(
        "illegal response status transition: {from_label} -> {to:?}"
    ))
    .with_code("response_status_transition"))
}

/// Reason a response ended in `incomplete` (spec §3.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    MaxOutputTokens,
    MaxTurns,
    ContentFilter,
}

/// Why a `requires_action` response is paused (spec §3.3): it is always
/// waiting on client-executed `function` tool outputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub action_type: RequiredActionType,
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredActionType {
    SubmitToolOutputs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<crate::item::ToolCall>,
}

/// The persisted `Response` entity (spec §3.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub status: ResponseStatus,
    /// Unix seconds on the wire (spec §3.2, §6.4), not RFC3339.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    /// `previous_response_id` chain link; `None` for a chain root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<ResponseId>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    pub usage: Usage,
    /// Accumulated output items for this turn (spec §4.7.3, §6.4). Input
    /// items are stored separately by the `ResponseStore` (`save_response`'s
    /// `input_items` argument), matching spec §6.4's indexed layout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<crate::item::Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete_reason: Option<IncompleteReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::error::ApiError>,
    /// Soft-delete marker; never observable through the store's read API
    /// except `GetResponseForChain` (spec §4.2). Unix seconds on the wire,
    /// matching `created_at`.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
    /// Passthrough extension fields under a vendor-prefixed top-level key,
    /// e.g. `"acme_trace_id"` (spec §4.7.4); never interpreted by core.
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, Value>,
}

impl Response {
    /// Applies `next` if the transition is legal, via
    /// [`validate_response_transition`].
    pub fn transition(&mut self, next: ResponseStatus) -> Result<(), ApiError> {
        validate_response_transition(Some(self.status), next)?;
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_can_reach_every_direct_successor() {
        for next in [
            ResponseStatus::Completed,
            ResponseStatus::Incomplete,
            ResponseStatus::Failed,
            ResponseStatus::Cancelled,
            ResponseStatus::RequiresAction,
        ] {
            assert!(ResponseStatus::InProgress.can_transition_to(next));
        }
    }

    #[test]
    fn requires_action_can_resume_or_terminate_but_not_reach_completed_directly() {
        assert!(ResponseStatus::RequiresAction.can_transition_to(ResponseStatus::InProgress));
        assert!(ResponseStatus::RequiresAction.can_transition_to(ResponseStatus::Cancelled));
        assert!(ResponseStatus::RequiresAction.can_transition_to(ResponseStatus::Failed));
        assert!(!ResponseStatus::RequiresAction.can_transition_to(ResponseStatus::Completed));
    }

    #[test]
    fn terminal_statuses_absorb() {
        for terminal in [
            ResponseStatus::Completed,
            ResponseStatus::Incomplete,
            ResponseStatus::Failed,
            ResponseStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(ResponseStatus::InProgress));
        }
    }

    #[test]
    fn illegal_transition_is_rejected_with_message() {
        let mut response = sample_response();
        response.status = ResponseStatus::Completed;
        let err = response.transition(ResponseStatus::InProgress).unwrap_err();
        assert_eq!(err.error_type, crate::error::ApiErrorType::InvalidRequest);
        assert_eq!(err.code.as_deref(), Some("response_status_transition"));
        assert!(err.message.contains("Completed"));
    }

    /// Scenario S3: `ValidateResponseTransition(completed, in_progress)` is
    /// an error; `ValidateResponseTransition(None, in_progress)` — the
    /// initial/unset state — is ok.
    #[test]
    fn s3_validate_response_transition() {
        assert!(validate_response_transition(
            Some(ResponseStatus::Completed),
            ResponseStatus::InProgress
        )
        .is_err());
        assert!(validate_response_transition(None, ResponseStatus::InProgress).is_ok());
    }

    #[test]
    fn initial_state_rejects_transitions_other_than_in_progress() {
        assert!(validate_response_transition(None, ResponseStatus::Completed).is_err());
        assert!(validate_response_transition(None, ResponseStatus::RequiresAction).is_err());
    }

    /// spec §3.2/§6.4: `created_at` is unix seconds on the wire, not RFC3339.
    #[test]
    fn created_at_and_deleted_at_serialize_as_unix_seconds() {
        let mut response = sample_response();
        response.created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        response.deleted_at = DateTime::from_timestamp(1_700_000_050, 0);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["created_at"], 1_700_000_000);
        assert_eq!(json["deleted_at"], 1_700_000_050);

        let round_tripped: Response = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped.created_at, response.created_at);
        assert_eq!(round_tripped.deleted_at, response.deleted_at);
    }

    fn sample_response() -> Response {
        Response {
            id: ResponseId::new(),
            status: ResponseStatus::InProgress,
            created_at: Utc::now(),
            previous_response_id: None,
            model: "gpt-test".to_string(),
            instructions: None,
            tools: vec![],
            tool_choice: ToolChoice::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            usage: Usage::default(),
            output: vec![],
            incomplete_reason: None,
            required_action: None,
            error: None,
            deleted_at: None,
            metadata: Default::default(),
            extensions: Default::default(),
        }
    }
}
