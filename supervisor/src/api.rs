//! Wire payloads and request handling for the control boundary.
//!
//! Two logical operations cross this boundary: control actions
//! (`start`/`stop`/`approve`) and result reporting. Payload shapes follow
//! the console's JSON contract; errors map to HTTP-style statuses via
//! [`ControlError::http_status`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::controller::{ControlError, RecordOutcome, RunController};
use crate::core::breaker::Verdict;
use crate::core::types::{IterationRecord, ResultReport, RunStatus};

/// Control action request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    /// `"start"`, `"stop"`, or `"approve"`; anything else is a 400.
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// What the agent should do next after a recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Continue,
    WaitApproval,
    Abort,
    Complete,
}

impl From<Verdict> for NextAction {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Continue => Self::Continue,
            Verdict::WaitApproval => Self::WaitApproval,
            Verdict::Abort(_) => Self::Abort,
            Verdict::Complete => Self::Complete,
        }
    }
}

/// Response body for `record_result`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultResponse {
    pub iteration: IterationRecord,
    pub next_action: NextAction,
    pub abort_reason: Option<String>,
    pub run_status: RunStatus,
}

impl From<RecordOutcome> for RecordResultResponse {
    fn from(outcome: RecordOutcome) -> Self {
        Self {
            next_action: NextAction::from(outcome.decision.verdict),
            abort_reason: outcome.decision.reason,
            iteration: outcome.iteration,
            run_status: outcome.run.status,
        }
    }
}

/// Error body returned alongside the HTTP-style status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn from_error(err: &ControlError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Dispatch a control action against a run.
pub fn handle_control(
    controller: &RunController,
    run_id: &str,
    request: &ControlRequest,
) -> Result<Value, ControlError> {
    match request.action.as_str() {
        "start" => {
            let outcome = controller.start(run_id)?;
            Ok(json!({
                "message": "ralph mode started",
                "run": outcome.run,
                "iteration": outcome.iteration,
            }))
        }
        "stop" => {
            let outcome = controller.stop(run_id, request.reason.as_deref())?;
            Ok(json!({
                "message": "ralph mode stopped",
                "run": outcome.run,
                "abort": outcome.abort,
            }))
        }
        "approve" => {
            let outcome = controller.approve(run_id)?;
            Ok(json!({
                "message": "iteration approved",
                "run": outcome.run,
                "approved": outcome.approved,
                "next": outcome.next,
            }))
        }
        other => Err(ControlError::InvalidAction(other.to_string())),
    }
}

/// Record an iteration result and return the wire response.
pub fn handle_record_result(
    controller: &RunController,
    run_id: &str,
    report: &ResultReport,
) -> Result<RecordResultResponse, ControlError> {
    let outcome = controller.record_result(run_id, report)?;
    Ok(RecordResultResponse::from(outcome))
}
