//! Shared deterministic types for supervisor core logic.
//!
//! These types define stable contracts between core components and the wire
//! payloads of the reporting boundary. They should not depend on external
//! state or I/O and must remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Active,
    Completed,
    Failed,
}

impl RunStatus {
    /// Completed and failed runs never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Status of a single iteration within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IterationStatus {
    Running,
    Passed,
    Failed,
    WaitingForApproval,
    Aborted,
}

impl IterationStatus {
    /// Running and waiting-for-approval iterations may still transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Aborted)
    }
}

/// Why a run stopped abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortCode {
    HumanAbort,
    IterationBudget,
    FailureBudget,
}

/// Outcome of one verification command reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub cmd: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_path: Option<String>,
    /// Wall-clock duration in milliseconds, informational only.
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Size of the diff produced by an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub files: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// Persisted record of one iteration, unique on (run, number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    /// 1-indexed, monotonically increasing per run.
    pub number: u32,
    pub status: IterationStatus,
    /// Structured verification summary (commands the agent ran).
    #[serde(default)]
    pub command_results: Vec<CommandResult>,
    pub error_fingerprint: Option<String>,
    pub diff_stats: Option<DiffStats>,
    /// Epoch milliseconds.
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
}

impl IterationRecord {
    /// Freshly opened iteration awaiting an agent result.
    pub fn running(number: u32, started_at: u64) -> Self {
        Self {
            number,
            status: IterationStatus::Running,
            command_results: Vec::new(),
            error_fingerprint: None,
            diff_stats: None,
            started_at: Some(started_at),
            ended_at: None,
        }
    }
}

/// Result report submitted by the agent after an iteration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    /// Iteration number the report closes; must name the RUNNING iteration.
    pub iteration: u32,
    pub command_results: Vec<CommandResult>,
    pub passed: bool,
    #[serde(default)]
    pub error_fingerprint: Option<String>,
    #[serde(default)]
    pub diff_stats: Option<DiffStats>,
    /// True when verification output contained the completion token.
    #[serde(default)]
    pub completion_token_found: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_in_wire_casing() {
        let json = serde_json::to_string(&IterationStatus::WaitingForApproval).expect("serialize");
        assert_eq!(json, "\"WAITING_FOR_APPROVAL\"");
        let json = serde_json::to_string(&RunStatus::Active).expect("serialize");
        assert_eq!(json, "\"ACTIVE\"");
        let json = serde_json::to_string(&AbortCode::FailureBudget).expect("serialize");
        assert_eq!(json, "\"FAILURE_BUDGET\"");
    }

    #[test]
    fn result_report_parses_wire_payload() {
        let raw = r#"{
            "iteration": 3,
            "commandResults": [
                { "cmd": "cargo test", "exitCode": 101, "stderrPath": "logs/err.txt", "duration": 1200 }
            ],
            "passed": false,
            "diffStats": { "files": 2, "insertions": 10, "deletions": 4 }
        }"#;
        let report: ResultReport = serde_json::from_str(raw).expect("parse");
        assert_eq!(report.iteration, 3);
        assert_eq!(report.command_results[0].exit_code, 101);
        assert_eq!(report.command_results[0].duration_ms, Some(1200));
        assert!(!report.completion_token_found);
        assert_eq!(report.error_fingerprint, None);
    }

    #[test]
    fn terminal_statuses_are_classified() {
        assert!(IterationStatus::Passed.is_terminal());
        assert!(IterationStatus::Aborted.is_terminal());
        assert!(!IterationStatus::Running.is_terminal());
        assert!(!IterationStatus::WaitingForApproval.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Active.is_terminal());
    }
}
