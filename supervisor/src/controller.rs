//! Orchestration of Ralph Mode control actions.
//!
//! The controller coordinates the pure circuit-breaker evaluation with the
//! file-backed stores. Every action for a given run executes under a per-run
//! lock, and the run record is written last as the commit point of the
//! multi-file sequence, so `stop` always wins over a concurrently computed
//! verdict and a crash mid-sequence never leaves a terminal run behind a
//! half-applied decision.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::breaker::{ClosedIteration, Decision, Verdict, evaluate};
use crate::core::fingerprint::derive_fingerprint;
use crate::core::policy::RunPolicy;
use crate::core::types::{AbortCode, IterationRecord, IterationStatus, ResultReport, RunStatus};
use crate::io::abort_log::{AbortRecord, load_abort, upsert_abort};
use crate::io::ledger;
use crate::io::paths::{RunPaths, SupervisorPaths};
use crate::io::policy_store::{load_policy_config, load_run_policy, write_run_policy};
use crate::io::run_store::{RunRecord, load_run, run_exists, write_run};

const DEFAULT_STOP_REASON: &str = "stopped by operator";

/// Errors surfaced by control actions. No state is mutated on any rejection.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("run '{0}' not found")]
    NotFound(String),
    #[error("run '{0}' already exists")]
    AlreadyExists(String),
    #[error("ralph mode is already active for run '{0}'")]
    AlreadyActive(String),
    #[error("ralph mode is not active for run '{0}'")]
    NotActive(String),
    #[error("run '{0}' is in a terminal state")]
    TerminalState(String),
    #[error("no iteration is waiting for approval on run '{0}'")]
    NoPendingApproval(String),
    #[error("iteration {number} is not the running iteration for run '{run_id}'")]
    IterationNotRunning { run_id: String, number: u32 },
    #[error("invalid action '{0}'")]
    InvalidAction(String),
    #[error("invalid policy configuration: {0}")]
    InvalidPolicy(String),
    #[error("invalid result report: {0}")]
    InvalidReport(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ControlError {
    /// HTTP-style status for the wire boundary: 404 unknown run, 409 invalid
    /// state, 400 invalid payload/config, 500 persistence failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_)
            | Self::AlreadyActive(_)
            | Self::NotActive(_)
            | Self::TerminalState(_)
            | Self::NoPendingApproval(_)
            | Self::IterationNotRunning { .. } => 409,
            Self::InvalidAction(_) | Self::InvalidPolicy(_) | Self::InvalidReport(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}

/// Result of `start`: the engaged run and its first running iteration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub run: RunRecord,
    pub iteration: IterationRecord,
}

/// Result of `stop`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOutcome {
    pub run: RunRecord,
    pub abort: AbortRecord,
}

/// Result of `approve`: the passed iteration and its successor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveOutcome {
    pub run: RunRecord,
    pub approved: IterationRecord,
    pub next: IterationRecord,
}

/// Result of `record_result`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub run: RunRecord,
    /// The just-closed iteration with its final status.
    pub iteration: IterationRecord,
    pub decision: DecisionSummary,
    /// Present when the verdict opened iteration N+1.
    pub next_iteration: Option<IterationRecord>,
}

/// Serializable view of the breaker decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub verdict: Verdict,
    pub reason: Option<String>,
}

/// Read-only snapshot for `show`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run: RunRecord,
    pub policy: Option<RunPolicy>,
    pub latest_iteration: Option<IterationRecord>,
    pub abort: Option<AbortRecord>,
}

/// Supervises Ralph Mode runs rooted at one state directory.
pub struct RunController {
    paths: SupervisorPaths,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RunController {
    pub fn new(root: &Path) -> Self {
        Self {
            paths: SupervisorPaths::new(root),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a run in ACTIVE state with the loop disengaged. This stands in
    /// for the external run-management flow that owns run creation.
    pub fn create_run(&self, run_id: &str) -> Result<RunRecord, ControlError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let paths = self.paths.run(run_id);
        if run_exists(&paths.run_path) {
            return Err(ControlError::AlreadyExists(run_id.to_string()));
        }
        let run = RunRecord::new(run_id, now_ms());
        write_run(&paths.run_path, &run)?;
        info!(run_id, "run created");
        Ok(run)
    }

    /// Engage ralph mode: resolve policy, open iteration #1.
    pub fn start(&self, run_id: &str) -> Result<StartOutcome, ControlError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (paths, mut run) = self.load_existing(run_id)?;
        if run.status.is_terminal() {
            return Err(ControlError::TerminalState(run_id.to_string()));
        }
        if run.ralph_mode {
            return Err(ControlError::AlreadyActive(run_id.to_string()));
        }

        let policy = self.ensure_run_policy(&paths)?;
        debug!(run_id, ?policy, "policy resolved");

        let now = now_ms();
        let number = ledger::next_iteration_number(&paths)?;
        let iteration = IterationRecord::running(number, now);
        ledger::append_iteration(&paths, &iteration)?;

        run.ralph_mode = true;
        run.updated_at = now;
        write_run(&paths.run_path, &run)?;

        info!(run_id, iteration = number, "ralph mode started");
        Ok(StartOutcome { run, iteration })
    }

    /// Forced, operator-triggered termination. Always wins regardless of
    /// circuit-breaker state.
    pub fn stop(&self, run_id: &str, reason: Option<&str>) -> Result<StopOutcome, ControlError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (paths, mut run) = self.load_existing(run_id)?;
        if !run.ralph_mode {
            return Err(ControlError::NotActive(run_id.to_string()));
        }

        let now = now_ms();
        // Close out any non-terminal iteration before the run goes terminal.
        for mut iteration in ledger::list_iterations_desc(&paths)? {
            if iteration.status.is_terminal() {
                continue;
            }
            iteration.status = IterationStatus::Aborted;
            iteration.ended_at = Some(now);
            ledger::update_iteration(&paths, &iteration)?;
        }

        let abort = AbortRecord {
            code: AbortCode::HumanAbort,
            reason: reason.unwrap_or(DEFAULT_STOP_REASON).to_string(),
            details: None,
            recorded_at: now,
        };
        upsert_abort(&paths.abort_path, &abort)?;

        run.ralph_mode = false;
        run.status = RunStatus::Failed;
        run.completed_at = Some(now);
        run.updated_at = now;
        write_run(&paths.run_path, &run)?;

        warn!(run_id, reason = %abort.reason, "run stopped by operator");
        Ok(StopOutcome { run, abort })
    }

    /// Resume a loop paused at WAITING_FOR_APPROVAL.
    pub fn approve(&self, run_id: &str) -> Result<ApproveOutcome, ControlError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (paths, mut run) = self.load_existing(run_id)?;
        if !run.ralph_mode {
            return Err(ControlError::NotActive(run_id.to_string()));
        }

        let mut approved = ledger::latest_iteration(&paths)?
            .filter(|it| it.status == IterationStatus::WaitingForApproval)
            .ok_or_else(|| ControlError::NoPendingApproval(run_id.to_string()))?;

        let now = now_ms();
        approved.status = IterationStatus::Passed;
        ledger::update_iteration(&paths, &approved)?;

        let next = IterationRecord::running(approved.number + 1, now);
        ledger::append_iteration(&paths, &next)?;

        run.updated_at = now;
        write_run(&paths.run_path, &run)?;

        info!(run_id, approved = approved.number, next = next.number, "iteration approved");
        Ok(ApproveOutcome { run, approved, next })
    }

    /// Close the current RUNNING iteration with the agent's result and apply
    /// the circuit-breaker verdict.
    pub fn record_result(
        &self,
        run_id: &str,
        report: &ResultReport,
    ) -> Result<RecordOutcome, ControlError> {
        validate_report(report)?;

        let lock = self.run_lock(run_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (paths, mut run) = self.load_existing(run_id)?;
        if !run.ralph_mode {
            return Err(ControlError::NotActive(run_id.to_string()));
        }

        // Idempotency guard: resubmissions and stale reports are rejected
        // instead of producing duplicate transitions.
        let mut current = ledger::load_iteration(&paths, report.iteration)?
            .filter(|it| it.status == IterationStatus::Running)
            .ok_or_else(|| ControlError::IterationNotRunning {
                run_id: run_id.to_string(),
                number: report.iteration,
            })?;

        let policy = load_run_policy(&paths.policy_path)
            .map_err(|err| ControlError::InvalidPolicy(err.to_string()))?;

        let prior: Vec<IterationRecord> = ledger::list_iterations_desc(&paths)?
            .into_iter()
            .filter(|it| it.number < current.number)
            .collect();

        let fingerprint = if report.passed {
            None
        } else {
            report
                .error_fingerprint
                .clone()
                .or_else(|| derive_fingerprint(&report.command_results))
        };

        let decision = evaluate(
            &policy,
            &prior,
            &ClosedIteration {
                number: current.number,
                passed: report.passed,
                error_fingerprint: fingerprint.as_deref(),
                completion_token_found: report.completion_token_found,
            },
        );
        debug!(run_id, iteration = current.number, verdict = ?decision.verdict, "breaker evaluated");

        let now = now_ms();
        current.command_results = report.command_results.clone();
        current.error_fingerprint = fingerprint;
        current.diff_stats = report.diff_stats;
        current.ended_at = Some(now);
        current.status = closed_status(&decision, report.passed);
        ledger::update_iteration(&paths, &current)?;

        let mut next_iteration = None;
        match decision.verdict {
            Verdict::Complete => {
                run.status = RunStatus::Completed;
                run.ralph_mode = false;
                run.completed_at = Some(now);
                info!(run_id, iteration = current.number, "run completed");
            }
            Verdict::Abort(code) => {
                let abort = AbortRecord {
                    code,
                    reason: decision
                        .reason
                        .clone()
                        .unwrap_or_else(|| "circuit breaker tripped".to_string()),
                    details: None,
                    recorded_at: now,
                };
                upsert_abort(&paths.abort_path, &abort)?;
                run.status = RunStatus::Failed;
                run.ralph_mode = false;
                run.completed_at = Some(now);
                warn!(run_id, code = ?code, reason = %abort.reason, "run aborted");
            }
            Verdict::WaitApproval => {
                info!(run_id, iteration = current.number, "waiting for approval");
            }
            Verdict::Continue => {
                let next = IterationRecord::running(current.number + 1, now);
                ledger::append_iteration(&paths, &next)?;
                next_iteration = Some(next);
            }
        }

        run.updated_at = now;
        write_run(&paths.run_path, &run)?;

        Ok(RecordOutcome {
            run,
            iteration: current,
            decision: DecisionSummary {
                verdict: decision.verdict,
                reason: decision.reason,
            },
            next_iteration,
        })
    }

    /// Read-only view of a run's current state.
    pub fn show(&self, run_id: &str) -> Result<RunSnapshot, ControlError> {
        let paths = self.paths.run(run_id);
        if !run_exists(&paths.run_path) {
            return Err(ControlError::NotFound(run_id.to_string()));
        }
        let run = load_run(&paths.run_path)?;
        let policy = if paths.policy_path.exists() {
            Some(load_run_policy(&paths.policy_path)?)
        } else {
            None
        };
        Ok(RunSnapshot {
            run,
            policy,
            latest_iteration: ledger::latest_iteration(&paths)?,
            abort: load_abort(&paths.abort_path)?,
        })
    }

    fn load_existing(&self, run_id: &str) -> Result<(RunPaths, RunRecord), ControlError> {
        let paths = self.paths.run(run_id);
        if !run_exists(&paths.run_path) {
            return Err(ControlError::NotFound(run_id.to_string()));
        }
        let run = load_run(&paths.run_path)?;
        Ok((paths, run))
    }

    /// Load the per-run policy snapshot, resolving it from the operator
    /// configuration on first start.
    fn ensure_run_policy(&self, paths: &RunPaths) -> Result<RunPolicy, ControlError> {
        if paths.policy_path.exists() {
            return Ok(load_run_policy(&paths.policy_path)?);
        }
        let config = load_policy_config(&self.paths.policy_config_path)
            .map_err(|err| ControlError::InvalidPolicy(err.to_string()))?;
        let policy = config
            .resolve()
            .map_err(|err| ControlError::InvalidPolicy(err.to_string()))?;
        write_run_policy(&paths.policy_path, &policy)?;
        Ok(policy)
    }

    fn run_lock(&self, run_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(run_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Terminal status of the just-closed iteration under the final verdict.
fn closed_status(decision: &Decision, passed: bool) -> IterationStatus {
    match decision.verdict {
        Verdict::Complete => IterationStatus::Passed,
        Verdict::Abort(_) => IterationStatus::Failed,
        Verdict::WaitApproval => IterationStatus::WaitingForApproval,
        Verdict::Continue => {
            if passed {
                IterationStatus::Passed
            } else {
                IterationStatus::Failed
            }
        }
    }
}

fn validate_report(report: &ResultReport) -> Result<(), ControlError> {
    if report.iteration == 0 {
        return Err(ControlError::InvalidReport(
            "iteration must be >= 1".to_string(),
        ));
    }
    if report.command_results.is_empty() {
        return Err(ControlError::InvalidReport(
            "commandResults must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
