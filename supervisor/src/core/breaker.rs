//! Circuit-breaker evaluation for a just-closed iteration.
//!
//! Pure decision function: given the run policy, the prior iteration history,
//! and the newest result, return one verdict plus an optional human-readable
//! reason. The caller applies all side effects.
//!
//! The breakers form an explicit priority list evaluated once, first match
//! wins: no-progress, then iteration budget, then failure budget, then
//! thrashing. A passed result short-circuits before any breaker runs.

use serde::Serialize;

use crate::core::policy::RunPolicy;
use crate::core::types::{AbortCode, IterationRecord, IterationStatus};

/// Final verdict for a just-closed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Open the next iteration.
    Continue,
    /// Pause the loop until a human approves.
    WaitApproval,
    /// Terminate the run with the given abort code.
    Abort(AbortCode),
    /// The task is done; close the run successfully.
    Complete,
}

/// Verdict plus the reason a breaker tripped, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Option<String>,
}

impl Decision {
    fn of(verdict: Verdict) -> Self {
        Self {
            verdict,
            reason: None,
        }
    }

    fn with_reason(verdict: Verdict, reason: String) -> Self {
        Self {
            verdict,
            reason: Some(reason),
        }
    }
}

/// The just-closed iteration, before its terminal status is decided.
#[derive(Debug, Clone, Copy)]
pub struct ClosedIteration<'a> {
    pub number: u32,
    pub passed: bool,
    /// Present only on failure.
    pub error_fingerprint: Option<&'a str>,
    pub completion_token_found: bool,
}

/// Evaluate the circuit breakers for a just-closed iteration.
///
/// `prior` must be ordered descending by iteration number and exclude the
/// iteration being closed.
pub fn evaluate(
    policy: &RunPolicy,
    prior: &[IterationRecord],
    current: &ClosedIteration,
) -> Decision {
    if current.passed {
        if current.completion_token_found {
            return Decision::of(Verdict::Complete);
        }
        // Passed without the completion token: the loop keeps going.
        return Decision::of(Verdict::Continue);
    }

    let tripped = no_progress(policy, prior)
        .or_else(|| iteration_budget(policy, current))
        .or_else(|| failure_budget(policy, prior))
        .or_else(|| thrashing(policy, prior, current));

    match tripped {
        Some(decision) => gate_auto_abort(policy, decision),
        None if policy.require_human_review => Decision::with_reason(
            Verdict::WaitApproval,
            "Human review required after failed iteration".to_string(),
        ),
        None => Decision::of(Verdict::Continue),
    }
}

/// Stagnation: the most recent `max_no_progress_iterations` prior iterations
/// form a full window and every entry failed.
fn no_progress(policy: &RunPolicy, prior: &[IterationRecord]) -> Option<Decision> {
    let window = policy.max_no_progress_iterations as usize;
    if prior.len() < window {
        return None;
    }
    if !prior
        .iter()
        .take(window)
        .all(|it| it.status == IterationStatus::Failed)
    {
        return None;
    }
    Some(Decision::with_reason(
        Verdict::WaitApproval,
        format!(
            "No progress in last {} iterations",
            policy.max_no_progress_iterations
        ),
    ))
}

fn iteration_budget(policy: &RunPolicy, current: &ClosedIteration) -> Option<Decision> {
    if current.number < policy.max_iterations {
        return None;
    }
    Some(Decision::with_reason(
        Verdict::Abort(AbortCode::IterationBudget),
        format!(
            "Max iterations reached: {}/{}",
            current.number, policy.max_iterations
        ),
    ))
}

fn failure_budget(policy: &RunPolicy, prior: &[IterationRecord]) -> Option<Decision> {
    let total_failures = count_failed(prior) + 1;
    if total_failures < policy.max_failures as usize {
        return None;
    }
    Some(Decision::with_reason(
        Verdict::Abort(AbortCode::FailureBudget),
        format!(
            "Max failures reached: {}/{}",
            total_failures, policy.max_failures
        ),
    ))
}

/// Thrashing: the same failure fingerprint keeps recurring.
fn thrashing(
    policy: &RunPolicy,
    prior: &[IterationRecord],
    current: &ClosedIteration,
) -> Option<Decision> {
    let fingerprint = current.error_fingerprint?;
    let repeated = prior
        .iter()
        .filter(|it| it.status == IterationStatus::Failed)
        .filter(|it| it.error_fingerprint.as_deref() == Some(fingerprint))
        .count()
        + 1;
    if repeated < policy.max_repeated_error as usize {
        return None;
    }
    Some(Decision::with_reason(
        Verdict::WaitApproval,
        format!("Thrashing detected: same error {repeated} times"),
    ))
}

/// With `auto_abort_on_failure` off, budget breaches pause for a human
/// instead of terminating the run.
fn gate_auto_abort(policy: &RunPolicy, decision: Decision) -> Decision {
    if policy.auto_abort_on_failure {
        return decision;
    }
    match decision.verdict {
        Verdict::Abort(_) => Decision {
            verdict: Verdict::WaitApproval,
            reason: decision.reason,
        },
        _ => decision,
    }
}

fn count_failed(prior: &[IterationRecord]) -> usize {
    prior
        .iter()
        .filter(|it| it.status == IterationStatus::Failed)
        .count()
}
