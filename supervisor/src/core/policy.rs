//! Per-run safety thresholds for the circuit breaker.

use serde::{Deserialize, Serialize};

/// Default iteration budget applied when the operator config omits it.
pub const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// Resolved thresholds governing one run.
///
/// `max_failures`, `max_repeated_error`, and `max_no_progress_iterations`
/// have no implicit defaults; they come from operator configuration and are
/// validated when ralph mode starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPolicy {
    /// Iteration budget: the run aborts once this iteration number is reached.
    pub max_iterations: u32,
    /// Total failed-iteration budget across the run.
    pub max_failures: u32,
    /// How many identical failure fingerprints count as thrashing.
    pub max_repeated_error: u32,
    /// Window of consecutive failed iterations treated as stagnation.
    pub max_no_progress_iterations: u32,
    /// When false, budget breaches pause for approval instead of aborting.
    pub auto_abort_on_failure: bool,
    /// When true, every failed iteration pauses for approval.
    pub require_human_review: bool,
}

impl RunPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be >= 1".to_string());
        }
        if self.max_failures == 0 {
            return Err("max_failures must be >= 1".to_string());
        }
        if self.max_repeated_error == 0 {
            return Err("max_repeated_error must be >= 1".to_string());
        }
        if self.max_no_progress_iterations == 0 {
            return Err("max_no_progress_iterations must be >= 1".to_string());
        }
        Ok(())
    }
}
