//! Policy configuration (`.ralph/policy.toml`) and per-run snapshots.
//!
//! The TOML file is operator-edited. `max_iterations`,
//! `auto_abort_on_failure`, and `require_human_review` have documented
//! defaults; the remaining thresholds are required and their absence is a
//! configuration error reported when ralph mode starts, never silently
//! defaulted.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::policy::{DEFAULT_MAX_ITERATIONS, RunPolicy};
use crate::io::atomic::{load_json, write_json_atomic};

/// Operator-facing policy configuration (TOML).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub max_iterations: Option<u32>,
    pub max_failures: Option<u32>,
    pub max_repeated_error: Option<u32>,
    pub max_no_progress_iterations: Option<u32>,
    pub auto_abort_on_failure: Option<bool>,
    pub require_human_review: Option<bool>,
}

impl PolicyConfig {
    /// Resolve into a validated [`RunPolicy`], applying defaults only where
    /// the spec'd defaults exist.
    pub fn resolve(&self) -> Result<RunPolicy> {
        let policy = RunPolicy {
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            max_failures: self
                .max_failures
                .ok_or_else(|| anyhow!("policy is missing required field max_failures"))?,
            max_repeated_error: self
                .max_repeated_error
                .ok_or_else(|| anyhow!("policy is missing required field max_repeated_error"))?,
            max_no_progress_iterations: self.max_no_progress_iterations.ok_or_else(|| {
                anyhow!("policy is missing required field max_no_progress_iterations")
            })?,
            auto_abort_on_failure: self.auto_abort_on_failure.unwrap_or(true),
            require_human_review: self.require_human_review.unwrap_or(false),
        };
        policy.validate().map_err(|msg| anyhow!(msg))?;
        Ok(policy)
    }
}

/// Load the operator policy configuration.
///
/// A missing file behaves like an empty one, so required thresholds still
/// surface as configuration errors at resolve time.
pub fn load_policy_config(path: &Path) -> Result<PolicyConfig> {
    if !path.exists() {
        return Ok(PolicyConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Load the resolved per-run policy snapshot.
pub fn load_run_policy(path: &Path) -> Result<RunPolicy> {
    load_json(path)
}

/// Persist the resolved per-run policy snapshot.
pub fn write_run_policy(path: &Path, policy: &RunPolicy) -> Result<()> {
    write_json_atomic(path, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> PolicyConfig {
        PolicyConfig {
            max_iterations: Some(10),
            max_failures: Some(4),
            max_repeated_error: Some(3),
            max_no_progress_iterations: Some(5),
            auto_abort_on_failure: Some(false),
            require_human_review: Some(true),
        }
    }

    #[test]
    fn resolve_applies_documented_defaults_only() {
        let config = PolicyConfig {
            max_failures: Some(4),
            max_repeated_error: Some(3),
            max_no_progress_iterations: Some(5),
            ..PolicyConfig::default()
        };
        let policy = config.resolve().expect("resolve");
        assert_eq!(policy.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert!(policy.auto_abort_on_failure);
        assert!(!policy.require_human_review);
    }

    #[test]
    fn resolve_rejects_missing_required_thresholds() {
        let patches: [fn(&mut PolicyConfig); 3] = [
            |c| c.max_failures = None,
            |c| c.max_repeated_error = None,
            |c| c.max_no_progress_iterations = None,
        ];
        for patch in patches {
            let mut config = full_config();
            patch(&mut config);
            let err = config.resolve().expect_err("missing field");
            assert!(err.to_string().contains("missing required field"));
        }
    }

    #[test]
    fn resolve_rejects_zero_thresholds() {
        let mut config = full_config();
        config.max_repeated_error = Some(0);
        assert!(config.resolve().is_err());
    }

    #[test]
    fn load_missing_config_behaves_like_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = load_policy_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(config, PolicyConfig::default());
        assert!(config.resolve().is_err());
    }

    #[test]
    fn load_parses_operator_toml() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("policy.toml");
        fs::write(
            &path,
            "max_failures = 4\nmax_repeated_error = 3\nmax_no_progress_iterations = 5\n",
        )
        .expect("write");

        let policy = load_policy_config(&path)
            .expect("load")
            .resolve()
            .expect("resolve");
        assert_eq!(policy.max_failures, 4);
        assert_eq!(policy.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn run_policy_snapshot_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("policy.json");
        let policy = full_config().resolve().expect("resolve");

        write_run_policy(&path, &policy).expect("write");
        let loaded = load_run_policy(&path).expect("load");
        assert_eq!(loaded, policy);
    }
}
