//! Test-only helpers for driving the controller against a temp state root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::controller::RunController;
use crate::core::types::{CommandResult, DiffStats, ResultReport};
use crate::io::paths::SupervisorPaths;

/// Policy configuration used by most scenario tests: generous budgets so a
/// single breaker can be exercised in isolation.
pub const DEFAULT_TEST_POLICY: &str = "\
max_iterations = 25
max_failures = 10
max_repeated_error = 3
max_no_progress_iterations = 5
";

/// A controller rooted at a temporary directory with a policy file written.
pub struct TestConsole {
    temp: tempfile::TempDir,
    pub controller: RunController,
}

impl TestConsole {
    pub fn new() -> Result<Self> {
        Self::with_policy(DEFAULT_TEST_POLICY)
    }

    pub fn with_policy(policy_toml: &str) -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        write_policy(temp.path(), policy_toml)?;
        let controller = RunController::new(temp.path());
        Ok(Self { temp, controller })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }
}

/// Write (or replace) the operator policy file under `root`.
pub fn write_policy(root: &Path, policy_toml: &str) -> Result<()> {
    let paths = SupervisorPaths::new(root);
    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create {}", paths.state_dir.display()))?;
    fs::write(&paths.policy_config_path, policy_toml)
        .with_context(|| format!("write {}", paths.policy_config_path.display()))?;
    Ok(())
}

/// Failed report with the fingerprint derived from `(cmd, exit_code)`.
pub fn failed_report(iteration: u32, cmd: &str, exit_code: i32) -> ResultReport {
    ResultReport {
        iteration,
        command_results: vec![CommandResult {
            cmd: cmd.to_string(),
            exit_code,
            stdout_path: None,
            stderr_path: None,
            duration_ms: None,
        }],
        passed: false,
        error_fingerprint: None,
        diff_stats: None,
        completion_token_found: false,
    }
}

/// Failed report with an explicit, agent-supplied fingerprint.
pub fn failed_report_with_fingerprint(iteration: u32, fingerprint: &str) -> ResultReport {
    ResultReport {
        error_fingerprint: Some(fingerprint.to_string()),
        ..failed_report(iteration, "cargo test", 101)
    }
}

/// Passed report, optionally carrying the completion token.
pub fn passed_report(iteration: u32, completion_token_found: bool) -> ResultReport {
    ResultReport {
        iteration,
        command_results: vec![CommandResult {
            cmd: "cargo test".to_string(),
            exit_code: 0,
            stdout_path: None,
            stderr_path: None,
            duration_ms: Some(1500),
        }],
        passed: true,
        error_fingerprint: None,
        diff_stats: Some(DiffStats {
            files: 1,
            insertions: 5,
            deletions: 1,
        }),
        completion_token_found,
    }
}
