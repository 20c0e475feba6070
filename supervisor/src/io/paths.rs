//! Filesystem layout for supervisor state under `.ralph/`.

use std::path::{Path, PathBuf};

/// Top-level state layout rooted at the console's working directory.
#[derive(Debug, Clone)]
pub struct SupervisorPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    /// Operator-edited policy configuration.
    pub policy_config_path: PathBuf,
    pub runs_dir: PathBuf,
}

impl SupervisorPaths {
    pub fn new(root: &Path) -> Self {
        let state_dir = root.join(".ralph");
        Self {
            root: root.to_path_buf(),
            policy_config_path: state_dir.join("policy.toml"),
            runs_dir: state_dir.join("runs"),
            state_dir,
        }
    }

    pub fn run(&self, run_id: &str) -> RunPaths {
        RunPaths::new(&self.runs_dir, run_id)
    }
}

/// Per-run state layout: `.ralph/runs/<run-id>/`.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub run_path: PathBuf,
    /// Resolved policy snapshot, written on first `start`.
    pub policy_path: PathBuf,
    pub abort_path: PathBuf,
    pub iterations_dir: PathBuf,
}

impl RunPaths {
    pub fn new(runs_dir: &Path, run_id: &str) -> Self {
        let dir = runs_dir.join(run_id);
        Self {
            run_path: dir.join("run.json"),
            policy_path: dir.join("policy.json"),
            abort_path: dir.join("abort.json"),
            iterations_dir: dir.join("iterations"),
            dir,
        }
    }

    pub fn iteration_path(&self, number: u32) -> PathBuf {
        self.iterations_dir.join(format!("{number}.json"))
    }
}
