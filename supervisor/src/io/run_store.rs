//! Run record storage (`.ralph/runs/<run-id>/run.json`).

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::RunStatus;
use crate::io::atomic::{load_json, write_json_atomic};

/// Persisted record for one supervised run.
///
/// Invariant: `ralph_mode` is true only while `status` is `ACTIVE`; every
/// terminal transition (and explicit stop) clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub status: RunStatus,
    /// True while the supervised control loop is engaged.
    pub ralph_mode: bool,
    /// Epoch milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
    pub completed_at: Option<u64>,
}

impl RunRecord {
    /// Fresh run as the external run-management flow creates it: active,
    /// loop not yet engaged.
    pub fn new(id: &str, created_at: u64) -> Self {
        Self {
            id: id.to_string(),
            status: RunStatus::Active,
            ralph_mode: false,
            created_at,
            updated_at: created_at,
            completed_at: None,
        }
    }
}

pub fn run_exists(path: &Path) -> bool {
    path.is_file()
}

pub fn load_run(path: &Path) -> Result<RunRecord> {
    let run: RunRecord = load_json(path)?;
    debug!(run_id = %run.id, status = ?run.status, ralph_mode = run.ralph_mode, "run loaded");
    Ok(run)
}

/// Atomically write the run record. Control actions write this last, as the
/// commit point of their multi-file sequence.
pub fn write_run(path: &Path, run: &RunRecord) -> Result<()> {
    debug!(run_id = %run.id, status = ?run.status, ralph_mode = run.ralph_mode, "writing run");
    write_json_atomic(path, run)
}
