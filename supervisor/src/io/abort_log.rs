//! Abort log (`.ralph/runs/<run-id>/abort.json`).
//!
//! At most one live record per run; writes are upserts.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::AbortCode;
use crate::io::atomic::{load_json, write_json_atomic};

/// Why the run stopped abnormally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortRecord {
    pub code: AbortCode,
    pub reason: String,
    pub details: Option<String>,
    /// Epoch milliseconds.
    pub recorded_at: u64,
}

pub fn upsert_abort(path: &Path, record: &AbortRecord) -> Result<()> {
    debug!(code = ?record.code, reason = %record.reason, "upserting abort record");
    write_json_atomic(path, record)
}

pub fn load_abort(path: &Path) -> Result<Option<AbortRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(load_json(path)?))
}
