//! Iteration ledger (`.ralph/runs/<run-id>/iterations/<n>.json`).
//!
//! One JSON file per iteration; the file name is the iteration number, which
//! enforces uniqueness of (run, number). Numbers are 1-indexed and
//! monotonically increasing.

use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::types::IterationRecord;
use crate::io::atomic::{load_json, write_json_atomic};
use crate::io::paths::RunPaths;

/// Append a new iteration record. Fails if the number is already taken.
pub fn append_iteration(paths: &RunPaths, record: &IterationRecord) -> Result<()> {
    let path = paths.iteration_path(record.number);
    if path.exists() {
        return Err(anyhow!(
            "iteration {} already recorded at {}",
            record.number,
            path.display()
        ));
    }
    debug!(number = record.number, "appending iteration");
    write_json_atomic(&path, record)
}

/// Update an existing iteration record in place. Fails if it was never
/// appended.
pub fn update_iteration(paths: &RunPaths, record: &IterationRecord) -> Result<()> {
    let path = paths.iteration_path(record.number);
    if !path.exists() {
        return Err(anyhow!(
            "iteration {} not found at {}",
            record.number,
            path.display()
        ));
    }
    debug!(number = record.number, status = ?record.status, "updating iteration");
    write_json_atomic(&path, record)
}

/// Load one iteration record, `None` if it does not exist.
pub fn load_iteration(
    paths: &RunPaths,
    number: u32,
) -> Result<Option<IterationRecord>> {
    let path = paths.iteration_path(number);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(load_json(&path)?))
}

/// All iteration records, ordered descending by number.
pub fn list_iterations_desc(paths: &RunPaths) -> Result<Vec<IterationRecord>> {
    let dir = &paths.iterations_dir;
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read dir entry in {}", dir.display()))?;
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let record: IterationRecord = load_json(&path)?;
        records.push(record);
    }
    records.sort_by(|a, b| b.number.cmp(&a.number));
    Ok(records)
}

/// Most recent iteration by number, if any.
pub fn latest_iteration(paths: &RunPaths) -> Result<Option<IterationRecord>> {
    Ok(list_iterations_desc(paths)?.into_iter().next())
}

/// Next monotonic iteration number (1 for a fresh run).
pub fn next_iteration_number(paths: &RunPaths) -> Result<u32> {
    Ok(latest_iteration(paths)?.map_or(1, |it| it.number + 1))
}
