//! Persistence layer.
//!
//! Saves and loads the runner's task record to/from a JSON file. Hosts
//! embedding the step as a library bring their own storage.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::TaskRecord;

/// Save a task record to a JSON file.
pub fn save_record(record: &TaskRecord, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("Failed to serialise task record")?;

    std::fs::write(path, &json).context(format!("Failed to write state to {path}"))?;

    debug!(path, task = %record.name, prev_price = record.data.prev_price, "State saved");
    Ok(())
}

/// Load a task record from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_record(path: &str) -> Result<Option<TaskRecord>> {
    if !Path::new(path).exists() {
        info!(path, "No saved state found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).context(format!("Failed to read state from {path}"))?;

    let record: TaskRecord =
        serde_json::from_str(&json).context(format!("Failed to parse state from {path}"))?;

    info!(
        path,
        task = %record.name,
        prev_price = record.data.prev_price,
        runs = record.runs,
        "State loaded from disk"
    );

    Ok(Some(record))
}

/// Delete the state file (for testing or reset).
pub fn delete_record(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        std::fs::remove_file(path).context(format!("Failed to delete state file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
