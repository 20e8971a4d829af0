//! The JSON metrics-sink file written after a scan, per spec.md §6.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::WriterError;

/// One run's metrics snapshot, written atomically to the configured
/// `metrics` path.
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub start_time: DateTime<Utc>,
    pub lava_version: String,
    pub targets: usize,
    pub severity: String,
    pub checktypes: usize,
    pub exit_code: i32,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    pub excluded_vulnerability_count: usize,
    pub vulnerability_count: usize,
}

/// Write `snapshot` to `path` via a temp-file-then-rename so a reader
/// never observes a partially written file.
pub fn write_atomically(snapshot: &MetricsSnapshot, path: &Path) -> Result<(), WriterError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json).map_err(|source| WriterError::OutputCreate {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| WriterError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}
