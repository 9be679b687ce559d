//! Pipeline run statistics and their persistence seam.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// Lifecycle state of a pipeline run.
///
/// Transitions: pending to running on `run`, running to completed on
/// `finish`, running to failed on `fail`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// Cumulative record of what a pipeline run did.
///
/// Every successful transformation call adds exactly 1 to
/// `transformations_applied`; row and cell deltas accumulate in the
/// counter for that operation kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Rows in the table at extraction time.
    pub total_records: usize,
    /// Rows that passed the most recent validation pass.
    pub valid_records: usize,
    /// Rows that failed the most recent validation pass.
    pub invalid_records: usize,
    pub duplicates_removed: usize,
    pub missing_values_handled: usize,
    pub transformations_applied: usize,
    /// Wall-clock duration in seconds.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: PipelineStatus,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the stats of an independent run into this one: counters and
    /// execution times sum, the time window widens to cover both runs,
    /// and the status becomes the least-settled of the two (a failure
    /// anywhere makes the merged run failed).
    pub fn merge(&mut self, other: &PipelineStats) {
        self.total_records += other.total_records;
        self.valid_records += other.valid_records;
        self.invalid_records += other.invalid_records;
        self.duplicates_removed += other.duplicates_removed;
        self.missing_values_handled += other.missing_values_handled;
        self.transformations_applied += other.transformations_applied;
        self.execution_time += other.execution_time;
        self.start_time = match (self.start_time, other.start_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.end_time = match (self.end_time, other.end_time) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        if status_rank(other.status) > status_rank(self.status) {
            self.status = other.status;
        }
    }
}

fn status_rank(status: PipelineStatus) -> u8 {
    match status {
        PipelineStatus::Completed => 0,
        PipelineStatus::Pending => 1,
        PipelineStatus::Running => 2,
        PipelineStatus::Failed => 3,
    }
}

/// Where pipeline statistics go when persisted. Failures are reported to
/// the caller without touching the in-memory stats.
pub trait StatsSink {
    fn persist(&self, stats: &PipelineStats, destination: &Path) -> Result<()>;
}

/// Default sink: a pretty-printed JSON document, creating parent
/// directories as needed.
#[derive(Debug, Clone, Default)]
pub struct JsonStatsSink;

impl JsonStatsSink {
    pub fn new() -> Self {
        Self
    }
}

impl StatsSink for JsonStatsSink {
    fn persist(&self, stats: &PipelineStats, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    EtlError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(destination).map_err(|e| {
            EtlError::Persistence(format!(
                "Failed to create file '{}': {}",
                destination.display(),
                e
            ))
        })?;

        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, stats).map_err(|e| {
            EtlError::Persistence(format!("Failed to serialize stats: {}", e))
        })?;

        Ok(())
    }
}
