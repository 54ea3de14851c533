//! Job outcome reporting
//!
//! A [`JobOutcome`] is built exactly once per run by [`summarize`] and handed
//! to the configured notifiers.

use crate::adapters::storage::PublishedObject;
use crate::core::runner::RunnerState;
use crate::domain::{JobId, SkipRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Every identifier produced output or was filtered
    Completed,
    /// The source was exhausted with some identifiers skipped
    CompletedWithErrors,
    /// A fatal error or the skip limit stopped the job
    Failed,
    /// A shutdown request stopped the job between chunks
    Cancelled,
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithErrors)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "COMPLETED",
            Self::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// How the runner loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The identifier source ran dry
    Exhausted,
    /// Shutdown was requested
    Cancelled,
    /// The job failed with this message
    Failed(String),
}

/// Summary of one export job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub status: JobStatus,

    /// Identifiers read from the source
    pub total_read: u64,

    /// Identifiers that reached a per-item result (row, filtered or skipped)
    pub processed: u64,

    pub rows_written: u64,
    pub skipped: usize,

    /// Entities dropped by the filter predicate
    pub filtered: u64,

    pub chunks_committed: u64,
    pub skip_records: Vec<SkipRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub published: Vec<PublishedObject>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    /// Log the outcome
    pub fn log_summary(&self) {
        let duration_ms = (self.finished_at - self.started_at).num_milliseconds();
        if self.status.is_success() {
            tracing::info!(
                job_id = %self.job_id,
                status = %self.status,
                total_read = self.total_read,
                rows_written = self.rows_written,
                skipped = self.skipped,
                filtered = self.filtered,
                chunks = self.chunks_committed,
                duration_ms,
                "Export finished"
            );
        } else {
            tracing::warn!(
                job_id = %self.job_id,
                status = %self.status,
                total_read = self.total_read,
                rows_written = self.rows_written,
                skipped = self.skipped,
                error = self.error.as_deref().unwrap_or(""),
                duration_ms,
                "Export did not complete"
            );
        }
        for object in &self.published {
            tracing::info!(
                job_id = %self.job_id,
                key = %object.key,
                format = %object.format,
                size = object.size,
                sha256 = %object.sha256,
                "Published object"
            );
        }
    }
}

/// Aggregate runner state into an outcome
pub fn summarize(state: &RunnerState, termination: Termination) -> JobOutcome {
    let (status, error) = match termination {
        Termination::Exhausted if state.skip_records.is_empty() => (JobStatus::Completed, None),
        Termination::Exhausted => (JobStatus::CompletedWithErrors, None),
        Termination::Cancelled => (JobStatus::Cancelled, None),
        Termination::Failed(message) => (JobStatus::Failed, Some(message)),
    };

    JobOutcome {
        job_id: state.job_id.clone(),
        status,
        total_read: state.total_read,
        processed: state.processed,
        rows_written: state.rows_written,
        skipped: state.skip_records.len(),
        filtered: state.filtered,
        chunks_committed: state.chunks_committed,
        skip_records: state.skip_records.clone(),
        error,
        published: state.published.clone(),
        started_at: state.started_at,
        finished_at: Utc::now(),
    }
}
