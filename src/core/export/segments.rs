//! Segment planning and outcome merging for split jobs

use crate::adapters::storage::PublishedObject;
use crate::core::outcome::{JobOutcome, JobStatus};
use crate::domain::{JobId, ShelfportError};
use chrono::Utc;

/// Contiguous record range `[offset, offset + len)` handled by one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRange {
    pub index: usize,
    pub offset: u64,
    pub len: u64,
}

/// Split `total` records into at most `segments` non-empty, disjoint ranges
///
/// Earlier ranges take the remainder, so lengths differ by at most one.
pub fn plan_segments(total: u64, segments: usize) -> Vec<SegmentRange> {
    let count = (segments as u64).min(total).max(1);
    let base = total / count;
    let remainder = total % count;

    let mut ranges = Vec::with_capacity(count as usize);
    let mut offset = 0;
    for index in 0..count {
        let len = base + u64::from(index < remainder);
        ranges.push(SegmentRange {
            index: index as usize,
            offset,
            len,
        });
        offset += len;
    }
    ranges
}

/// Merge per-segment outcomes, given in input order, into one job outcome
///
/// Precedence: any failure (including `errors` raised while composing) marks
/// the job failed, then cancellation, then the merged skip count is checked
/// against `skip_limit`.
pub fn merge_outcomes(
    job_id: &JobId,
    outcomes: Vec<JobOutcome>,
    published: Vec<PublishedObject>,
    mut errors: Vec<String>,
    skip_limit: usize,
) -> JobOutcome {
    let started_at = outcomes
        .iter()
        .map(|o| o.started_at)
        .min()
        .unwrap_or_else(Utc::now);
    let cancelled = outcomes.iter().any(|o| o.status == JobStatus::Cancelled);

    let mut merged = JobOutcome {
        job_id: job_id.clone(),
        status: JobStatus::Completed,
        total_read: 0,
        processed: 0,
        rows_written: 0,
        skipped: 0,
        filtered: 0,
        chunks_committed: 0,
        skip_records: Vec::new(),
        error: None,
        published,
        started_at,
        finished_at: Utc::now(),
    };

    let mut segment_errors = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        merged.total_read += outcome.total_read;
        merged.processed += outcome.processed;
        merged.rows_written += outcome.rows_written;
        merged.filtered += outcome.filtered;
        merged.chunks_committed += outcome.chunks_committed;
        merged.skip_records.extend(outcome.skip_records);
        if let Some(error) = outcome.error {
            segment_errors.push(format!("segment {index}: {error}"));
        }
    }
    segment_errors.append(&mut errors);
    merged.skipped = merged.skip_records.len();

    merged.status = if !segment_errors.is_empty() {
        JobStatus::Failed
    } else if cancelled {
        JobStatus::Cancelled
    } else if merged.skipped > skip_limit {
        segment_errors.push(
            ShelfportError::SkipLimitExceeded {
                limit: skip_limit,
                skipped: merged.skipped,
            }
            .to_string(),
        );
        JobStatus::Failed
    } else if merged.skipped > 0 {
        JobStatus::CompletedWithErrors
    } else {
        JobStatus::Completed
    };

    if !segment_errors.is_empty() {
        merged.error = Some(segment_errors.join("; "));
    }
    merged
}
