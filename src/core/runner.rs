//! Fault-tolerant chunk runner
//!
//! Drives a job: reads identifiers in chunks of `chunk_size`, resolves and
//! transforms each one, and commits the surviving rows of a chunk through one
//! [`ChunkSink::append_chunk`] call.
//!
//! Failure handling:
//! - a skippable item failure drops that identifier and records a
//!   [`SkipRecord`]; the rest of the chunk carries on
//! - once more than `skip_limit` identifiers were skipped, the current chunk
//!   is discarded and the job fails; runners of one segmented job draw on a
//!   shared [`SkipBudget`]
//! - any fatal error discards the current chunk and fails the job without
//!   using skip budget
//!
//! The sink is finalized exactly once whatever the termination, so chunks
//! committed before a failure are still published.

use crate::adapters::storage::PublishedObject;
use crate::core::outcome::{summarize, JobOutcome, Termination};
use crate::core::resolve::Resolver;
use crate::core::transform::TransformStage;
use crate::core::writer::ChunkSink;
use crate::domain::{
    ExportRow, IdentifierRecord, JobId, Result, ShelfportError, SkipReason, SkipRecord, Step,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Chunking and fault-tolerance settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Identifiers per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Skips tolerated before the job fails
    #[serde(default = "default_skip_limit")]
    pub skip_limit: usize,

    /// Warm the resolver with one batch lookup per chunk
    #[serde(default)]
    pub prefetch: bool,
}

impl ChunkConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.chunk_size == 0 || self.chunk_size > 10_000 {
            return Err(format!(
                "job.chunk_size must be between 1 and 10000, got {}",
                self.chunk_size
            ));
        }
        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            skip_limit: default_skip_limit(),
            prefetch: false,
        }
    }
}

fn default_chunk_size() -> usize {
    100
}

fn default_skip_limit() -> usize {
    1_000_000
}

/// Where the runner currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Reading,
    Resolving,
    Transforming,
    Committing,
    Skipping,
    Failed,
    Completed,
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Counters and skip records owned by one run
#[derive(Debug, Clone)]
pub struct RunnerState {
    pub job_id: JobId,
    pub phase: Phase,
    pub total_read: u64,
    pub processed: u64,
    pub rows_written: u64,
    pub filtered: u64,
    pub chunks_committed: u64,
    pub skip_records: Vec<SkipRecord>,
    pub published: Vec<PublishedObject>,
    pub started_at: DateTime<Utc>,
}

impl RunnerState {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            phase: Phase::Idle,
            total_read: 0,
            processed: 0,
            rows_written: 0,
            filtered: 0,
            chunks_committed: 0,
            skip_records: Vec::new(),
            published: Vec::new(),
            started_at: Utc::now(),
        }
    }
}

/// Skip allowance of one job, shared by the runners of its segments
///
/// Segments are numbered in input order. Once a chunk of segment `k` takes
/// the count past the limit, segments after `k` stop before their next chunk;
/// their work comes after the failing chunk in input order. Segments before
/// `k` run to the end of their range.
#[derive(Debug)]
pub struct SkipBudget {
    limit: usize,
    used: AtomicUsize,
    exceeded_in: AtomicUsize,
}

impl SkipBudget {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            used: AtomicUsize::new(0),
            exceeded_in: AtomicUsize::new(usize::MAX),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Skips recorded so far by every runner
    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Lowest segment whose chunk exceeded the limit
    pub fn exceeded_in(&self) -> Option<usize> {
        match self.exceeded_in.load(Ordering::SeqCst) {
            usize::MAX => None,
            segment => Some(segment),
        }
    }

    /// Count one skip in `segment`; `true` once the limit is exceeded
    fn record(&self, segment: usize) -> bool {
        let used = self.used.fetch_add(1, Ordering::SeqCst) + 1;
        if used > self.limit {
            self.exceeded_in.fetch_min(segment, Ordering::SeqCst);
            return true;
        }
        false
    }

    fn stops(&self, segment: usize) -> bool {
        self.exceeded_in().is_some_and(|exceeded| segment > exceeded)
    }
}

/// Result of processing one chunk
enum ChunkResult {
    Committed,
    Empty,
    SkipLimitExceeded,
    Fatal(ShelfportError),
}

/// Per-chunk accumulator; merged into the state only on commit
#[derive(Default)]
struct ChunkBuffer {
    rows: Vec<ExportRow>,
    filtered: u64,
    completed: u64,
}

/// Runs one job (or one segment of a job)
pub struct ChunkRunner {
    job_id: JobId,
    config: ChunkConfig,
    resolver: Arc<dyn Resolver>,
    transform: TransformStage,
    writer: Box<dyn ChunkSink>,
    shutdown: Option<watch::Receiver<bool>>,
    budget: Arc<SkipBudget>,
    segment: usize,
}

impl ChunkRunner {
    pub fn new(
        job_id: JobId,
        config: ChunkConfig,
        resolver: Arc<dyn Resolver>,
        transform: TransformStage,
        writer: Box<dyn ChunkSink>,
    ) -> Self {
        let budget = SkipBudget::new(config.skip_limit);
        Self {
            job_id,
            config,
            resolver,
            transform,
            writer,
            shutdown: None,
            budget,
            segment: 0,
        }
    }

    /// Count skips against `budget` as segment `segment` of a split job
    pub fn with_skip_budget(mut self, budget: Arc<SkipBudget>, segment: usize) -> Self {
        self.budget = budget;
        self.segment = segment;
        self
    }

    /// Stop between chunks once `shutdown` turns `true`
    pub fn with_cancellation(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Run the job to completion; never returns an error
    pub async fn run<I>(mut self, mut source: I) -> JobOutcome
    where
        I: Iterator<Item = Result<IdentifierRecord>>,
    {
        let mut state = RunnerState::new(self.job_id.clone());
        let chunk_size = self.config.chunk_size.max(1);

        tracing::info!(
            job_id = %self.job_id,
            chunk_size,
            skip_limit = self.config.skip_limit,
            prefetch = self.config.prefetch,
            "Starting chunked export"
        );

        let mut chunk_index = 0u64;
        let termination = loop {
            if self.is_cancelled() {
                tracing::info!(
                    job_id = %self.job_id,
                    "Shutdown requested, stopping before next chunk"
                );
                break Termination::Cancelled;
            }
            if self.budget.stops(self.segment) {
                tracing::info!(
                    job_id = %self.job_id,
                    segment = self.segment,
                    "Skip limit exceeded in an earlier segment, stopping before next chunk"
                );
                break Termination::Failed(format!(
                    "stopped: skip limit of {} exceeded in an earlier segment",
                    self.budget.limit()
                ));
            }

            state.phase = Phase::Reading;
            let mut chunk = Vec::with_capacity(chunk_size);
            let mut exhausted = false;
            let mut source_error = None;
            while chunk.len() < chunk_size {
                match source.next() {
                    Some(Ok(record)) => chunk.push(record),
                    Some(Err(e)) => {
                        source_error = Some(e);
                        break;
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            state.total_read += chunk.len() as u64;

            if let Some(e) = source_error {
                break Termination::Failed(e.to_string());
            }
            if chunk.is_empty() {
                break Termination::Exhausted;
            }

            chunk_index += 1;
            match self.process_chunk(&chunk, &mut state).await {
                ChunkResult::Committed => {
                    crate::log_chunk_committed!(
                        self.job_id,
                        chunk_index,
                        chunk.len(),
                        state.rows_written
                    );
                }
                ChunkResult::Empty => {
                    tracing::debug!(
                        job_id = %self.job_id,
                        chunk = chunk_index,
                        "Chunk produced no rows"
                    );
                }
                ChunkResult::SkipLimitExceeded => {
                    let error = ShelfportError::SkipLimitExceeded {
                        limit: self.budget.limit(),
                        skipped: self.budget.used(),
                    };
                    break Termination::Failed(error.to_string());
                }
                ChunkResult::Fatal(e) => {
                    tracing::error!(
                        job_id = %self.job_id,
                        chunk = chunk_index,
                        error = %e,
                        "Fatal error, discarding current chunk"
                    );
                    break Termination::Failed(e.to_string());
                }
            }
            state.phase = Phase::Idle;

            if exhausted {
                break Termination::Exhausted;
            }
        };

        let termination = self.finish(&mut state, termination).await;
        state.phase = match termination {
            Termination::Exhausted => Phase::Completed,
            Termination::Cancelled => Phase::Cancelled,
            Termination::Failed(_) => Phase::Failed,
        };

        let outcome = summarize(&state, termination);
        tracing::debug!(
            job_id = %self.job_id,
            status = %outcome.status,
            rows = outcome.rows_written,
            skipped = outcome.skipped,
            "Runner finished"
        );
        outcome
    }

    async fn process_chunk(
        &mut self,
        chunk: &[IdentifierRecord],
        state: &mut RunnerState,
    ) -> ChunkResult {
        if self.config.prefetch {
            state.phase = Phase::Resolving;
            self.resolver.prefetch(chunk).await;
        }

        let mut buffer = ChunkBuffer::default();
        'items: for record in chunk {
            state.phase = Phase::Resolving;
            let entities = match self.resolver.resolve(record).await {
                Step::Ok(entities) => entities,
                Step::Skip(reason) => {
                    if self.skip(state, record, reason) {
                        return ChunkResult::SkipLimitExceeded;
                    }
                    continue;
                }
                Step::Fatal(e) => return ChunkResult::Fatal(e),
            };

            state.phase = Phase::Transforming;
            let mut rows = Vec::with_capacity(entities.len());
            let mut filtered = 0;
            for entity in &entities {
                match self.transform.transform(entity) {
                    Step::Ok(Some(row)) => rows.push(row),
                    Step::Ok(None) => filtered += 1,
                    Step::Skip(reason) => {
                        if self.skip(state, record, reason) {
                            return ChunkResult::SkipLimitExceeded;
                        }
                        continue 'items;
                    }
                    Step::Fatal(e) => return ChunkResult::Fatal(e),
                }
            }

            buffer.rows.extend(rows);
            buffer.filtered += filtered;
            buffer.completed += 1;
        }

        state.filtered += buffer.filtered;
        state.processed += buffer.completed;
        if buffer.rows.is_empty() {
            return ChunkResult::Empty;
        }

        state.phase = Phase::Committing;
        match self.writer.append_chunk(&buffer.rows).await {
            Ok(()) => {
                state.rows_written += buffer.rows.len() as u64;
                state.chunks_committed += 1;
                ChunkResult::Committed
            }
            Err(e) => ChunkResult::Fatal(e),
        }
    }

    /// Record a skip; returns `true` once the skip limit is exceeded
    fn skip(
        &self,
        state: &mut RunnerState,
        record: &IdentifierRecord,
        reason: SkipReason,
    ) -> bool {
        state.phase = Phase::Skipping;
        crate::log_item_skipped!(
            self.job_id,
            record.value,
            record.line,
            reason.kind,
            reason.message
        );
        state.skip_records.push(SkipRecord::new(record, reason));
        state.processed += 1;
        self.budget.record(self.segment)
    }

    async fn finish(&mut self, state: &mut RunnerState, termination: Termination) -> Termination {
        let mut failures = Vec::new();

        match self.writer.finalize().await {
            Ok(published) => state.published.extend(published),
            Err(e) => failures.push(format!("finalize failed: {e}")),
        }

        if !state.skip_records.is_empty() {
            match self.writer.publish_errors(&state.skip_records).await {
                Ok(Some(report)) => state.published.push(report),
                Ok(None) => {}
                Err(e) => failures.push(format!("skip report failed: {e}")),
            }
        }

        if failures.is_empty() {
            return termination;
        }

        let detail = failures.join("; ");
        tracing::error!(job_id = %self.job_id, error = %detail, "Failed to finalize outputs");
        match termination {
            Termination::Failed(message) => Termination::Failed(format!("{message}; {detail}")),
            _ => Termination::Failed(detail),
        }
    }
}
