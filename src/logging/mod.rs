//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - human-readable console output filtered by level or `RUST_LOG`
//! - optional JSON log files with daily or hourly rotation
//! - a few macros for the pipeline events every job emits
//!
//! # Example
//!
//! ```no_run
//! use shelfport::logging::init_logging;
//! use shelfport::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(job_id = "job-1", "Export started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a committed chunk
///
/// # Example
///
/// ```no_run
/// use shelfport::log_chunk_committed;
///
/// log_chunk_committed!("job-1", 3, 50, 48);
/// ```
#[macro_export]
macro_rules! log_chunk_committed {
    ($job_id:expr, $chunk:expr, $read:expr, $rows:expr) => {
        tracing::debug!(
            job_id = %$job_id,
            chunk = $chunk,
            read = $read,
            rows = $rows,
            "Chunk committed"
        );
    };
}

/// Log an identifier that was dropped from its chunk
///
/// # Example
///
/// ```no_run
/// use shelfport::log_item_skipped;
///
/// log_item_skipped!("job-1", "111", 4, "not_found", "no item with barcode 111");
/// ```
#[macro_export]
macro_rules! log_item_skipped {
    ($job_id:expr, $identifier:expr, $line:expr, $kind:expr, $reason:expr) => {
        tracing::warn!(
            job_id = %$job_id,
            identifier = %$identifier,
            line = $line,
            kind = %$kind,
            reason = %$reason,
            "Skipping identifier"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use shelfport::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
