//! Export command implementation
//!
//! This module implements the `export` command, which runs one job over an
//! uploaded identifier file.

use crate::config::{load_config, parse_formats, ShelfportConfig};
use crate::core::export::ExportCoordinator;
use crate::core::outcome::{JobOutcome, JobStatus};
use crate::domain::{EntityKind, IdentifierType, JobId, ShelfportError};
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Identifier file to export
    #[arg(short, long)]
    pub input: PathBuf,

    /// Job identifier (a UUID is generated when omitted)
    #[arg(long)]
    pub job_id: Option<String>,

    /// Override entity kind (user, item, holdings, purchase_order)
    #[arg(long)]
    pub kind: Option<EntityKind>,

    /// Override identifier type (barcode, hrid, user_name, ...)
    #[arg(long)]
    pub identifier_type: Option<IdentifierType>,

    /// Override output formats (comma-separated: csv, json)
    #[arg(long)]
    pub formats: Option<String>,

    /// Split the input across this many concurrent runners
    #[arg(long)]
    pub segments: Option<usize>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = self.apply_overrides(&mut config) {
            tracing::error!(error = %e, "Invalid command line override");
            eprintln!("{e}");
            return Ok(2);
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let job_id = match &self.job_id {
            Some(id) => match JobId::new(id.clone()) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("Invalid job id: {e}");
                    return Ok(2);
                }
            },
            None => JobId::generate(),
        };

        let coordinator = match ExportCoordinator::new(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(init_failure_code(&e));
            }
        };

        println!("Starting export {job_id}");
        println!("  Input: {}", self.input.display());
        println!(
            "  Kind: {} by {}",
            coordinator.config().job.entity_kind,
            coordinator.config().job.identifier_type
        );
        println!();

        let outcome = match coordinator.execute(job_id, &self.input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Export could not start");
                eprintln!("Export could not start: {e}");
                return Ok(start_failure_code(&e));
            }
        };

        print_outcome(&outcome);
        Ok(exit_code(outcome.status))
    }

    fn apply_overrides(&self, config: &mut ShelfportConfig) -> Result<(), ShelfportError> {
        if let Some(kind) = self.kind {
            tracing::info!(kind = %kind, "Overriding entity kind from CLI");
            config.job.entity_kind = kind;
        }
        if let Some(identifier_type) = self.identifier_type {
            tracing::info!(
                identifier_type = %identifier_type,
                "Overriding identifier type from CLI"
            );
            config.job.identifier_type = identifier_type;
        }
        if let Some(formats) = &self.formats {
            config.job.formats = parse_formats(formats)?;
        }
        if let Some(segments) = self.segments {
            config.job.segments = segments;
        }
        Ok(())
    }
}

/// Process exit code for a finished job
pub fn exit_code(status: JobStatus) -> i32 {
    match status {
        JobStatus::Completed => 0,
        JobStatus::CompletedWithErrors => 1,
        JobStatus::Failed => 5,
        JobStatus::Cancelled => 130,
    }
}

fn init_failure_code(error: &ShelfportError) -> i32 {
    match error {
        ShelfportError::Configuration(_) => 2,
        _ => 4,
    }
}

fn start_failure_code(error: &ShelfportError) -> i32 {
    match error {
        ShelfportError::MalformedInput { .. } => 3,
        ShelfportError::Configuration(_) => 2,
        _ => 5,
    }
}

fn print_outcome(outcome: &JobOutcome) {
    let duration = (outcome.finished_at - outcome.started_at).num_milliseconds() as f64 / 1000.0;

    println!("Export Summary:");
    println!("  Job: {}", outcome.job_id);
    println!("  Status: {}", outcome.status);
    println!("  Read: {}", outcome.total_read);
    println!("  Rows written: {}", outcome.rows_written);
    println!("  Filtered: {}", outcome.filtered);
    println!("  Skipped: {}", outcome.skipped);
    println!("  Chunks: {}", outcome.chunks_committed);
    println!("  Duration: {duration:.2}s");

    if let Some(error) = &outcome.error {
        println!();
        println!("  Error: {error}");
    }

    if !outcome.skip_records.is_empty() {
        println!();
        println!("  Skipped identifiers:");
        for skip in outcome.skip_records.iter().take(10) {
            println!("    - line {}: {} ({})", skip.line, skip.identifier, skip.reason);
        }
        if outcome.skip_records.len() > 10 {
            println!("    ... and {} more", outcome.skip_records.len() - 10);
        }
    }

    if !outcome.published.is_empty() {
        println!();
        println!("  Published:");
        for object in &outcome.published {
            println!("    - {} ({} bytes)", object.key, object.size);
        }
    }
}
