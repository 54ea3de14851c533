// Shelfport - Bulk record export by identifier list
// Copyright (c) 2025 Shelfport Contributors
// Licensed under the MIT License

//! # Shelfport - Bulk Record Export
//!
//! Shelfport takes an uploaded file of record identifiers (barcodes, HRIDs,
//! user names, PO numbers, ...), resolves each one against a library services
//! platform, projects the matching records onto a declared set of columns and
//! publishes the result to object storage as CSV and newline-delimited JSON.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Reading** identifier files with a configurable layout
//! - **Resolving** identifiers in chunks through a lookup collaborator, with
//!   retries for transient failures
//! - **Transforming** resolved records into rows, with optional filters
//! - **Writing** every output format in lockstep, one chunk at a time
//! - **Reporting** skipped identifiers and the job outcome
//!
//! ## Architecture
//!
//! Shelfport follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (source, resolve, transform, writer, runner)
//! - [`adapters`] - External integrations (lookup service, object storage, notifiers)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelfport::config::load_config;
//! use shelfport::core::export::ExportCoordinator;
//! use shelfport::domain::JobId;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("shelfport.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//!     let outcome = coordinator
//!         .execute(JobId::generate(), Path::new("barcodes.csv"))
//!         .await?;
//!
//!     println!("{}: {} rows, {} skipped", outcome.status, outcome.rows_written, outcome.skipped);
//!     Ok(())
//! }
//! ```
//!
//! ## Fault Tolerance
//!
//! Identifiers that cannot be resolved (no match, an ambiguous match, a missing
//! column value) are skipped and collected into a skip report instead of
//! failing the job, up to `job.skip_limit`. Failures of the lookup service
//! itself are retried according to `lookup.retry` and then end the job.
//!
//! A chunk is committed to every output format or to none. When a job fails,
//! everything committed before the failing chunk stays in the staged output.
//!
//! ## Error Handling
//!
//! Shelfport uses the [`domain::ShelfportError`] type for all errors:
//!
//! ```rust,no_run
//! use shelfport::domain::ShelfportError;
//!
//! fn example() -> Result<(), ShelfportError> {
//!     let config = shelfport::config::load_config("shelfport.toml")?;
//!     println!("Exporting {}", config.job.entity_kind);
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Shelfport uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(job_id = "job-1", "Starting export job");
//! warn!(job_id = "job-1", identifier = "31234000012345", "Skipping identifier");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
