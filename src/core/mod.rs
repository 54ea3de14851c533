//! Core business logic for Shelfport.
//!
//! # Modules
//!
//! - [`source`] - Identifier file parsing
//! - [`resolve`] - Identifier-to-entity resolution through a lookup client
//! - [`transform`] - Column projection, filtering and output encodings
//! - [`writer`] - Staged multi-format output and publication
//! - [`runner`] - Chunked, fault-tolerant job execution
//! - [`outcome`] - Job outcome aggregation
//! - [`export`] - Wiring from configuration, whole and segmented jobs
//! - [`preview`] - First rows of a published CSV object
//!
//! # Export Workflow
//!
//! 1. **Read**: pull up to `chunk_size` identifiers from the source
//! 2. **Resolve**: look each identifier up; misses and duplicates are skipped
//! 3. **Transform**: project entities onto the declared columns, dropping
//!    filtered ones
//! 4. **Commit**: append the chunk's rows to every output format at once
//! 5. **Finalize**: publish staged outputs and the skip report
//! 6. **Report**: hand the outcome to the notifiers
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfport::config::load_config;
//! use shelfport::core::export::ExportCoordinator;
//! use shelfport::domain::JobId;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shelfport.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//! let outcome = coordinator
//!     .execute(JobId::generate(), Path::new("barcodes.csv"))
//!     .await?;
//!
//! println!("Status: {}", outcome.status);
//! println!("Rows: {}", outcome.rows_written);
//! println!("Skipped: {}", outcome.skipped);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod outcome;
pub mod preview;
pub mod resolve;
pub mod runner;
pub mod source;
pub mod transform;
pub mod writer;
