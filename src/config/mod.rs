//! Configuration management for Shelfport.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Shelfport uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SHELFPORT_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shelfport::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shelfport.toml")?;
//!
//! println!("Exporting {} records", config.job.entity_kind);
//! println!("Lookup service: {}", config.lookup.base_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`JobConfig`] - Entity kind, identifier type, chunking, formats, segments
//! - [`InputSchema`] - Layout of uploaded identifier files
//! - [`LookupConfig`] - Lookup collaborator, credentials and retry policy
//! - [`StorageConfig`] - Local or S3 object storage and staging
//! - [`NotificationConfig`] - Outcome notifiers
//! - [`TransformConfig`] - Column declarations and filter rules
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [job]
//! entity_kind = "item"
//! identifier_type = "barcode"
//! chunk_size = 100
//! formats = ["csv", "json"]
//!
//! [lookup]
//! base_url = "https://okapi.example.org"
//! tenant = "diku"
//! username = "${SHELFPORT_LOOKUP_USER}"
//! password = "${SHELFPORT_LOOKUP_PASSWORD}"
//!
//! [storage]
//! root = "./exports"
//! prefix = "bulk-edit"
//!
//! [[transform.fields]]
//! header = "Barcode"
//! path = "barcode"
//! ```
//!
//! [`InputSchema`]: crate::core::source::InputSchema

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config, parse_formats};
pub use schema::{
    ApplicationConfig, JobConfig, LoggingConfig, LookupBackend, LookupConfig, NotificationConfig,
    ShelfportConfig, StorageBackend, StorageConfig, TransformConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
