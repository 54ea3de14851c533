//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Shelfport configuration file.

use crate::config::{load_config, LookupBackend, StorageBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("Configuration validation failed");
            println!("   Error: {e}");
            return Ok(2);
        }

        println!("Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Entity Kind: {}", config.job.entity_kind);
        println!("  Identifier Type: {}", config.job.identifier_type);
        println!("  Chunk Size: {}", config.job.chunk_size);
        println!("  Skip Limit: {}", config.job.skip_limit);
        println!("  Segments: {}", config.job.segments);
        let formats: Vec<&str> = config.job.formats.iter().map(|f| f.extension()).collect();
        println!("  Formats: {}", formats.join(", "));

        match config.lookup.backend {
            LookupBackend::Http => {
                println!("  Lookup: {}", config.lookup.base_url);
                if let Some(tenant) = &config.lookup.tenant {
                    println!("  Tenant: {tenant}");
                }
            }
            LookupBackend::Memory => {
                println!(
                    "  Lookup: fixtures {}",
                    config.lookup.fixtures_path.as_deref().unwrap_or("-")
                );
            }
        }

        match config.storage.backend {
            StorageBackend::Local => println!("  Storage: local {}", config.storage.root),
            StorageBackend::S3 => println!(
                "  Storage: s3 {}",
                config.storage.bucket.as_deref().unwrap_or("-")
            ),
        }
        println!("  Object Prefix: {}", config.storage.prefix);

        let fields = config.transform.fields_for(config.job.entity_kind);
        println!("  Columns: {}", fields.len());
        println!("  Filters: {}", config.transform.filters.len());

        Ok(0)
    }
}
