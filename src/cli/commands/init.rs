//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "shelfport.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("Initializing Shelfport configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set the lookup service URL and tenant");
                println!("  3. Put credentials in a .env file:");
                println!("     - SHELFPORT_LOOKUP_USERNAME and SHELFPORT_LOOKUP_PASSWORD");
                println!("     - or SHELFPORT_LOOKUP_TOKEN");
                println!("  4. Validate configuration: shelfport validate-config");
                println!("  5. Run an export: shelfport export --input barcodes.csv");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Shelfport Configuration File
# Bulk export of library records by identifier list

[application]
log_level = "info"

[job]
entity_kind = "item"          # user | item | holdings | purchase_order
identifier_type = "barcode"
chunk_size = 100
skip_limit = 1000000
formats = ["csv", "json"]

[input]
delimiter = ","
has_header = false

[lookup]
base_url = "https://okapi.example.org"
tenant = "diku"
timeout_seconds = 30

[storage]
backend = "local"
root = "./exports"
prefix = "exports"
staging_dir = "./staging"

[notification]
log = true
storage = true

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Shelfport Configuration File
#
# Exports the records named in an uploaded identifier file. Identifiers are
# resolved through the lookup service in chunks, projected onto the declared
# columns and published as CSV and/or newline-delimited JSON.
#
# Any value may reference an environment variable as ${NAME}. Every key can
# also be overridden with SHELFPORT_<SECTION>_<KEY>, e.g. SHELFPORT_JOB_CHUNK_SIZE.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Job Settings
# ============================================================================
[job]
# Kind of record to export: user | item | holdings | purchase_order
entity_kind = "item"

# Type of the identifiers in the uploaded file. Supported per kind:
#   user:           id, barcode, user_name, external_system_id
#   item:           id, barcode, hrid, former_ids, accession_number, holdings_record_id
#   holdings:       id, hrid, instance_hrid, item_barcode
#   purchase_order: id, po_number
identifier_type = "barcode"

# Identifiers per chunk (1-10000). A chunk is written all at once or not at all.
chunk_size = 100

# Skipped identifiers tolerated before the job fails
skip_limit = 1000000

# Resolve each chunk with one batch lookup before falling back per identifier
prefetch = false

# Output encodings
formats = ["csv", "json"]

# Split the input across this many concurrent runners (1-64)
segments = 1

# ============================================================================
# Input File Layout
# ============================================================================
[input]
delimiter = ","
has_header = false
columns = ["identifier"]
identifier_column = "identifier"

# ============================================================================
# Lookup Service
# ============================================================================
[lookup]
# http | memory
backend = "http"
base_url = "https://okapi.example.org"
tenant = "diku"

# Basic authentication (set both) or a pre-issued token
# username = "${SHELFPORT_LOOKUP_USERNAME}"
# password = "${SHELFPORT_LOOKUP_PASSWORD}"
# token = "${SHELFPORT_LOOKUP_TOKEN}"

timeout_seconds = 30

# Maximum records requested per query
page_limit = 100

# For backend = "memory": JSON file of entities keyed by lookup collection
# fixtures_path = "./fixtures.json"

[lookup.retry]
max_retries = 3
delay_ms = 500
retry_timeouts = true
retry_unavailable = true

# ============================================================================
# Object Storage
# ============================================================================
[storage]
# local | s3
backend = "local"

# Root directory for the local backend
root = "./exports"

# Key prefix: outputs land at {prefix}/{job_id}/{job_id}.{csv|json}
prefix = "exports"

# Local directory for staged output before publication
staging_dir = "./staging"

# S3-compatible backend (requires the `s3` feature)
# bucket = "shelfport-exports"
# region = "us-east-1"
# endpoint = "http://localhost:9000"
# access_key = "${SHELFPORT_STORAGE_ACCESS_KEY}"
# secret_key = "${SHELFPORT_STORAGE_SECRET_KEY}"
# force_path_style = true

# ============================================================================
# Outcome Notification
# ============================================================================
[notification]
# Log the outcome
log = true

# Write {prefix}/{job_id}/outcome.json
storage = true

# POST the outcome as JSON
# webhook_url = "https://hooks.example.org/shelfport"
webhook_timeout_seconds = 10

# ============================================================================
# Columns and Filters
# ============================================================================
# Without [[transform.fields]] the entity kind's default columns are used.
#
# [[transform.fields]]
# header = "Barcode"
# path = "barcode"
#
# [[transform.fields]]
# header = "Status"
# path = "status.name"
#
# [[transform.fields]]
# header = "Notes"
# path = "notes"
# optional = true
# processor = { type = "join", separator = " | " }
#
# Entities failing any filter are dropped without being counted as skipped.
#
# [[transform.filters]]
# path = "discoverySuppress"
# not_equals = "true"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# JSON log files next to the console output
local_enabled = true
local_path = "./logs"

# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::TempDir;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "shelfport.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "shelfport.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generated_configs_parse() {
        let minimal = parse_config(&InitArgs::generate_minimal_config()).unwrap();
        assert_eq!(minimal.job.chunk_size, 100);

        let full = parse_config(&InitArgs::generate_config_with_examples()).unwrap();
        assert_eq!(full.lookup.retry.max_retries, 3);
        assert_eq!(full.input.identifier_column, "identifier");
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("shelfport.toml");
        std::fs::write(&output, "# existing").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "# existing");

        let forced = InitArgs { force: true, ..args };
        assert_eq!(forced.execute().await.unwrap(), 0);
        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .contains("[job]"));
    }
}
