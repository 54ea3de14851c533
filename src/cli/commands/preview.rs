//! Preview command implementation
//!
//! Prints the header and first rows of a job's published CSV output.

use crate::config::load_config;
use crate::core::export::build_storage;
use crate::core::preview::preview;
use crate::core::transform::OutputFormat;
use crate::core::writer::ObjectNaming;
use crate::domain::JobId;
use clap::Args;

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Job whose output to show
    #[arg(long)]
    pub job_id: String,

    /// Output format to read (only csv can be previewed)
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Maximum number of data rows
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

impl PreviewArgs {
    /// Execute the preview command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let format: OutputFormat = match self.format.parse() {
            Ok(OutputFormat::Csv) => OutputFormat::Csv,
            Ok(other) => {
                eprintln!("Preview is only available for csv output, not {other}");
                return Ok(2);
            }
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let job_id = match JobId::new(self.job_id.clone()) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid job id: {e}");
                return Ok(2);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let storage = match build_storage(&config.storage).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open object storage");
                eprintln!("Failed to open object storage: {e}");
                return Ok(4);
            }
        };

        let key = ObjectNaming::new(config.storage.prefix.clone()).final_key(&job_id, format);
        tracing::debug!(key = %key, limit = self.limit, "Reading preview");

        let preview = match preview(storage.as_ref(), &key, self.limit).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to read {key}: {e}");
                return Ok(5);
            }
        };

        println!("{}", preview.headers.join(" | "));
        for row in &preview.rows {
            println!("{}", row.join(" | "));
        }
        println!();
        println!("({} row(s) shown)", preview.rows.len());

        Ok(0)
    }
}
