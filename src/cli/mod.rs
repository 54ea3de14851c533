//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Shelfport using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Shelfport - bulk record export by identifier list
#[derive(Parser, Debug)]
#[command(name = "shelfport")]
#[command(version, about, long_about = None)]
#[command(author = "Shelfport Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "shelfport.toml", env = "SHELFPORT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SHELFPORT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the records named in an identifier file
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the first rows of a published CSV export
    Preview(commands::preview::PreviewArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityKind;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["shelfport", "export", "--input", "barcodes.csv"]);
        assert_eq!(cli.config, "shelfport.toml");
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.input.to_str(), Some("barcodes.csv"));
                assert!(args.job_id.is_none());
                assert!(args.segments.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_export_overrides() {
        let cli = Cli::parse_from([
            "shelfport",
            "export",
            "--input",
            "ids.csv",
            "--job-id",
            "job-7",
            "--kind",
            "holdings",
            "--identifier-type",
            "instance_hrid",
            "--formats",
            "csv,json",
            "--segments",
            "4",
        ]);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.job_id.as_deref(), Some("job-7"));
                assert_eq!(args.kind, Some(EntityKind::Holdings));
                assert_eq!(args.formats.as_deref(), Some("csv,json"));
                assert_eq!(args.segments, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_export_requires_input() {
        assert!(Cli::try_parse_from(["shelfport", "export"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        let result = Cli::try_parse_from([
            "shelfport", "export", "--input", "a.csv", "--kind", "widget",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["shelfport", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["shelfport", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_preview() {
        let cli = Cli::parse_from(["shelfport", "preview", "--job-id", "job-1", "--limit", "5"]);
        match cli.command {
            Commands::Preview(args) => {
                assert_eq!(args.job_id, "job-1");
                assert_eq!(args.limit, 5);
                assert_eq!(args.format, "csv");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["shelfport", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
