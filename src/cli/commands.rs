//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HRMS paginated API extractor
#[derive(Parser, Debug)]
#[command(name = "hrms-extract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Extraction configuration file (YAML)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract all pages and write them as one Parquet file
    Run {
        /// Output destination, overriding `storage.destination`
        /// Supports: /path, s3://bucket/path, r2://bucket/path, gs://bucket/path,
        /// az://container/path, memory://
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Request a token to test the credentials
    Check,

    /// Load and validate the configuration
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
