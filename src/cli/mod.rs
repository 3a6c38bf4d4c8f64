//! CLI module
//!
//! Command-line interface for running extractions.
//!
//! # Commands
//!
//! - `run` - Extract all pages and write Parquet plus the run log
//! - `check` - Request a token to test the credentials
//! - `validate` - Load and validate the configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{upload_run_log, Runner};
