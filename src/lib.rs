// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # hrms-extract
//!
//! Extracts a full snapshot from a token-protected, server-paginated HRMS
//! API and writes it as a single Parquet file to object storage.
//!
//! ## Features
//!
//! - **Token Auth**: Basic-authenticated token endpoint, bearer token on data calls
//! - **Reactive Renewal**: one re-authentication per page on `401`, then a typed failure
//! - **Server-side Pagination**: repeat the same request until an empty complete page
//! - **Arrow Output**: rows become one Arrow RecordBatch, encoded as Parquet
//! - **Object Storage**: S3, R2, GCS, Azure or local, plus an uploaded run log
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hrms_extract::config::load_config;
//! use hrms_extract::engine::ExtractEngine;
//! use hrms_extract::output::CloudDestination;
//! use hrms_extract::runlog::RunLog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hrms_extract::Result<()> {
//!     let config = load_config("config.yaml")?;
//!     let sink = Arc::new(CloudDestination::from_config(&config.storage)?);
//!     let log = Arc::new(RunLog::new());
//!
//!     let mut engine = ExtractEngine::from_config(&config, chrono::Utc::now(), sink, log)?;
//!     let summary = engine.run().await?;
//!     println!("{} rows written to {:?}", summary.rows, summary.location);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ExtractEngine                         │
//! │  authenticate() → fetch_page() ⟲ → collect() → run()         │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────┬─────────────┬───┴─────────┬───────────┬─────────┐
//! │    Auth    │    HTTP     │   Decode    │  Output   │ RunLog  │
//! ├────────────┼─────────────┼─────────────┼───────────┼─────────┤
//! │ Basic      │ POST pages  │ Path lookup │ Arrow     │ Capture │
//! │ Token      │ Timeout     │ Row flatten │ Parquet   │ Upload  │
//! │ Bearer     │ Rate Limit  │ Load flag   │ Object    │         │
//! │            │ Backoff     │             │ store     │         │
//! └────────────┴─────────────┴─────────────┴───────────┴─────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Template interpolation
pub mod template;

/// YAML configuration
pub mod config;

/// Capturing run log
pub mod runlog;

/// Token endpoint client
pub mod auth;

/// HTTP client and paginated data source
pub mod http;

/// Page decoding
pub mod decode;

/// Arrow/Parquet output and object storage
pub mod output;

/// Paginated ingestion loop
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_config, load_config_from_str, ExtractConfig};
pub use engine::{ExtractEngine, RunSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
