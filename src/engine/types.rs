//! Engine types
//!
//! Run configuration, the accumulated result set, and run statistics.

use crate::decode::Page;
use crate::output::ParquetWriterConfig;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Column carrying the page's completion flag
pub const LOAD_COMPLETED_COLUMN: &str = "isLoadCompleted";

/// Column carrying the run timestamp
pub const EXTRACT_TIMESTAMP_COLUMN: &str = "EXTRACT_TIMESTAMP";

/// Format of [`EXTRACT_TIMESTAMP_COLUMN`] values
pub const EXTRACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// Configuration for one extraction run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Extraction name, used in log lines and the summary
    pub name: String,
    /// Object key of the Parquet output (already rendered)
    pub data_key: String,
    /// Parquet encoding settings
    pub parquet: ParquetWriterConfig,
    /// Run start, source of every row's extract timestamp
    pub started_at: DateTime<Utc>,
}

impl EngineConfig {
    /// Create a config starting now
    pub fn new(name: impl Into<String>, data_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_key: data_key.into(),
            parquet: ParquetWriterConfig::default(),
            started_at: Utc::now(),
        }
    }

    /// Set the run start time
    #[must_use]
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Set Parquet encoding settings
    #[must_use]
    pub fn with_parquet(mut self, parquet: ParquetWriterConfig) -> Self {
        self.parquet = parquet;
        self
    }

    /// The run timestamp as written into every row
    pub fn extract_timestamp(&self) -> String {
        self.started_at.format(EXTRACT_TIMESTAMP_FORMAT).to_string()
    }
}

/// All rows of one run, in fetch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    rows: Vec<JsonObject>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page's records, tagging each row
    ///
    /// A record that already has a tag column keeps its position but takes
    /// the tag value.
    pub fn append_page(&mut self, page: Page, extract_timestamp: &str) {
        let complete = page.is_load_complete;
        self.rows.extend(page.records.into_iter().map(|mut row| {
            row.insert(LOAD_COMPLETED_COLUMN.to_string(), JsonValue::Bool(complete));
            row.insert(
                EXTRACT_TIMESTAMP_COLUMN.to_string(),
                JsonValue::String(extract_timestamp.to_string()),
            );
            row
        }));
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were collected
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow the rows
    pub fn rows(&self) -> &[JsonObject] {
        &self.rows
    }
}

/// Statistics from an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Pages decoded, including the terminal page
    pub pages_fetched: usize,
    /// Non-terminal pages that carried no rows
    pub empty_pages: usize,
    /// Credential renewals after a `401`
    pub reauthentications: usize,
    /// Rows accumulated
    pub rows: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl EngineStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add an empty non-terminal page
    pub fn add_empty_page(&mut self) {
        self.empty_pages += 1;
    }

    /// Add a re-authentication
    pub fn add_reauthentication(&mut self) {
        self.reauthentications += 1;
    }

    /// Add rows
    pub fn add_rows(&mut self, count: usize) {
        self.rows += count;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Extraction name
    pub name: String,
    /// Rows written
    pub rows: usize,
    /// Where the Parquet file went; `None` when there was nothing to write
    pub location: Option<String>,
    /// Run timestamp stamped into every row
    pub extract_timestamp: String,
    /// Run statistics
    pub stats: EngineStats,
}
