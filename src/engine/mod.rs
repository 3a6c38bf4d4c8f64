//! Execution engine module
//!
//! The paginated ingestion loop.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ExtractEngine` - authenticates, pages through the data endpoint until
//!   the provider reports an empty complete page, and hands the result to a
//!   sink exactly once
//! - `EngineConfig` - per-run settings (output key, Parquet encoding, start time)
//! - `ResultSet`, `RunSummary` and `EngineStats`
//!
//! The engine owns the single live [`Credential`]. It is passed by value into
//! each fetch and the possibly renewed credential is handed back; a `401`
//! triggers at most one renewal per page.

mod types;

pub use types::{
    EngineConfig, EngineStats, ResultSet, RunSummary, EXTRACT_TIMESTAMP_COLUMN,
    EXTRACT_TIMESTAMP_FORMAT, LOAD_COMPLETED_COLUMN,
};

use crate::auth::{Credential, HttpTokenProvider, TokenProvider, TokenRequest};
use crate::config::ExtractConfig;
use crate::decode::{Page, PageDecoder};
use crate::error::{Error, Result};
use crate::http::{DataRequest, Fetched, HttpClient, HttpClientConfig, HttpPageSource, PageSource};
use crate::output::{batch_to_parquet_bytes, json_to_arrow, ParquetWriterConfig, Sink};
use crate::runlog::LogSink;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Extraction engine for one run
pub struct ExtractEngine {
    /// Token endpoint
    tokens: Arc<dyn TokenProvider>,
    /// Data endpoint
    source: Arc<dyn PageSource>,
    /// Output destination
    sink: Arc<dyn Sink>,
    /// Run log
    log: Arc<dyn LogSink>,
    /// Run configuration
    config: EngineConfig,
    /// Statistics
    stats: EngineStats,
}

impl ExtractEngine {
    /// Create a new engine
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        source: Arc<dyn PageSource>,
        sink: Arc<dyn Sink>,
        log: Arc<dyn LogSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tokens,
            source,
            sink,
            log,
            config,
            stats: EngineStats::default(),
        }
    }

    /// Wire the HTTP token provider and page source described by `config`
    pub fn from_config(
        config: &ExtractConfig,
        started_at: DateTime<Utc>,
        sink: Arc<dyn Sink>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let client = HttpClient::with_config(HttpClientConfig::from(&config.http))?;

        let tokens = HttpTokenProvider::new(TokenRequest::from_config(&config.token)?, client.clone());
        let source = HttpPageSource::new(
            DataRequest::from_config(&config.api),
            PageDecoder::from_config(&config.api),
            client,
        );

        let keys = config.object_keys(started_at)?;
        let mut parquet = ParquetWriterConfig::new().with_codec(config.storage.compression);
        if let Some(size) = config.storage.row_group_size {
            parquet = parquet.with_row_group_size(size);
        }
        let engine_config = EngineConfig::new(&config.name, keys.data)
            .with_started_at(started_at)
            .with_parquet(parquet);

        Ok(Self::new(
            Arc::new(tokens),
            Arc::new(source),
            sink,
            log,
            engine_config,
        ))
    }

    /// Get the run configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Obtain a credential from the token provider
    ///
    /// One attempt; no retries at this layer.
    pub async fn authenticate(&self) -> Result<Credential> {
        match self.tokens.authenticate().await {
            Ok(credential) => {
                self.log.info("Token obtained successfully");
                Ok(credential)
            }
            Err(e) => {
                self.log
                    .error(&format!("Access token could not be retrieved: {e}"));
                Err(e)
            }
        }
    }

    /// Fetch one page, renewing the credential once on `401`
    ///
    /// Returns the page with the credential that fetched it. A second `401`
    /// on the same page, or a failed renewal, is [`Error::Auth`].
    pub async fn fetch_page(&mut self, credential: Credential) -> Result<(Page, Credential)> {
        if let Fetched::Page(page) = self.source.fetch(&credential).await? {
            return Ok((page, credential));
        }

        self.log.warn("Token expired, refreshing...");
        drop(credential);

        let fresh = self.tokens.authenticate().await.map_err(|e| {
            let message = format!("Failed to refresh access token after expiration: {e}");
            self.log.error(&message);
            match e {
                Error::Auth { .. } => e,
                _ => Error::auth(message),
            }
        })?;
        self.stats.add_reauthentication();
        self.log.info("Token refreshed successfully");

        match self.source.fetch(&fresh).await? {
            Fetched::Page(page) => Ok((page, fresh)),
            Fetched::Unauthorized => {
                let message = "Data endpoint rejected a freshly issued token";
                self.log.error(message);
                Err(Error::auth(message))
            }
        }
    }

    /// Page through the data endpoint until the provider is exhausted
    ///
    /// Stops on a page that is complete and empty. A complete page that
    /// still carries rows is kept and followed by one more fetch; an empty
    /// page that is not complete is skipped.
    pub async fn collect(&mut self) -> Result<ResultSet> {
        let start = Instant::now();
        let timestamp = self.config.extract_timestamp();
        let mut results = ResultSet::new();

        let mut credential = self.authenticate().await?;

        loop {
            let (page, live) = self.fetch_page(credential).await?;
            credential = live;
            self.stats.add_page();

            let count = page.len();
            self.log.info(&format!(
                "Page {}: {count} records, isLoadComplete={}",
                self.stats.pages_fetched, page.is_load_complete
            ));

            if page.is_terminal() {
                self.log
                    .info("Data load complete and no more data available");
                break;
            }

            if page.is_empty() {
                self.stats.add_empty_page();
                self.log.warn("No data returned in this response");
                continue;
            }

            results.append_page(page, &timestamp);
            self.stats.add_rows(count);
        }

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        Ok(results)
    }

    /// Collect every page and write the result to the sink
    ///
    /// The sink is called once with all rows, or not at all when the run
    /// collected nothing. A failure anywhere leaves the sink untouched.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        let timestamp = self.config.extract_timestamp();
        self.log.info(&format!(
            "{} extraction started at {timestamp}",
            self.config.name
        ));

        let outcome = self.collect_and_write().await;

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        match outcome {
            Ok(location) => {
                self.log.info("Data extraction completed successfully");
                Ok(RunSummary {
                    name: self.config.name.clone(),
                    rows: self.stats.rows,
                    location,
                    extract_timestamp: timestamp,
                    stats: self.stats.clone(),
                })
            }
            Err(e) => {
                self.log.error(&format!("Data extraction failed: {e}"));
                Err(e)
            }
        }
    }

    async fn collect_and_write(&mut self) -> Result<Option<String>> {
        let results = self.collect().await?;

        if results.is_empty() {
            self.log.warn("No data to save");
            return Ok(None);
        }

        self.log
            .info(&format!("API returned {} records", results.len()));

        let batch = json_to_arrow(results.rows(), None)?;
        let data = batch_to_parquet_bytes(&batch, &self.config.parquet)?;
        let location = self.sink.put(&self.config.data_key, data).await?;

        self.log.info(&format!("Data saved to {location}"));
        Ok(Some(location))
    }
}

impl std::fmt::Debug for ExtractEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractEngine")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
