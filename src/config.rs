//! Extraction configuration
//!
//! The extractor is driven by a single YAML file with four sections:
//! `token`, `api`, `http` and `storage`. Secret-bearing fields may use
//! `{{ env.NAME }}` templates which are resolved when the file is loaded.
//! Object keys (`storage.data_key`, `storage.log_key`) keep their
//! `{{ run.* }}` templates until a run starts.

use crate::error::{Error, Result, ResultExt};
use crate::template::{self, TemplateContext};
use crate::types::{BackoffType, CompressionType, JsonValue, OptionStringExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete extraction configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Extraction name, available as `{{ name }}` in object keys
    pub name: String,

    /// Token endpoint configuration
    pub token: TokenConfig,

    /// Paginated data endpoint configuration
    pub api: ApiConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Output destination
    pub storage: StorageConfig,
}

// ============================================================================
// Token Config
// ============================================================================

/// Token endpoint (`POST`, Basic auth, form-encoded payload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token endpoint URL
    pub url: String,

    /// Pre-encoded Basic credentials (the part after `Basic `)
    #[serde(default)]
    pub basic_auth: Option<String>,

    /// Client ID, encoded together with `client_secret` when `basic_auth` is absent
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Form-encoded request body, sent verbatim
    #[serde(default)]
    pub payload: String,

    /// Dotted path of the token in the response
    #[serde(default = "default_token_field")]
    pub token_field: String,
}

fn default_token_field() -> String {
    "access_token".to_string()
}

// ============================================================================
// API Config
// ============================================================================

/// Paginated data endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Data endpoint URL
    pub url: String,

    /// API key sent with every page request
    pub api_key: String,

    /// Header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Request body; strings are sent verbatim, anything else as JSON
    #[serde(default = "default_payload")]
    pub payload: JsonValue,

    /// Dotted path of the record array in each response
    #[serde(default = "default_records_path")]
    pub records_path: String,

    /// Dotted path of the flat row inside each record (`null` = the record itself)
    #[serde(default = "default_row_path")]
    pub row_path: Option<String>,

    /// Top-level completion flag
    #[serde(default = "default_load_complete_field")]
    pub load_complete_field: String,
}

fn default_api_key_header() -> String {
    "apikey".to_string()
}

fn default_payload() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

fn default_records_path() -> String {
    "root.EmployeeMaster.EmployeeMasterData".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_row_path() -> Option<String> {
    Some("BasicDetails.BasicDetail".to_string())
}

fn default_load_complete_field() -> String {
    "isLoadComplete".to_string()
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client settings shared by the token and data endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Retries when the connection could not be established (0 = fail immediately)
    ///
    /// Timeouts are never retried: the page position lives on the server, so
    /// re-sending a request that may have been served would skip a page.
    #[serde(default)]
    pub transport_retries: u32,

    /// Backoff strategy between transport retries
    #[serde(default)]
    pub backoff: BackoffType,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Optional request rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            transport_retries: 0,
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            requests_per_second: None,
        }
    }
}

// ============================================================================
// Storage Config
// ============================================================================

/// Object storage destination for the Parquet result and the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Destination URL (`s3://bucket/prefix`, `gs://`, `az://`, `memory://` or a local path)
    pub destination: String,

    /// S3 access key (falls back to the environment)
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// S3 secret key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// S3 region
    #[serde(default)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Allow plain HTTP endpoints
    #[serde(default)]
    pub allow_http: bool,

    /// Object key of the Parquet result
    #[serde(default = "default_data_key")]
    pub data_key: String,

    /// Object key of the run log
    #[serde(default = "default_log_key")]
    pub log_key: String,

    /// Parquet compression
    #[serde(default)]
    pub compression: CompressionType,

    /// Parquet row group size
    #[serde(default)]
    pub row_group_size: Option<usize>,
}

fn default_data_key() -> String {
    "{{ name }}/{{ name }}_{{ run.date }}.parquet".to_string()
}

fn default_log_key() -> String {
    "logs/{{ name }}_{{ run.stamp }}.log".to_string()
}

// ============================================================================
// Loading
// ============================================================================

/// Load a configuration file, resolving `{{ env.* }}` from the process environment
pub fn load_config(path: impl AsRef<Path>) -> Result<ExtractConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .context(format!("Failed to read config file '{}'", path.display()))?;
    load_config_from_str(&content, &TemplateContext::from_process_env())
}

/// Load a configuration from a YAML string with an explicit template context
pub fn load_config_from_str(yaml: &str, ctx: &TemplateContext) -> Result<ExtractConfig> {
    let raw: ExtractConfig = serde_yaml::from_str(yaml)?;
    let config = raw.resolve(ctx)?;
    config.validate()?;
    Ok(config)
}

impl ExtractConfig {
    /// Resolve templates in every field except the object keys
    fn resolve(mut self, ctx: &TemplateContext) -> Result<Self> {
        self.token.url = template::render(&self.token.url, ctx)?;
        self.token.basic_auth = template::render_opt(self.token.basic_auth.as_deref(), ctx)?;
        self.token.client_id = template::render_opt(self.token.client_id.as_deref(), ctx)?;
        self.token.client_secret = template::render_opt(self.token.client_secret.as_deref(), ctx)?;
        self.token.payload = template::render(&self.token.payload, ctx)?;

        self.api.url = template::render(&self.api.url, ctx)?;
        self.api.api_key = template::render(&self.api.api_key, ctx)?;
        self.api.payload = template::render_value(&self.api.payload, ctx)?;

        let storage = &mut self.storage;
        storage.destination = template::render(&storage.destination, ctx)?;
        storage.access_key_id = template::render_opt(storage.access_key_id.as_deref(), ctx)?;
        storage.secret_access_key =
            template::render_opt(storage.secret_access_key.as_deref(), ctx)?;
        storage.region = template::render_opt(storage.region.as_deref(), ctx)?;
        storage.endpoint = template::render_opt(storage.endpoint.as_deref(), ctx)?;

        // Empty env values mean "not set"
        self.token.basic_auth = self.token.basic_auth.none_if_empty();
        self.token.client_id = self.token.client_id.none_if_empty();
        self.token.client_secret = self.token.client_secret.none_if_empty();
        storage.access_key_id = storage.access_key_id.take().none_if_empty();
        storage.secret_access_key = storage.secret_access_key.take().none_if_empty();
        storage.region = storage.region.take().none_if_empty();
        storage.endpoint = storage.endpoint.take().none_if_empty();

        Ok(self)
    }

    /// Validate a resolved configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }

        validate_url("token.url", &self.token.url)?;
        validate_url("api.url", &self.api.url)?;

        match (
            &self.token.basic_auth,
            &self.token.client_id,
            &self.token.client_secret,
        ) {
            (Some(_), None, None) | (None, Some(_), Some(_)) => {}
            (Some(_), _, _) => {
                return Err(Error::invalid_value(
                    "token.basic_auth",
                    "set either basic_auth or client_id/client_secret, not both",
                ))
            }
            (None, None, None) => return Err(Error::missing_field("token.basic_auth")),
            (None, _, _) => {
                return Err(Error::invalid_value(
                    "token.client_id",
                    "client_id and client_secret must be set together",
                ))
            }
        }

        if self.token.token_field.trim().is_empty() {
            return Err(Error::missing_field("token.token_field"));
        }

        if self.api.api_key.trim().is_empty() {
            return Err(Error::missing_field("api.api_key"));
        }

        if self.api.records_path.trim().is_empty() {
            return Err(Error::missing_field("api.records_path"));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value(
                "http.timeout_secs",
                "timeout must be greater than zero",
            ));
        }

        if self.http.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "http.requests_per_second",
                "rate must be greater than zero",
            ));
        }

        if self.storage.destination.trim().is_empty() {
            return Err(Error::missing_field("storage.destination"));
        }

        if self.storage.data_key.trim().is_empty() {
            return Err(Error::missing_field("storage.data_key"));
        }

        if self.storage.log_key.trim().is_empty() {
            return Err(Error::missing_field("storage.log_key"));
        }

        Ok(())
    }
}

/// Object keys of one run, with `{{ run.* }}` and `{{ name }}` rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeys {
    /// Parquet output key
    pub data: String,
    /// Run log key
    pub log: String,
}

impl ExtractConfig {
    /// Render the storage keys for a run starting at `started_at`
    pub fn object_keys(&self, started_at: DateTime<Utc>) -> Result<ObjectKeys> {
        let mut ctx = TemplateContext::new();
        ctx.set_run_time(started_at).set_var("name", self.name.as_str());

        Ok(ObjectKeys {
            data: template::render(&self.storage.data_key, &ctx)?,
            log: template::render(&self.storage.log_key, &ctx)?,
        })
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_value(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}
