//! Error types for hrms-extract
//!
//! This module defines the error hierarchy for the whole extractor.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The fatal conditions of an extraction run map onto four variants:
//! [`Error::Auth`], [`Error::HttpStatus`], [`Error::Schema`] and
//! [`Error::Transport`] (plus [`Error::Timeout`] for transport timeouts).

use thiserror::Error;

/// The main error type for hrms-extract
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Unexpected response shape at '{path}': {message}")]
    Schema { path: String, message: String },

    // ============================================================================
    // Arrow/Parquet/Storage Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a schema error
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Check if this is a network-level failure (connection, DNS, timeout)
    ///
    /// HTTP status failures are never transport failures, whatever the status.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Transport(e) => !(e.is_builder() || e.is_decode() || e.is_status()),
            Error::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Check if the request never reached the server and can be re-sent
    ///
    /// Timeouts are excluded: the server may have served the page already.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_connect())
    }

    /// Check if this error came from the token endpoint or a rejected credential
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth { .. })
    }
}

/// Result type alias for hrms-extract
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("api.url");
        assert_eq!(err.to_string(), "Missing required config field: api.url");

        let err = Error::http_status(503, "Service Unavailable");
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");

        let err = Error::schema("root.EmployeeMaster", "missing key 'EmployeeMaster'");
        assert_eq!(
            err.to_string(),
            "Unexpected response shape at 'root.EmployeeMaster': missing key 'EmployeeMaster'"
        );
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_transport());

        assert!(!Error::http_status(500, "").is_transport());
        assert!(!Error::http_status(401, "").is_transport());
        assert!(!Error::auth("denied").is_transport());
        assert!(!Error::schema("root", "missing").is_transport());
    }

    #[test]
    fn test_timeout_is_not_retryable() {
        assert!(!Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(!Error::http_status(503, "").is_retryable());
    }

    #[test]
    fn test_context_wraps_io_error() {
        let read: std::result::Result<String, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = read.context("Failed to read config file 'a.yaml'").unwrap_err();
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "Failed to read config file 'a.yaml': IO error: gone");
    }

    #[test]
    fn test_is_auth() {
        assert!(Error::auth("no token").is_auth());
        assert!(!Error::http_status(401, "").is_auth());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
