//! Run log
//!
//! The engine reports progress through a [`LogSink`] handed to it at
//! construction. [`RunLog`] is the production sink: every line is forwarded
//! to `tracing` and also kept in memory so the whole run can be uploaded as
//! a text artifact once it ends.

use crate::types::LogLevel;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Narrow logging capability used by the engine
pub trait LogSink: Send + Sync {
    /// Record one log line
    fn record(&self, level: LogLevel, message: &str);

    /// Record an info line
    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    /// Record a warning line
    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    /// Record an error line
    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }
}

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the line was recorded
    pub at: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
}

impl LogEntry {
    /// Render as `2024-01-31 10:00:00,123 - INFO - message`
    pub fn render(&self) -> String {
        format!(
            "{} - {} - {}",
            self.at.format("%Y-%m-%d %H:%M:%S,%3f"),
            self.level,
            self.message
        )
    }
}

/// Capturing log sink that also forwards to `tracing`
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Mutex<Vec<LogEntry>>,
    forward: bool,
}

impl RunLog {
    /// Create a run log that forwards every line to `tracing`
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            forward: true,
        }
    }

    /// Create a run log that only captures
    pub fn capture_only() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured messages at a given level
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Check whether any line contains the given text
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }

    /// Render the whole log as the uploadable artifact
    pub fn render(&self) -> Bytes {
        let mut out = String::new();
        for entry in self.entries() {
            out.push_str(&entry.render());
            out.push('\n');
        }
        Bytes::from(out)
    }
}

impl LogSink for RunLog {
    fn record(&self, level: LogLevel, message: &str) {
        if self.forward {
            match level {
                LogLevel::Debug => debug!("{message}"),
                LogLevel::Info => info!("{message}"),
                LogLevel::Warn => warn!("{message}"),
                LogLevel::Error => error!("{message}"),
            }
        }

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                at: Utc::now(),
                level,
                message: message.to_string(),
            });
    }
}
