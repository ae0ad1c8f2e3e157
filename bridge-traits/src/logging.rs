//! Host Logging Abstractions
//!
//! Structured log entries and the sink trait used to mirror `tracing` events
//! into a host-specific logging pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    pub message: String,
    /// Structured fields
    pub fields: HashMap<String, String>,
    /// Span name the event was emitted in
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Logger sink trait
///
/// Forwards structured logs to host logging pipelines (OSLog, Logcat, a
/// desktop log file). Implementations must not write header values or bodies
/// that the transport logger has already redacted back in clear text.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::logging::{LoggerSink, LogEntry, LogLevel};
///
/// async fn log_error(logger: &dyn LoggerSink, error: &str) {
///     let entry = LogEntry::new(LogLevel::Error, "http_pipeline", error)
///         .with_field("stage", "deserialize");
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Minimum level this sink wants to receive
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Writes mirrored events to stdout, one line per entry.
///
/// Fields are printed sorted by key so the same event always renders the
/// same way.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn render(entry: &LogEntry) -> String {
        let level = match entry.level {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };

        let mut line = format!(
            "[{}] {:<5} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            entry.target
        );
        if let Some(span) = &entry.span_id {
            line.push_str(&format!(" ({})", span));
        }
        line.push_str(": ");
        line.push_str(&entry.message);

        let mut fields: Vec<_> = entry.fields.iter().collect();
        fields.sort();
        for (key, value) in fields {
            line.push_str(&format!(" {}={}", key, value));
        }
        line
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            println!("{}", Self::render(&entry));
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Warn, "http_pipeline", "Body emptied")
            .with_field("stage", "body-logger");

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.target, "http_pipeline");
        assert_eq!(entry.message, "Body emptied");
        assert_eq!(entry.fields.get("stage"), Some(&"body-logger".to_string()));
        assert_eq!(entry.span_id, None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[tokio::test]
    async fn test_console_logger_respects_min_level() {
        let logger = ConsoleLogger {
            min_level: LogLevel::Error,
        };
        assert_eq!(logger.min_level(), LogLevel::Error);

        let entry = LogEntry::new(LogLevel::Info, "test", "filtered out");
        logger.log(entry).await.unwrap();
    }

    #[test]
    fn test_console_render_sorts_fields() {
        let mut entry = LogEntry::new(LogLevel::Warn, "http_pipeline", "body emptied")
            .with_field("stage", "consuming-logger")
            .with_field("content_length", "17");
        entry.span_id = Some("request".to_string());

        let line = ConsoleLogger::render(&entry);
        assert!(line.contains("WARN  http_pipeline (request): body emptied"));
        assert!(line.ends_with(" content_length=17 stage=consuming-logger"));
    }
}
