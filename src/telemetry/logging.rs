//! Logging
//!
//! Structured logging for token operations.
//!
//! Token values are only ever logged as a fingerprint; secrets, verifiers and
//! session handles are never logged.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::types::token_fingerprint;

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Token log context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLogContext {
    /// Operation name.
    pub operation: Option<String>,
    /// Consumer key.
    pub consumer_key: Option<String>,
    /// User the token belongs to.
    pub user: Option<String>,
    /// Fingerprint of the token value.
    pub token: Option<String>,
    /// Additional context.
    pub extra: BTreeMap<String, String>,
}

impl TokenLogContext {
    /// Create new log context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set operation.
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set consumer key.
    pub fn consumer_key(mut self, consumer_key: impl Into<String>) -> Self {
        self.consumer_key = Some(consumer_key.into());
        self
    }

    /// Set user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set token, logged as a fingerprint only.
    pub fn token(mut self, value: &str) -> Self {
        self.token = Some(token_fingerprint(value));
        self
    }

    /// Add extra context.
    pub fn extra(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }

    fn extra_fields(&self) -> String {
        self.extra
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Logger interface.
pub trait Logger: Send + Sync {
    /// Log at trace level.
    fn trace(&self, message: &str, context: &TokenLogContext);

    /// Log at debug level.
    fn debug(&self, message: &str, context: &TokenLogContext);

    /// Log at info level.
    fn info(&self, message: &str, context: &TokenLogContext);

    /// Log at warn level.
    fn warn(&self, message: &str, context: &TokenLogContext);

    /// Log at error level.
    fn error(&self, message: &str, context: &TokenLogContext);

    /// Check if a log level is enabled.
    fn is_enabled(&self, level: LogLevel) -> bool;
}

/// No-op logger implementation.
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn trace(&self, _message: &str, _context: &TokenLogContext) {}
    fn debug(&self, _message: &str, _context: &TokenLogContext) {}
    fn info(&self, _message: &str, _context: &TokenLogContext) {}
    fn warn(&self, _message: &str, _context: &TokenLogContext) {}
    fn error(&self, _message: &str, _context: &TokenLogContext) {}
    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// No-op logger singleton.
pub fn no_op_logger() -> NoOpLogger {
    NoOpLogger
}

/// Logger forwarding to the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

macro_rules! forward {
    ($level:ident, $message:expr, $context:expr) => {
        tracing::$level!(
            operation = $context.operation.as_deref().unwrap_or(""),
            consumer_key = $context.consumer_key.as_deref().unwrap_or(""),
            user = $context.user.as_deref().unwrap_or(""),
            token = $context.token.as_deref().unwrap_or(""),
            extra = %$context.extra_fields(),
            "{}",
            $message
        )
    };
}

impl Logger for TracingLogger {
    fn trace(&self, message: &str, context: &TokenLogContext) {
        forward!(trace, message, context);
    }

    fn debug(&self, message: &str, context: &TokenLogContext) {
        forward!(debug, message, context);
    }

    fn info(&self, message: &str, context: &TokenLogContext) {
        forward!(info, message, context);
    }

    fn warn(&self, message: &str, context: &TokenLogContext) {
        forward!(warn, message, context);
    }

    fn error(&self, message: &str, context: &TokenLogContext) {
        forward!(error, message, context);
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
        }
    }
}

/// Log entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: TokenLogContext,
    pub timestamp: i64,
}

/// In-memory logger for testing.
pub struct InMemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    min_level: LogLevel,
}

impl InMemoryLogger {
    /// Create new in-memory logger.
    pub fn new() -> Self {
        Self::with_level(LogLevel::Trace)
    }

    /// Create in-memory logger with minimum level.
    pub fn with_level(min_level: LogLevel) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            min_level,
        }
    }

    /// Get all log entries.
    pub fn get_entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries by level.
    pub fn get_entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn log(&self, level: LogLevel, message: &str, context: &TokenLogContext) {
        if level >= self.min_level {
            self.entries.lock().unwrap().push(LogEntry {
                level,
                message: message.to_string(),
                context: context.clone(),
                timestamp: Utc::now().timestamp_millis(),
            });
        }
    }
}

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for InMemoryLogger {
    fn trace(&self, message: &str, context: &TokenLogContext) {
        self.log(LogLevel::Trace, message, context);
    }

    fn debug(&self, message: &str, context: &TokenLogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &TokenLogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &TokenLogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &TokenLogContext) {
        self.log(LogLevel::Error, message, context);
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

/// Create in-memory logger for testing.
pub fn create_in_memory_logger() -> InMemoryLogger {
    InMemoryLogger::new()
}

/// Create logger forwarding to `tracing`.
pub fn create_tracing_logger() -> TracingLogger {
    TracingLogger
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Warn > LogLevel::Info);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert!(LogLevel::Debug > LogLevel::Trace);
    }

    #[test]
    fn test_in_memory_logger() {
        let logger = InMemoryLogger::new();
        let context = TokenLogContext::new()
            .operation("put")
            .consumer_key("jenkins");

        logger.info("Token stored", &context);
        logger.debug("Debug info", &context);
        logger.error("Error occurred", &context);

        let entries = logger.get_entries();
        assert_eq!(entries.len(), 3);

        let error_entries = logger.get_entries_by_level(LogLevel::Error);
        assert_eq!(error_entries.len(), 1);
    }

    #[test]
    fn test_log_context_builder() {
        let context = TokenLogContext::new()
            .operation("generate_access_token")
            .consumer_key("jenkins")
            .user("alice")
            .token("bb6dd1391ce33b5bd3ecad1175139a39")
            .extra("removed", 3);

        assert_eq!(context.operation, Some("generate_access_token".to_string()));
        assert_eq!(context.token, Some("bb6dd139...".to_string()));
        assert_eq!(context.extra.get("removed"), Some(&"3".to_string()));
        assert_eq!(context.extra_fields(), "removed=3");
    }

    #[test]
    fn test_min_level_filtering() {
        let logger = InMemoryLogger::with_level(LogLevel::Warn);
        let context = TokenLogContext::new();

        logger.trace("trace", &context);
        logger.debug("debug", &context);
        logger.info("info", &context);
        logger.warn("warn", &context);
        logger.error("error", &context);

        let entries = logger.get_entries();
        assert_eq!(entries.len(), 2); // Only warn and error
    }

    #[test]
    fn test_tracing_logger_without_subscriber() {
        let logger = TracingLogger;
        logger.warn("no subscriber installed", &TokenLogContext::new().operation("test"));
        assert!(!logger.is_enabled(LogLevel::Trace));
    }
}
