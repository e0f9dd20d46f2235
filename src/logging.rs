//! Injected logger for the resolution engine.
//!
//! The resolver and loader never reach for global logger state. Callers hand
//! them a [`Logger`] carrying its own level filter; output goes to `tracing`,
//! whose subscriber is installed once by the binary.

use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tracing::Level;

/// Severity of a log message, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Atomic level filter shared between loggers.
///
/// The level is stored as a u8: 0=Debug, 1=Info, 2=Warning, 3=Error
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    /// Create a new filter with the given minimum level.
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level_to_u8(level)))
    }

    /// Get the current minimum level.
    pub fn get(&self) -> LogLevel {
        u8_to_level(self.0.load(Ordering::Relaxed))
    }

    /// Set the minimum level.
    pub fn set(&self, level: LogLevel) {
        self.0.store(level_to_u8(level), Ordering::Relaxed);
    }

    /// Check if a message at the given level should be logged.
    pub fn should_log(&self, level: LogLevel) -> bool {
        level_to_u8(level) >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

fn level_to_u8(level: LogLevel) -> u8 {
    match level {
        LogLevel::Debug => 0,
        LogLevel::Info => 1,
        LogLevel::Warning => 2,
        LogLevel::Error => 3,
    }
}

fn u8_to_level(val: u8) -> LogLevel {
    match val {
        0 => LogLevel::Debug,
        1 => LogLevel::Info,
        2 => LogLevel::Warning,
        _ => LogLevel::Error,
    }
}

/// Convert a [`LogLevel`] to the matching tracing level.
pub fn log_level_to_tracing(level: LogLevel) -> Level {
    match level {
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warning => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Logger handed to the resolver, loader and emitter.
#[derive(Clone)]
pub struct Logger {
    /// Minimum level to log.
    level_filter: Arc<LogLevelFilter>,
    /// Logger name/category.
    name: Option<String>,
}

impl Logger {
    /// Create a logger at `Info` level.
    pub fn new() -> Self {
        Self {
            level_filter: Arc::new(LogLevelFilter::default()),
            name: None,
        }
    }

    /// Create a logger with a fresh filter at the given level.
    pub fn with_level(level: LogLevel) -> Self {
        Self::new().with_level_filter(Arc::new(LogLevelFilter::new(level)))
    }

    /// Set the level filter.
    pub fn with_level_filter(mut self, filter: Arc<LogLevelFilter>) -> Self {
        self.level_filter = filter;
        self
    }

    /// Set the logger name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Derive a child logger that shares this logger's filter.
    pub fn child(&self, name: impl Into<String>) -> Self {
        self.clone().with_name(name)
    }

    /// Whether a message at `level` would be emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level_filter.should_log(level)
    }

    /// Log a message, optionally with structured data rendered as JSON.
    pub fn log(&self, level: LogLevel, message: &str, data: Option<&Value>) {
        if !self.enabled(level) {
            return;
        }

        let name = self.name.as_deref().unwrap_or("stratum");
        let data = data.map(Value::to_string).unwrap_or_default();
        match log_level_to_tracing(level) {
            Level::ERROR => tracing::error!(logger = %name, data = %data, "{}", message),
            Level::WARN => tracing::warn!(logger = %name, data = %data, "{}", message),
            Level::INFO => tracing::info!(logger = %name, data = %data, "{}", message),
            Level::DEBUG => tracing::debug!(logger = %name, data = %data, "{}", message),
            Level::TRACE => tracing::trace!(logger = %name, data = %data, "{}", message),
        }
    }

    /// Log a message with structured data.
    pub fn log_with_data(&self, level: LogLevel, message: &str, data: &Value) {
        self.log(level, message, Some(data));
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg, None);
    }

    /// Log an info message.
    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg, None);
    }

    /// Log a warning message.
    pub fn warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg, None);
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg, None);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let filter = LogLevelFilter::new(LogLevel::Warning);

        assert!(!filter.should_log(LogLevel::Debug));
        assert!(!filter.should_log(LogLevel::Info));

        assert!(filter.should_log(LogLevel::Warning));
        assert!(filter.should_log(LogLevel::Error));
    }

    #[test]
    fn test_level_filter_update() {
        let filter = LogLevelFilter::new(LogLevel::Debug);
        assert!(filter.should_log(LogLevel::Debug));

        filter.set(LogLevel::Error);
        assert!(!filter.should_log(LogLevel::Debug));
        assert!(!filter.should_log(LogLevel::Warning));
        assert!(filter.should_log(LogLevel::Error));
    }

    #[test]
    fn test_child_shares_filter() {
        let parent = Logger::with_level(LogLevel::Info);
        let child = parent.child("loader");
        assert!(!child.enabled(LogLevel::Debug));

        parent.level_filter.set(LogLevel::Debug);
        assert!(child.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_log_level_to_tracing() {
        assert_eq!(log_level_to_tracing(LogLevel::Debug), Level::DEBUG);
        assert_eq!(log_level_to_tracing(LogLevel::Info), Level::INFO);
        assert_eq!(log_level_to_tracing(LogLevel::Warning), Level::WARN);
        assert_eq!(log_level_to_tracing(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_level_roundtrip() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ] {
            let filter = LogLevelFilter::new(level);
            assert_eq!(filter.get(), level);
        }
    }
}
