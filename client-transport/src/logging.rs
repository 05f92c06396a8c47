//! Structured logger contract used by the client wrappers.
//!
//! The wrappers never call `tracing` macros for call outcomes directly;
//! they log through the [`Logger`] bound to the [`RequestContext`] so a
//! service can attach request-scoped fields once and have every outbound
//! call inherit them.
//!
//! [`RequestContext`]: crate::RequestContext

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leveled, structured logger.
///
/// Fields are key/value pairs. Implementations must be cheap to share
/// across tasks.
pub trait Logger: Send + Sync {
    /// Emit one log entry.
    fn log(&self, level: LogLevel, message: &str, fields: &[(&str, String)]);

    /// Return a logger that adds `fields` to every entry.
    fn with(&self, fields: &[(&str, String)]) -> Arc<dyn Logger>;

    /// Log at error level.
    fn error(&self, message: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Error, message, fields);
    }

    /// Log at warning level.
    fn warn(&self, message: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Warn, message, fields);
    }

    /// Log at info level.
    fn info(&self, message: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Info, message, fields);
    }

    /// Log at debug level.
    fn debug(&self, message: &str, fields: &[(&str, String)]) {
        self.log(LogLevel::Debug, message, fields);
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl Logger for NopLogger {
    fn log(&self, _level: LogLevel, _message: &str, _fields: &[(&str, String)]) {}

    fn with(&self, _fields: &[(&str, String)]) -> Arc<dyn Logger> {
        Arc::new(Self)
    }
}

/// Logger that forwards entries to `tracing` events.
///
/// Fields are rendered as `key=value` pairs into a single `fields` value,
/// since `tracing` field names must be known at compile time.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base: Vec<(String, String)>,
}

impl TracingLogger {
    /// Create a logger without default fields.
    #[must_use]
    pub const fn new() -> Self {
        Self { base: Vec::new() }
    }

    fn render(&self, fields: &[(&str, String)]) -> String {
        self.base
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(fields.iter().map(|(k, v)| (*k, v.as_str())))
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &[(&str, String)]) {
        let fields = self.render(fields);
        match level {
            LogLevel::Debug => debug!(fields = %fields, "{}", message),
            LogLevel::Info => info!(fields = %fields, "{}", message),
            LogLevel::Warn => warn!(fields = %fields, "{}", message),
            LogLevel::Error => error!(fields = %fields, "{}", message),
        }
    }

    fn with(&self, fields: &[(&str, String)]) -> Arc<dyn Logger> {
        let mut base = self.base.clone();
        base.extend(fields.iter().map(|(k, v)| ((*k).to_string(), v.clone())));
        Arc::new(Self { base })
    }
}

static DEFAULT_LOGGER: Lazy<RwLock<Arc<dyn Logger>>> =
    Lazy::new(|| RwLock::new(Arc::new(TracingLogger::new())));

/// Logger used when a context has none bound.
///
/// A [`TracingLogger`] until [`set_default_logger`] replaces it; it is
/// silent until a subscriber is installed.
#[must_use]
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::clone(&DEFAULT_LOGGER.read())
}

/// Replace the process-wide default logger, returning the previous one.
///
/// Contexts that already resolved a logger keep theirs.
pub fn set_default_logger(logger: Arc<dyn Logger>) -> Arc<dyn Logger> {
    std::mem::replace(&mut *DEFAULT_LOGGER.write(), logger)
}
