//! Recording implementations for testing.
//!
//! These capture what the transport logs and measures so tests can assert
//! on it.

use std::sync::Arc;

use client_transport::context::RequestContext;
use client_transport::logging::{LogLevel, Logger};
use client_transport::metrics::{MetricSample, Metrics};
use parking_lot::Mutex;

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Bound fields followed by call-site fields
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Value of the first field named `key`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Logger that keeps every entry in memory.
///
/// Loggers derived through [`Logger::with`] share the same store.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
    base: Vec<(String, String)>,
}

impl RecordingLogger {
    /// Create an empty recording logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured entries.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Captured entries at `level`.
    #[must_use]
    pub fn at_level(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .cloned()
            .collect()
    }

    /// Number of entries at `level`.
    #[must_use]
    pub fn count(&self, level: LogLevel) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .count()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &[(&str, String)]) {
        let fields = self
            .base
            .iter()
            .cloned()
            .chain(fields.iter().map(|(k, v)| ((*k).to_string(), v.clone())))
            .collect();
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            fields,
        });
    }

    fn with(&self, fields: &[(&str, String)]) -> Arc<dyn Logger> {
        let mut base = self.base.clone();
        base.extend(fields.iter().map(|(k, v)| ((*k).to_string(), v.clone())));
        Arc::new(Self {
            records: Arc::clone(&self.records),
            base,
        })
    }
}

/// A captured metric sample with the request id of its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The sample as emitted
    pub sample: MetricSample,
    /// Request id bound to the calling context
    pub request_id: Option<String>,
}

/// Metrics sink that keeps every sample in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingMetrics {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingMetrics {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured samples.
    #[must_use]
    pub fn samples(&self) -> Vec<MetricSample> {
        self.calls
            .lock()
            .iter()
            .map(|call| call.sample.clone())
            .collect()
    }

    /// All captured samples with their request ids.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of captured samples.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The only captured sample.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one sample was recorded.
    #[must_use]
    pub fn single(&self) -> MetricSample {
        let calls = self.calls.lock();
        assert_eq!(calls.len(), 1, "expected exactly one metric sample");
        calls[0].sample.clone()
    }
}

impl Metrics for RecordingMetrics {
    fn record_external_call(&self, ctx: &RequestContext, sample: &MetricSample) {
        self.calls.lock().push(RecordedCall {
            sample: sample.clone(),
            request_id: ctx.request_id().map(ToString::to_string),
        });
    }
}
