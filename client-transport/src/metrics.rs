//! External-service call metrics.
//!
//! One [`MetricSample`] is recorded per logical call. The wrappers create a
//! [`CallObservation`] before their retry loop; dropping it records the
//! sample, so the metric is emitted on every exit path, including early
//! returns and cancellation of the call future.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use tokio::time::Instant;

use crate::config::CallConfig;
use crate::context::RequestContext;

/// Status label recorded when no response was obtained.
pub const STATUS_INTERNAL_ERROR: &str = "Internal Server Error";

const METRIC_LABELS: [&str; 5] = ["service", "external_service", "endpoint", "method", "status"];

/// One observation of a logical outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    /// Calling service
    pub service: String,
    /// Called service
    pub external_service: String,
    /// URL path or gRPC method path
    pub endpoint: String,
    /// HTTP method, or `grpc`
    pub method: String,
    /// Status label of the final outcome
    pub status: String,
    /// When the call started, before the first attempt
    pub started_at: Instant,
    /// Total time across all attempts
    pub elapsed: Duration,
}

/// Sink for external-service call observations.
pub trait Metrics: Send + Sync {
    /// Record one logical call. Must not fail or block.
    fn record_external_call(&self, ctx: &RequestContext, sample: &MetricSample);
}

/// Metrics sink that drops every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn record_external_call(&self, _ctx: &RequestContext, _sample: &MetricSample) {}
}

/// Prometheus-backed metrics sink.
///
/// Registers `external_service_requests_total` and
/// `external_service_request_duration_seconds` into the given registry.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    requests: CounterVec,
    latency: HistogramVec,
}

impl PrometheusMetrics {
    /// Create the collectors and register them into `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if collectors with the same names are already
    /// registered.
    pub fn new(registry: Registry) -> Result<Self, prometheus::Error> {
        let requests = CounterVec::new(
            Opts::new(
                "external_service_requests_total",
                "Total outbound calls to external services",
            ),
            &METRIC_LABELS,
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "external_service_request_duration_seconds",
                "Outbound call latency across all attempts",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &METRIC_LABELS,
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency,
        })
    }

    /// Registry the collectors live in.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of calls recorded for a label set.
    #[must_use]
    pub fn request_count(&self, labels: &[&str; 5]) -> u64 {
        // counters only ever hold whole increments
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = self.requests.with_label_values(labels).get() as u64;
        count
    }

    /// Render all registered metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Metrics for PrometheusMetrics {
    fn record_external_call(&self, _ctx: &RequestContext, sample: &MetricSample) {
        let labels = [
            sample.service.as_str(),
            sample.external_service.as_str(),
            sample.endpoint.as_str(),
            sample.method.as_str(),
            sample.status.as_str(),
        ];
        self.requests.with_label_values(&labels).inc();
        self.latency
            .with_label_values(&labels)
            .observe(sample.elapsed.as_secs_f64());
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Guard measuring one logical call.
///
/// Records its sample exactly once, when dropped.
pub struct CallObservation<'a> {
    metrics: &'a Arc<dyn Metrics>,
    ctx: &'a RequestContext,
    config: &'a CallConfig,
    endpoint: String,
    method: String,
    status: String,
    started_at: Instant,
}

impl<'a> CallObservation<'a> {
    /// Start measuring a call. The status defaults to
    /// [`STATUS_INTERNAL_ERROR`] until [`set_status`](Self::set_status).
    pub fn start(
        metrics: &'a Arc<dyn Metrics>,
        ctx: &'a RequestContext,
        config: &'a CallConfig,
        endpoint: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            ctx,
            config,
            endpoint: endpoint.into(),
            method: method.into(),
            status: STATUS_INTERNAL_ERROR.to_string(),
            started_at: Instant::now(),
        }
    }

    /// Set the status label of the final outcome.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Time since the call started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Drop for CallObservation<'_> {
    fn drop(&mut self) {
        let sample = MetricSample {
            service: self.config.service_name.clone(),
            external_service: self.config.external_service_name.clone(),
            endpoint: std::mem::take(&mut self.endpoint),
            method: std::mem::take(&mut self.method),
            status: std::mem::take(&mut self.status),
            started_at: self.started_at,
            elapsed: self.started_at.elapsed(),
        };
        self.metrics.record_external_call(self.ctx, &sample);
    }
}
