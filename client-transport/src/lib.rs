//! Client transport for calls between platform services.
//!
//! This crate wraps outbound HTTP and gRPC calls with:
//! - Request-id propagation from the inbound request context
//! - Fixed-delay retry bounded by the context deadline
//! - One metric sample per logical call
//! - Structured logging through a context-bound logger
//! - Classification of responses into typed errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod grpc;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod retry;
pub mod tracing_config;

pub use config::{CallConfig, GrpcClientConfig, HttpClientConfig};
pub use context::{RequestContext, RequestId};
pub use error::{ConfigError, ErrorBody, ErrorKind, TransportError};
pub use grpc::{GrpcClient, GrpcInterceptor};
pub use http::{Headers, HttpClient, JsonClient, build_http_client};
pub use logging::{LogLevel, Logger, NopLogger, TracingLogger, set_default_logger};
pub use metrics::{MetricSample, Metrics, NoopMetrics, PrometheusMetrics};
pub use propagation::{
    REQUEST_ID_KEY, propagate_request_id_to_context, propagate_request_id_to_header,
    propagate_request_id_to_metadata,
};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
