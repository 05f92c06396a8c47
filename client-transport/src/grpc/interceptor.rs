//! Unary call wrapper for generated gRPC clients.

use std::future::Future;
use std::sync::Arc;

use tonic::{Code, Request, Response, Status};
use tracing::instrument;

use crate::config::CallConfig;
use crate::context::RequestContext;
use crate::error::TransportError;
use crate::metrics::{CallObservation, Metrics};
use crate::propagation::{propagate_request_id_to_context, propagate_request_id_to_metadata};
use crate::retry::RetryPolicy;

/// Method label recorded for every gRPC call.
pub const GRPC_METHOD_LABEL: &str = "grpc";

/// Canonical upper-case name of a gRPC status code.
#[must_use]
pub const fn code_label(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}

/// Wraps unary gRPC invocations with request-id propagation, retry,
/// logging and one metric sample per call.
///
/// ```ignore
/// let reply = interceptor
///     .unary(&ctx, "/users.v1.Users/Get", GetUser { id }, |request| {
///         let mut client = client.clone();
///         async move { client.get(request).await }
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct GrpcInterceptor {
    config: Arc<CallConfig>,
    retry: RetryPolicy,
    metrics: Arc<dyn Metrics>,
}

impl GrpcInterceptor {
    /// Create an interceptor from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: CallConfig, metrics: Arc<dyn Metrics>) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self {
            retry: RetryPolicy::from(&config),
            config: Arc::new(config),
            metrics,
        })
    }

    /// Call configuration.
    #[must_use]
    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    /// Run one logical unary call.
    ///
    /// Every attempt gets a fresh [`Request`] built from a clone of
    /// `message`, carrying the context's outgoing metadata and the time left
    /// before the context deadline.
    ///
    /// # Errors
    ///
    /// Returns the status of the last attempt when every attempt failed.
    #[instrument(
        skip_all,
        fields(external_service = %self.config.external_service_name, method = %method)
    )]
    pub async fn unary<M, R, F, Fut>(
        &self,
        ctx: &RequestContext,
        method: &str,
        message: M,
        mut invoker: F,
    ) -> Result<Response<R>, Status>
    where
        M: Clone,
        F: FnMut(Request<M>) -> Fut,
        Fut: Future<Output = Result<Response<R>, Status>>,
    {
        let ctx = propagate_request_id_to_context(ctx);
        let logger = ctx.logger();
        let mut observation =
            CallObservation::start(&self.metrics, &ctx, &self.config, method, GRPC_METHOD_LABEL);

        let result = self
            .retry
            .execute(&ctx, method, |_| invoker(build_request(&ctx, message.clone())))
            .await;

        match result {
            Ok(response) => {
                observation.set_status(code_label(Code::Ok));
                logger.debug(&format!("{method} success"), &[]);
                Ok(response)
            }
            Err(status) => {
                observation.set_status(code_label(status.code()));
                logger.error(
                    &format!("{method} failed with code {}", code_label(status.code())),
                    &[("error", status.message().to_string())],
                );
                Err(status)
            }
        }
    }
}

fn build_request<M>(ctx: &RequestContext, message: M) -> Request<M> {
    let mut request = Request::new(message);
    propagate_request_id_to_metadata(ctx, request.metadata_mut());
    if let Some(remaining) = ctx.remaining() {
        request.set_timeout(remaining);
    }
    request
}

impl std::fmt::Debug for GrpcInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcInterceptor")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
