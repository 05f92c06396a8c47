//! Plaintext channel to a downstream gRPC service.

use std::sync::Arc;

use tonic::transport::{Channel, Endpoint};

use super::GrpcInterceptor;
use crate::config::GrpcClientConfig;
use crate::error::TransportError;
use crate::metrics::Metrics;

/// A lazily connected channel paired with the interceptor for its calls.
#[derive(Debug, Clone)]
pub struct GrpcClient {
    channel: Channel,
    interceptor: GrpcInterceptor,
}

impl GrpcClient {
    /// Build the channel without connecting. The connection is made on the
    /// first call.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the endpoint URI
    /// cannot be parsed.
    pub fn connect_lazy(
        config: GrpcClientConfig,
        metrics: Arc<dyn Metrics>,
    ) -> Result<Self, TransportError> {
        config.validate()?;

        let uri = config.endpoint_uri();
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| TransportError::InvalidEndpoint {
                endpoint: uri,
                reason: e.to_string(),
            })?
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            endpoint = endpoint.timeout(timeout);
        }

        let channel = endpoint.connect_lazy();
        let interceptor = GrpcInterceptor::new(config.call, metrics)?;

        Ok(Self {
            channel,
            interceptor,
        })
    }

    /// Channel to hand to a generated client.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// Interceptor wrapping calls made over [`channel`](Self::channel).
    #[must_use]
    pub const fn interceptor(&self) -> &GrpcInterceptor {
        &self.interceptor
    }
}
