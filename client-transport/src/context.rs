//! Per-request execution context.
//!
//! A [`RequestContext`] is created for every inbound request and passed by
//! reference through all outbound calls derived from it. It is never
//! mutated in place: the `with_*` methods return a new context.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tonic::metadata::MetadataMap;

use crate::logging::{self, Logger};

/// Opaque identifier correlating logs of one originating request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an identifier received from upstream.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Execution context for one inbound request.
#[derive(Clone, Default)]
pub struct RequestContext {
    request_id: Option<RequestId>,
    logger: Option<Arc<dyn Logger>>,
    outgoing: MetadataMap,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context bound to the given request id.
    #[must_use]
    pub fn with_request_id(&self, id: impl Into<RequestId>) -> Self {
        Self {
            request_id: Some(id.into()),
            ..self.clone()
        }
    }

    /// Derive a context bound to the given logger.
    #[must_use]
    pub fn with_logger(&self, logger: Arc<dyn Logger>) -> Self {
        Self {
            logger: Some(logger),
            ..self.clone()
        }
    }

    /// Derive a context that expires at `deadline`.
    ///
    /// An earlier deadline already on the context is kept.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = self.deadline.map_or(deadline, |current| current.min(deadline));
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Derive a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context carrying the given outgoing gRPC metadata.
    #[must_use]
    pub fn with_outgoing_metadata(&self, metadata: MetadataMap) -> Self {
        Self {
            outgoing: metadata,
            ..self.clone()
        }
    }

    /// The bound request id, if any.
    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// The bound logger, or the process default when none is bound.
    #[must_use]
    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger
            .clone()
            .unwrap_or_else(logging::default_logger)
    }

    /// Whether a logger was explicitly bound.
    #[must_use]
    pub const fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// Metadata to attach to outgoing gRPC requests.
    #[must_use]
    pub const fn outgoing_metadata(&self) -> &MetadataMap {
        &self.outgoing
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("has_logger", &self.logger.is_some())
            .field("outgoing", &self.outgoing)
            .field("deadline", &self.deadline)
            .finish()
    }
}
