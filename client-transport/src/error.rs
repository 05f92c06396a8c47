//! Error types for outbound calls.
//!
//! Every [`TransportError`] reports the status code the call ended with, so
//! callers get the `(status, error)` pair from a single value. Failures that
//! never reached the peer report `500 Internal Server Error`.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error returned by the HTTP client wrapper and by client construction.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be built from the caller's input.
    ///
    /// Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The peer could not be reached or the response could not be read.
    #[error("[{method}] {path} failed: {source}")]
    Transport {
        /// HTTP method of the call
        method: String,
        /// URL path of the call
        path: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The peer answered with a status outside `[200, 400)`.
    #[error("[{method}] {path} got unexpected status {status}: {}", describe_body(.body))]
    Status {
        /// HTTP method of the call
        method: String,
        /// URL path of the call
        path: String,
        /// Status returned by the peer
        status: StatusCode,
        /// Error body, when the response carried one
        body: Option<ErrorBody>,
    },

    /// The peer answered successfully but the body did not decode.
    ///
    /// Never retried; the success status is preserved.
    #[error("[{method}] {path} failed, unable to decode response body: {source}")]
    Decode {
        /// HTTP method of the call
        method: String,
        /// URL path of the call
        path: String,
        /// Status returned by the peer
        status: StatusCode,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The client configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The gRPC endpoint could not be parsed.
    #[error("invalid gRPC endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint URI that was rejected
        endpoint: String,
        /// Parser message
        reason: String,
    },
}

impl TransportError {
    /// Status code the call ended with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } | Self::Decode { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for metrics aggregation.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        status_label(self.status_code())
    }

    /// The decoded error body, if the peer sent one.
    #[must_use]
    pub const fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Common error kind for this failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::Config(_) | Self::InvalidEndpoint { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::Transport { .. } => ErrorKind::Unavailable,
            Self::Status { status, .. } => ErrorKind::from_http_status(*status),
            Self::Decode { .. } | Self::ClientBuild(_) => ErrorKind::Internal,
        }
    }
}

/// Reason phrase of an HTTP status, used as its metric label.
#[must_use]
pub fn status_label(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

fn describe_body(body: &Option<ErrorBody>) -> String {
    body.as_ref().map_or_else(|| ErrorKind::Unknown.to_string(), ToString::to_string)
}

/// Error payload some services return with failing responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Machine readable error code
    #[serde(default)]
    pub error: String,
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}| {}", self.error, self.message)
    }
}

/// Configuration validation error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was empty or absent.
    #[error("missing required setting {0}")]
    Missing(String),

    /// A setting had a value that cannot be used.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Setting name
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Platform-wide error kinds shared by HTTP and gRPC callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Resource not found
    #[error("not found")]
    NotFound,
    /// Request was malformed
    #[error("invalid argument")]
    InvalidArgument,
    /// Operation not implemented by the peer
    #[error("unimplemented")]
    Unimplemented,
    /// Caller is not authenticated or not allowed
    #[error("unauthorized")]
    Unauthorized,
    /// Peer temporarily unavailable
    #[error("service unavailable")]
    Unavailable,
    /// Anything that does not map to a known kind
    #[error("unknown")]
    Unknown,
    /// Peer or local internal failure
    #[error("internal")]
    Internal,
    /// Request is valid but not supported
    #[error("unsupported")]
    Unsupported,
    /// Request timed out
    #[error("request timeout")]
    Timeout,
}

impl ErrorKind {
    /// Map an HTTP status to an error kind.
    #[must_use]
    pub fn from_http_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 | 422 => Self::InvalidArgument,
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            405 | 415 => Self::Unsupported,
            408 | 504 => Self::Timeout,
            429 | 502 | 503 => Self::Unavailable,
            500 => Self::Internal,
            501 => Self::Unimplemented,
            _ => Self::Unknown,
        }
    }

    /// Map a gRPC status code to an error kind.
    #[must_use]
    pub const fn from_grpc_code(code: tonic::Code) -> Self {
        use tonic::Code;

        match code {
            Code::InvalidArgument | Code::OutOfRange | Code::FailedPrecondition => {
                Self::InvalidArgument
            }
            Code::NotFound => Self::NotFound,
            Code::Unimplemented => Self::Unimplemented,
            Code::Unauthenticated | Code::PermissionDenied => Self::Unauthorized,
            Code::Unavailable | Code::ResourceExhausted | Code::Aborted => Self::Unavailable,
            Code::DeadlineExceeded | Code::Cancelled => Self::Timeout,
            Code::Internal | Code::DataLoss => Self::Internal,
            _ => Self::Unknown,
        }
    }
}
