//! Test fixtures with sample data.
//!
//! This module provides pre-built payloads and configurations for use in
//! tests.

use std::time::Duration;

use client_transport::{CallConfig, ErrorBody, GrpcClientConfig, HttpClientConfig};
use serde::{Deserialize, Serialize};

/// Calling service name used by fixtures.
pub const SERVICE_NAME: &str = "order-service";

/// Called service name used by fixtures.
pub const EXTERNAL_SERVICE_NAME: &str = "user-service";

/// Sample JSON resource for testing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleUser {
    /// User id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

impl SampleUser {
    /// Create a sample user.
    #[must_use]
    pub fn alice() -> Self {
        Self {
            id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    /// The user as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
        })
    }
}

/// Sample error body as returned by platform services.
#[must_use]
pub fn not_found_body() -> serde_json::Value {
    serde_json::json!({
        "message": "user 7 does not exist",
        "error": "not_found",
    })
}

/// The decoded form of [`not_found_body`].
#[must_use]
pub fn not_found_error() -> ErrorBody {
    ErrorBody {
        message: "user 7 does not exist".to_string(),
        error: "not_found".to_string(),
    }
}

/// Call settings with `attempts` attempts and no delay.
#[must_use]
pub fn call_config(attempts: u32) -> CallConfig {
    CallConfig::new(SERVICE_NAME, EXTERNAL_SERVICE_NAME)
        .with_max_retries(attempts)
        .with_backoff_delay(Duration::ZERO)
}

/// HTTP client settings with `attempts` attempts, no delay and a short
/// timeout.
#[must_use]
pub fn http_config(attempts: u32) -> HttpClientConfig {
    HttpClientConfig::new(call_config(attempts))
        .with_timeout(Duration::from_secs(5))
        .with_connect_timeout(Duration::from_secs(1))
}

/// gRPC client settings pointing at a local port.
#[must_use]
pub fn grpc_config(port: u16) -> GrpcClientConfig {
    GrpcClientConfig::new(call_config(3), "127.0.0.1", port)
        .with_timeout(Duration::from_secs(5))
}
