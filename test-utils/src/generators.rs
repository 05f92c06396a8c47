//! Shared proptest generators.
//!
//! This module provides reusable generators for the values client-transport
//! handles: request ids, service names, paths and call settings.

use std::time::Duration;

use client_transport::CallConfig;
use proptest::prelude::*;

/// Generate request ids that are valid header and metadata values.
pub fn request_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}",
        "req-[a-zA-Z0-9]{1,24}",
        "[A-Za-z0-9._~-]{1,64}",
    ]
}

/// Generate service names.
pub fn service_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,20}"
}

/// Generate URL paths.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9]{1,10}", 1..4).prop_map(|segments| {
        format!("/{}", segments.join("/"))
    })
}

/// Generate gRPC method paths.
pub fn grpc_method_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,10}", "[A-Z][a-z]{3,10}", "[A-Z][a-zA-Z]{3,12}")
        .prop_map(|(package, service, method)| format!("/{package}.v1.{service}/{method}"))
}

/// Generate HTTP methods the client accepts.
pub fn http_method_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("GET"),
        Just("POST"),
        Just("PUT"),
        Just("PATCH"),
        Just("DELETE"),
    ]
}

/// Generate attempt counts.
pub fn max_attempts_strategy() -> impl Strategy<Value = u32> {
    1u32..=8
}

/// Generate HTTP statuses outside the success range.
pub fn error_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![400u16..=451, 500u16..=511]
}

/// Generate HTTP statuses inside the success range.
pub fn success_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![200u16..=208, 300u16..=308]
}

/// Generate call settings with no delay between attempts.
pub fn call_config_strategy() -> impl Strategy<Value = CallConfig> {
    (
        service_name_strategy(),
        service_name_strategy(),
        max_attempts_strategy(),
    )
        .prop_map(|(service, external, attempts)| {
            CallConfig::new(service, external)
                .with_max_retries(attempts)
                .with_backoff_delay(Duration::ZERO)
        })
}
