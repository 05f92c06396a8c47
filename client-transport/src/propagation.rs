//! Request-id propagation to outgoing calls.
//!
//! All functions are no-ops when the context carries no request id.

use reqwest::header::{HeaderMap, HeaderValue};
use tonic::metadata::{AsciiMetadataValue, KeyAndValueRef, MetadataMap};
use tracing::debug;

use crate::context::{RequestContext, RequestId};

/// Header / metadata key carrying the request id.
pub const REQUEST_ID_KEY: &str = "x-request-id";

/// Derive a context whose outgoing gRPC metadata carries the request id.
#[must_use]
pub fn propagate_request_id_to_context(ctx: &RequestContext) -> RequestContext {
    let Some(request_id) = ctx.request_id() else {
        return ctx.clone();
    };

    let Ok(value) = AsciiMetadataValue::try_from(request_id.as_str()) else {
        debug!(request_id = %request_id, "request id is not valid metadata, skipping");
        return ctx.clone();
    };

    let mut metadata = ctx.outgoing_metadata().clone();
    metadata.insert(REQUEST_ID_KEY, value);
    ctx.with_outgoing_metadata(metadata)
}

/// Set the request id header on an outgoing HTTP request.
pub fn propagate_request_id_to_header(ctx: &RequestContext, headers: &mut HeaderMap) {
    let Some(request_id) = ctx.request_id() else {
        return;
    };

    match HeaderValue::from_str(request_id.as_str()) {
        Ok(value) => {
            headers.insert(REQUEST_ID_KEY, value);
        }
        Err(_) => debug!(request_id = %request_id, "request id is not a valid header, skipping"),
    }
}

/// Copy the context's outgoing metadata onto a concrete gRPC request.
pub fn propagate_request_id_to_metadata(ctx: &RequestContext, metadata: &mut MetadataMap) {
    for entry in ctx.outgoing_metadata().iter() {
        match entry {
            KeyAndValueRef::Ascii(key, value) => {
                metadata.insert(key.clone(), value.clone());
            }
            KeyAndValueRef::Binary(key, value) => {
                metadata.insert_bin(key.clone(), value.clone());
            }
        }
    }
}

/// Read the request id from inbound HTTP headers.
#[must_use]
pub fn request_id_from_headers(headers: &HeaderMap) -> Option<RequestId> {
    headers
        .get(REQUEST_ID_KEY)
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(RequestId::new)
}

/// Read the request id from inbound gRPC metadata.
#[must_use]
pub fn request_id_from_metadata(metadata: &MetadataMap) -> Option<RequestId> {
    metadata
        .get(REQUEST_ID_KEY)
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(RequestId::new)
}
