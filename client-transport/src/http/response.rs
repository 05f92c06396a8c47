//! Classification of HTTP responses.

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ErrorBody, TransportError};

/// Split a response into success (`[200, 400)`) or a status error.
///
/// On success the body is handed back for decoding. On failure the body is
/// decoded as an [`ErrorBody`] when possible; it only enriches the error.
///
/// # Errors
///
/// Returns [`TransportError::Status`] for statuses outside `[200, 400)`.
pub fn classify_response(
    method: &Method,
    path: &str,
    status: StatusCode,
    body: Bytes,
) -> Result<Bytes, TransportError> {
    if (200..400).contains(&status.as_u16()) {
        return Ok(body);
    }

    Err(TransportError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status,
        body: serde_json::from_slice::<ErrorBody>(&body).ok(),
    })
}

/// Decode a successful response body into `out`.
///
/// `out` is left untouched for `204 No Content` and for empty bodies.
///
/// # Errors
///
/// Returns [`TransportError::Decode`], carrying `status`, if the body is
/// not valid JSON for `T`.
pub fn decode_body<T: DeserializeOwned>(
    method: &Method,
    path: &str,
    status: StatusCode,
    body: &[u8],
    out: &mut T,
) -> Result<(), TransportError> {
    if status == StatusCode::NO_CONTENT || body.is_empty() {
        return Ok(());
    }

    *out = serde_json::from_slice(body).map_err(|source| TransportError::Decode {
        method: method.to_string(),
        path: path.to_string(),
        status,
        source,
    })?;
    Ok(())
}
