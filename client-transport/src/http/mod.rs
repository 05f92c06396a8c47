//! HTTP client wrapper.
//!
//! [`HttpClient`] sends JSON requests with request-id propagation, fixed
//! delay retries, one metric sample per call and structured logs.

mod client;
mod response;

pub use client::{Headers, HttpClient, JsonClient};
pub use response::{classify_response, decode_body};

use reqwest::{Client, ClientBuilder};

use crate::config::HttpClientConfig;

/// Build the pooled reqwest client an [`HttpClient`] sends through.
///
/// `config.timeout` caps every attempt; a context deadline can only shorten
/// it per request. Idle connections to each downstream host are kept for
/// reuse across calls and retries.
///
/// # Errors
///
/// Returns an error if reqwest rejects the settings or TLS setup fails.
///
/// # Examples
///
/// ```
/// use client_transport::{CallConfig, HttpClientConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpClientConfig::new(CallConfig::new("orders", "payments"))
///     .with_timeout(Duration::from_secs(5));
/// let http = build_http_client(&config).expect("client settings are valid");
/// ```
pub fn build_http_client(config: &HttpClientConfig) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
}
