//! Retrying JSON HTTP client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::build_http_client;
use super::response::{classify_response, decode_body};
use crate::config::HttpClientConfig;
use crate::context::RequestContext;
use crate::error::{TransportError, status_label};
use crate::metrics::{CallObservation, Metrics};
use crate::propagation::propagate_request_id_to_header;
use crate::retry::RetryPolicy;

const APPLICATION_JSON: &str = "application/json";

/// Extra request headers. They override the JSON defaults.
pub type Headers = HashMap<String, String>;

/// JSON-over-HTTP client contract.
///
/// Each method returns the final status code, or an error that carries it.
/// A JSON response body is decoded into `out`; `out` is left untouched when
/// the body is empty or the status is `204 No Content`.
#[async_trait]
pub trait JsonClient: Send + Sync {
    /// Send a request with an arbitrary method.
    async fn request<T>(
        &self,
        ctx: &RequestContext,
        method: &str,
        url: &str,
        body: Option<Bytes>,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send;

    /// Send a `GET` request.
    async fn get<T>(
        &self,
        ctx: &RequestContext,
        url: &str,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send;

    /// Send a `POST` request.
    ///
    /// Failed attempts are retried like any other method, so the peer may
    /// see the same `POST` more than once.
    async fn post<T>(
        &self,
        ctx: &RequestContext,
        url: &str,
        body: Bytes,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send;
}

/// Request parts that are fixed for every attempt of one call.
#[derive(Debug)]
struct PreparedRequest {
    method: Method,
    url: Url,
    body: Option<Bytes>,
    headers: HeaderMap,
}

impl PreparedRequest {
    fn new(
        method: &str,
        url: &str,
        body: Option<Bytes>,
        headers: &Headers,
    ) -> Result<Self, TransportError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("invalid method {method:?}: {e}")))?;

        let url = Url::parse(url)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid url {url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidRequest(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid header name {name:?}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid value for header {name}: {e}"))
            })?;
            header_map.insert(name, value);
        }

        Ok(Self {
            method,
            url,
            body,
            headers: header_map,
        })
    }

    fn path(&self) -> &str {
        self.url.path()
    }

    fn transport_error(&self, source: reqwest::Error) -> TransportError {
        TransportError::Transport {
            method: self.method.to_string(),
            path: self.path().to_string(),
            source,
        }
    }
}

/// Response of the attempt that ended the retry loop.
struct AttemptResponse {
    status: StatusCode,
    body: Bytes,
}

/// HTTP client with retry, request-id propagation, logging and metrics.
#[derive(Clone)]
pub struct HttpClient {
    config: Arc<HttpClientConfig>,
    http: Client,
    retry: RetryPolicy,
    metrics: Arc<dyn Metrics>,
}

impl HttpClient {
    /// Create a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the underlying
    /// client cannot be built.
    pub fn new(config: HttpClientConfig, metrics: Arc<dyn Metrics>) -> Result<Self, TransportError> {
        config.validate()?;
        let http = build_http_client(&config).map_err(TransportError::ClientBuild)?;
        Self::with_http_client(config, http, metrics)
    }

    /// Create a client around an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_http_client(
        config: HttpClientConfig,
        http: Client,
        metrics: Arc<dyn Metrics>,
    ) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self {
            retry: RetryPolicy::from(&config.call),
            config: Arc::new(config),
            http,
            metrics,
        })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    #[instrument(
        skip_all,
        fields(external_service = %self.config.call.external_service_name, method = %method, url = %url)
    )]
    async fn call<T>(
        &self,
        ctx: &RequestContext,
        method: &str,
        url: &str,
        body: Option<Bytes>,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send,
    {
        let logger = ctx.logger();

        let prepared = match PreparedRequest::new(method, url, body, headers) {
            Ok(prepared) => prepared,
            Err(err) => {
                logger.error(
                    &format!("[{method}] {url} request could not be built"),
                    &[("error", err.to_string())],
                );
                return Err(err);
            }
        };

        let operation = format!("[{}] {}", prepared.method, prepared.path());
        let mut observation = CallObservation::start(
            &self.metrics,
            ctx,
            &self.config.call,
            prepared.path(),
            prepared.method.as_str(),
        );

        let attempt_request = &prepared;
        let result = self
            .retry
            .execute(ctx, &operation, move |_| self.send_once(ctx, attempt_request))
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let status = err.status_code();
                observation.set_status(status_label(status));
                logger.error(
                    &format!("{operation} failed with status code {}", status.as_u16()),
                    &[("error", err.to_string())],
                );
                return Err(err);
            }
        };

        observation.set_status(status_label(response.status));

        if let Err(err) = decode_body(
            &prepared.method,
            prepared.path(),
            response.status,
            &response.body,
            out,
        ) {
            logger.error(
                &format!("{operation} failed, unable to decode response body"),
                &[
                    ("request_url", prepared.url.to_string()),
                    ("response_code", response.status.as_u16().to_string()),
                    ("error", err.to_string()),
                ],
            );
            return Err(err);
        }

        logger.info(
            &format!("{operation} success"),
            &[
                ("request_url", prepared.url.to_string()),
                ("response_code", response.status.as_u16().to_string()),
            ],
        );
        Ok(response.status)
    }

    async fn send_once(
        &self,
        ctx: &RequestContext,
        prepared: &PreparedRequest,
    ) -> Result<AttemptResponse, TransportError> {
        let mut headers = HeaderMap::new();
        propagate_request_id_to_header(ctx, &mut headers);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        for (name, value) in &prepared.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self
            .http
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(headers);
        if let Some(body) = &prepared.body {
            request = request.body(body.clone());
        }
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining.min(self.config.timeout));
        }

        let response = request
            .send()
            .await
            .map_err(|source| prepared.transport_error(source))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| prepared.transport_error(source))?;

        let body = classify_response(&prepared.method, prepared.path(), status, body)?;
        Ok(AttemptResponse { status, body })
    }
}

#[async_trait]
impl JsonClient for HttpClient {
    async fn request<T>(
        &self,
        ctx: &RequestContext,
        method: &str,
        url: &str,
        body: Option<Bytes>,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send,
    {
        self.call(ctx, method, url, body, out, headers).await
    }

    async fn get<T>(
        &self,
        ctx: &RequestContext,
        url: &str,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send,
    {
        self.call(ctx, Method::GET.as_str(), url, None, out, headers)
            .await
    }

    async fn post<T>(
        &self,
        ctx: &RequestContext,
        url: &str,
        body: Bytes,
        out: &mut T,
        headers: &Headers,
    ) -> Result<StatusCode, TransportError>
    where
        T: DeserializeOwned + Send,
    {
        self.call(ctx, Method::POST.as_str(), url, Some(body), out, headers)
            .await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
