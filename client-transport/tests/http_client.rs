//! HTTP client behavior against a live mock server.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use client_transport::logging::LogLevel;
use client_transport::metrics::STATUS_INTERNAL_ERROR;
use client_transport::{Headers, HttpClient, JsonClient, RequestContext, TransportError};
use reqwest::StatusCode;
use test_utils::fixtures::{self, SampleUser};
use test_utils::{RecordingLogger, RecordingMetrics};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: HttpClient,
    metrics: RecordingMetrics,
    logger: RecordingLogger,
    ctx: RequestContext,
}

fn harness(attempts: u32) -> Harness {
    harness_with(fixtures::http_config(attempts))
}

fn harness_with(config: client_transport::HttpClientConfig) -> Harness {
    let metrics = RecordingMetrics::new();
    let logger = RecordingLogger::new();
    let client = HttpClient::new(config, Arc::new(metrics.clone())).unwrap();
    let ctx = RequestContext::new()
        .with_request_id("req-123")
        .with_logger(Arc::new(logger.clone()));
    Harness {
        client,
        metrics,
        logger,
        ctx,
    }
}

#[tokio::test]
async fn test_empty_body_leaves_output_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(3);
    let mut out = SampleUser::alice();
    let status = h
        .client
        .get(&h.ctx, &format!("{}/users/1", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(out, SampleUser::alice());

    let sample = h.metrics.single();
    assert_eq!(sample.service, fixtures::SERVICE_NAME);
    assert_eq!(sample.external_service, fixtures::EXTERNAL_SERVICE_NAME);
    assert_eq!(sample.endpoint, "/users/1");
    assert_eq!(sample.method, "GET");
    assert_eq!(sample.status, "OK");
    assert_eq!(h.logger.count(LogLevel::Info), 1);
}

#[tokio::test]
async fn test_json_body_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(SampleUser::alice().to_json()))
        .mount(&server)
        .await;

    let h = harness(3);
    let mut out = SampleUser::default();
    h.client
        .get(&h.ctx, &format!("{}/users/1", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap();

    assert_eq!(out, SampleUser::alice());
}

#[tokio::test]
async fn test_error_status_retried_and_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"message": "x", "error": "not_found"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(3);
    let mut out = SampleUser::default();
    let err = h
        .client
        .get(&h.ctx, &format!("{}/users/7", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    let message = err.to_string();
    assert!(message.contains("not_found"));
    assert!(message.contains('x'));
    assert_eq!(err.error_body().map(|b| b.error.as_str()), Some("not_found"));

    assert_eq!(h.metrics.single().status, "Not Found");
    assert_eq!(h.logger.count(LogLevel::Warn), 3);
    assert_eq!(h.logger.count(LogLevel::Error), 1);
}

#[tokio::test]
async fn test_decode_failure_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(3);
    let mut out = SampleUser::default();
    let err = h
        .client
        .get(&h.ctx, &format!("{}/users/1", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode { .. }));
    assert_eq!(err.status_code(), StatusCode::OK);
    assert_eq!(h.metrics.single().status, "OK");
    assert_eq!(h.logger.count(LogLevel::Error), 1);
}

#[tokio::test]
async fn test_flaky_server_succeeds_on_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(SampleUser::alice().to_json()))
        .mount(&server)
        .await;

    let h = harness(5);
    let mut out = SampleUser::default();
    let status = h
        .client
        .get(&h.ctx, &format!("{}/users/1", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(out, SampleUser::alice());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(h.metrics.count(), 1);
    assert_eq!(h.logger.count(LogLevel::Warn), 2);
}

#[tokio::test]
async fn test_caller_headers_override_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("content-type", "application/vnd.api+json"))
        .and(header("accept", "application/json"))
        .and(header("x-request-id", "req-123"))
        .and(header("x-tenant", "acme"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(1);
    let headers = Headers::from([
        ("Content-Type".to_string(), "application/vnd.api+json".to_string()),
        ("x-tenant".to_string(), "acme".to_string()),
    ]);
    let mut out = serde_json::Value::Null;
    let status = h
        .client
        .get(&h.ctx, &format!("{}/users", server.uri()), &mut out, &headers)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(h.metrics.calls()[0].request_id.as_deref(), Some("req-123"));
}

#[tokio::test]
async fn test_no_request_id_header_without_binding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let h = harness(1);
    let mut out = serde_json::Value::Null;
    h.client
        .get(&RequestContext::new(), &format!("{}/ping", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-request-id").is_none());
}

#[tokio::test]
async fn test_post_sends_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(SampleUser::alice().to_json()))
        .respond_with(ResponseTemplate::new(201).set_body_json(SampleUser::alice().to_json()))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(3);
    let body = Bytes::from(serde_json::to_vec(&SampleUser::alice()).unwrap());
    let mut out = SampleUser::default();
    let status = h
        .client
        .post(&h.ctx, &format!("{}/users", server.uri()), body, &mut out, &Headers::new())
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(out.id, 1);
    assert_eq!(h.metrics.single().status, "Created");
}

#[tokio::test]
async fn test_failing_post_resent_on_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(body_json(SampleUser::alice().to_json()))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(3);
    let body = Bytes::from(serde_json::to_vec(&SampleUser::alice()).unwrap());
    let mut out = serde_json::Value::Null;
    let err = h
        .client
        .post(&h.ctx, &format!("{}/payments", server.uri()), body, &mut out, &Headers::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    let sample = h.metrics.single();
    assert_eq!(sample.method, "POST");
    assert_eq!(sample.status, "Service Unavailable");
}

#[tokio::test]
async fn test_construction_error_issues_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(3);
    let mut out = serde_json::Value::Null;
    let err = h
        .client
        .request(&h.ctx, "NOT A METHOD", &server.uri(), None, &mut out, &Headers::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::InvalidRequest(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.metrics.count(), 0);
    assert_eq!(h.logger.count(LogLevel::Error), 1);
    assert_eq!(h.logger.count(LogLevel::Warn), 0);
}

#[tokio::test]
async fn test_network_failure_labelled_internal_error() {
    let h = harness(2);
    let mut out = serde_json::Value::Null;
    let err = h
        .client
        .get(&h.ctx, "http://127.0.0.1:1/users/1", &mut out, &Headers::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Transport { .. }));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.metrics.single().status, STATUS_INTERNAL_ERROR);
    assert_eq!(h.logger.count(LogLevel::Warn), 2);
}

#[tokio::test]
async fn test_elapsed_covers_slowest_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(150)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let h = harness(2);
    let mut out = serde_json::Value::Null;
    h.client
        .get(&h.ctx, &format!("{}/slow", server.uri()), &mut out, &Headers::new())
        .await
        .unwrap();

    let sample = h.metrics.single();
    assert!(sample.elapsed >= Duration::from_millis(150));
    assert_eq!(sample.status, "OK");
}

#[tokio::test]
async fn test_expired_deadline_stops_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = fixtures::http_config(10);
    config.call = config.call.with_backoff_delay(Duration::from_millis(100));
    let h = harness_with(config);
    let ctx = h.ctx.with_timeout(Duration::from_millis(150));

    let mut out = serde_json::Value::Null;
    let result = h
        .client
        .get(&ctx, &format!("{}/users", server.uri()), &mut out, &Headers::new())
        .await;

    assert!(result.is_err());
    let attempts = server.received_requests().await.unwrap().len();
    assert!(attempts < 10, "made {attempts} attempts");
    assert_eq!(h.metrics.count(), 1);
}
