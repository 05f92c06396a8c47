//! gRPC interceptor behavior with scripted invokers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use client_transport::grpc::{GRPC_METHOD_LABEL, GrpcClient};
use client_transport::logging::LogLevel;
use client_transport::{GrpcInterceptor, REQUEST_ID_KEY, RequestContext};
use parking_lot::Mutex;
use test_utils::fixtures;
use test_utils::{RecordingLogger, RecordingMetrics};
use tonic::{Code, Request, Response, Status};

const METHOD: &str = "/users.v1.Users/Get";

#[derive(Debug, Clone, PartialEq, Eq)]
struct GetUser {
    id: u64,
}

fn interceptor(config: client_transport::CallConfig) -> (GrpcInterceptor, RecordingMetrics) {
    let metrics = RecordingMetrics::new();
    let interceptor = GrpcInterceptor::new(config, Arc::new(metrics.clone())).unwrap();
    (interceptor, metrics)
}

#[tokio::test]
async fn test_failing_call_runs_every_attempt() {
    let (interceptor, metrics) = interceptor(fixtures::call_config(4));
    let logger = RecordingLogger::new();
    let ctx = RequestContext::new().with_logger(Arc::new(logger.clone()));
    let calls = Arc::new(AtomicU32::new(0));

    let result = interceptor
        .unary(&ctx, METHOD, GetUser { id: 7 }, |_request: Request<GetUser>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Response<()>, _>(Status::unavailable("down")) }
        })
        .await;

    assert_eq!(result.unwrap_err().code(), Code::Unavailable);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let sample = metrics.single();
    assert_eq!(sample.endpoint, METHOD);
    assert_eq!(sample.method, GRPC_METHOD_LABEL);
    assert_eq!(sample.status, "UNAVAILABLE");
    assert_eq!(logger.count(LogLevel::Warn), 4);
    assert_eq!(logger.count(LogLevel::Error), 1);
}

#[tokio::test]
async fn test_success_on_second_attempt() {
    let (interceptor, metrics) = interceptor(fixtures::call_config(5));
    let calls = Arc::new(AtomicU32::new(0));

    let response = interceptor
        .unary(&RequestContext::new(), METHOD, GetUser { id: 7 }, |request: Request<GetUser>| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 2 {
                    Err(Status::internal("boom"))
                } else {
                    Ok(Response::new(request.into_inner().id))
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(response.into_inner(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.single().status, "OK");
}

#[tokio::test]
async fn test_request_id_reaches_every_attempt() {
    let (interceptor, metrics) = interceptor(fixtures::call_config(2));
    let ctx = RequestContext::new().with_request_id("req-grpc");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let _ = interceptor
        .unary(&ctx, METHOD, GetUser { id: 1 }, |request: Request<GetUser>| {
            seen.lock().push(
                request
                    .metadata()
                    .get(REQUEST_ID_KEY)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            );
            async { Err::<Response<()>, _>(Status::unavailable("down")) }
        })
        .await;

    assert_eq!(
        *seen.lock(),
        vec![Some("req-grpc".to_string()), Some("req-grpc".to_string())]
    );
    assert_eq!(metrics.calls()[0].request_id.as_deref(), Some("req-grpc"));
}

#[tokio::test]
async fn test_no_metadata_without_request_id() {
    let (interceptor, _metrics) = interceptor(fixtures::call_config(1));

    let response = interceptor
        .unary(&RequestContext::new(), METHOD, GetUser { id: 1 }, |request: Request<GetUser>| {
            let present = request.metadata().get(REQUEST_ID_KEY).is_some();
            async move { Ok(Response::new(present)) }
        })
        .await
        .unwrap();

    assert!(!response.into_inner());
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_covers_slowest_attempt() {
    let (interceptor, metrics) = interceptor(fixtures::call_config(3));
    let calls = Arc::new(AtomicU32::new(0));

    interceptor
        .unary(&RequestContext::new(), METHOD, GetUser { id: 1 }, |_request: Request<GetUser>| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt == 1 {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Err(Status::unavailable("slow"))
                } else {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Response::new(()))
                }
            }
        })
        .await
        .unwrap();

    let sample = metrics.single();
    assert!(sample.elapsed >= Duration::from_millis(320));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_retries_and_sets_timeout() {
    let config = fixtures::call_config(10).with_backoff_delay(Duration::from_millis(100));
    let (interceptor, metrics) = interceptor(config);
    let ctx = RequestContext::new().with_timeout(Duration::from_millis(150));
    let calls = Arc::new(AtomicU32::new(0));
    let timeouts = Arc::new(Mutex::new(Vec::new()));

    let result = interceptor
        .unary(&ctx, METHOD, GetUser { id: 1 }, |request: Request<GetUser>| {
            calls.fetch_add(1, Ordering::SeqCst);
            timeouts
                .lock()
                .push(request.metadata().get("grpc-timeout").is_some());
            async { Err::<Response<()>, _>(Status::unavailable("down")) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(timeouts.lock().iter().all(|set| *set));
    assert_eq!(metrics.count(), 1);
}

#[tokio::test]
async fn test_grpc_client_shares_config_with_interceptor() {
    let client = GrpcClient::connect_lazy(
        fixtures::grpc_config(50051),
        Arc::new(RecordingMetrics::new()),
    )
    .unwrap();

    assert_eq!(
        client.interceptor().config().service_name,
        fixtures::SERVICE_NAME
    );
    let _channel = client.channel();
}
