//! End-to-end tests against a real server bound to an ephemeral port.
//!
//! Each test starts its own server with the strategy under test and talks
//! to it over HTTP with `reqwest`.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Request;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tower::{ServiceBuilder, ServiceExt, service_fn};

use httpware::rate_limit::{GateLimiter, LimitReachedError};
use httpware::transport::RateLimitClientLayer;
use httpware::{AppState, Config, RateLimitStrategy, build_router};

/// A running server and the state it was built from.
struct TestServer {
    addr: SocketAddr,
    state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(strategy: RateLimitStrategy, window: Duration, capacity: u32) -> Self {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            rate_limit_strategy: strategy,
            rate_limit_window: window,
            rate_limit_capacity: capacity,
            metrics_port: 0,
            ..Config::default()
        };
        let state = AppState::new(config).expect("Failed to build state");
        let app = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.handle.abort();
        self.state.shutdown().await;
    }
}

#[tokio::test]
async fn test_gate_rejects_then_recovers_after_window() {
    let server = TestServer::start(RateLimitStrategy::Gate, Duration::from_secs(1), 1).await;
    let client = Client::new();

    let first = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"], "rate_limited");

    sleep(Duration::from_millis(1200)).await;

    let third = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(third.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_continuous_rejects_burst_overflow() {
    let server =
        TestServer::start(RateLimitStrategy::Continuous, Duration::from_secs(60), 2).await;
    let client = Client::new();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(client.get(server.url("/")).send().await.unwrap().status());
    }

    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    server.stop().await;
}

#[tokio::test]
async fn test_monitoring_routes_are_not_limited() {
    let server = TestServer::start(RateLimitStrategy::Periodic, Duration::from_secs(60), 0).await;
    let client = Client::new();

    let api = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(api.status(), StatusCode::TOO_MANY_REQUESTS);

    for path in ["/health", "/ready", "/stats"] {
        let response = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    let stats: Value = client
        .get(server.url("/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["rate_limiter"]["strategy"], "periodic");
    assert_eq!(stats["rate_limiter"]["in_use"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_in_flight_limits_concurrent_requests() {
    let server = TestServer::start(RateLimitStrategy::InFlight, Duration::ZERO, 1).await;
    let client = Client::new();

    let slow = tokio::spawn(client.get(server.url("/slow?ms=500")).send());
    sleep(Duration::from_millis(100)).await;

    let blocked = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.status(), StatusCode::OK);

    let after = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(after.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_not_ready_after_limiter_shutdown() {
    let server = TestServer::start(RateLimitStrategy::Gate, Duration::from_secs(1), 10).await;
    let client = Client::new();

    let ready = client.get(server.url("/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    server.state.shutdown().await;

    let ready = client.get(server.url("/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);

    server.stop().await;
}

#[tokio::test]
async fn test_client_transport_limits_outgoing_requests() {
    let server = TestServer::start(RateLimitStrategy::Disabled, Duration::ZERO, 0).await;

    let http = Client::new();
    let transport = service_fn(move |req: Request<String>| {
        let http = http.clone();
        async move {
            let req = reqwest::Request::try_from(req)?;
            http.execute(req).await
        }
    });

    let limiter = Arc::new(GateLimiter::new(Duration::from_secs(60), 2).unwrap());
    let client = ServiceBuilder::new()
        .layer(RateLimitClientLayer::<reqwest::Response>::new(limiter.clone()))
        .service(transport);

    let request = || {
        Request::builder()
            .uri(server.url("/"))
            .body(String::new())
            .unwrap()
    };

    for _ in 0..2 {
        let response = client.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let err = client.oneshot(request()).await.unwrap_err();
    assert!(err.downcast_ref::<LimitReachedError>().is_some());
    assert_eq!(limiter.count(), 2);

    limiter.stop().await;
    server.stop().await;
}
