//! Application routing configuration with middleware stack.
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!    ┌─────┴──────────────────────┐
//!    ▼                            ▼
//! ┌──────────────────┐   /health, /ready, /stats
//! │  Rate Limiting   │ ← 429 if exceeded
//! └────────┬─────────┘
//!          ▼
//!     /, /slow
//! ```
//!
//! # Route Groups
//!
//! - `/health`, `/ready`, `/stats` - Monitoring, never rate limited
//! - `/`, `/slow` - Demo API, guarded by the configured limiter

use axum::Router;
use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers;
use crate::middleware::RateLimitLayer;
use crate::rate_limit::RateLimitConfig;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The API group is wrapped in a [`RateLimitLayer`] when the state carries
/// a limiter. Rejections are rendered as JSON through [`AppError`].
pub fn build_router(state: AppState) -> Router {
    let mut api = Router::new()
        .route("/", get(handlers::index))
        .route("/slow", get(handlers::slow));

    match state.limiter() {
        Some(handle) => {
            info!(strategy = %handle.strategy(), "Rate limiting enabled for API routes");
            api = api.layer(RateLimitLayer::with_config(
                handle.limiter(),
                json_rejection(),
            ));
        }
        None => info!("Rate limiting disabled (RATE_LIMIT_STRATEGY=disabled)"),
    }

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/stats", get(handlers::stats))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rejection policy producing the application's JSON error body.
fn json_rejection() -> RateLimitConfig<Response<Body>> {
    RateLimitConfig::new().with_error_callback(|_, err| Ok(AppError::from(err).into_response()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{Config, RateLimitStrategy};

    fn state(strategy: RateLimitStrategy, capacity: u32) -> AppState {
        AppState::new(Config {
            rate_limit_strategy: strategy,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_capacity: capacity,
            ..Config::default()
        })
        .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rejection_is_json() {
        let app = build_router(state(RateLimitStrategy::Periodic, 0));

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json(response).await["error"], "rate_limited");
    }

    #[tokio::test]
    async fn test_health_routes_bypass_limiter() {
        let state = state(RateLimitStrategy::Gate, 0);
        let app = build_router(state.clone());

        for uri in ["/health", "/ready", "/stats"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
        assert_eq!(state.limiter().unwrap().snapshot().in_use, Some(0));
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_disabled_never_rejects() {
        let app = build_router(state(RateLimitStrategy::Disabled, 0));

        for _ in 0..5 {
            let response = app.clone().oneshot(get("/")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_stats_reports_usage() {
        let state = state(RateLimitStrategy::Periodic, 10);
        let app = build_router(state.clone());

        app.clone().oneshot(get("/")).await.unwrap();
        app.clone().oneshot(get("/")).await.unwrap();
        let body = json(app.oneshot(get("/stats")).await.unwrap()).await;

        assert_eq!(body["rate_limiter"]["strategy"], "periodic");
        assert_eq!(body["rate_limiter"]["in_use"], 2);
        assert_eq!(body["rate_limiter"]["capacity"], 10);
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_not_ready_after_shutdown() {
        let state = state(RateLimitStrategy::Gate, 10);
        let app = build_router(state.clone());

        state.shutdown().await;
        let response = app.oneshot(get("/ready")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_rejects_concurrent_slow_requests() {
        let app = build_router(state(RateLimitStrategy::InFlight, 1));

        let first = tokio::spawn(app.clone().oneshot(get("/slow?ms=100")));
        // Let the first request get admitted before the second arrives.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = app.clone().oneshot(get("/slow?ms=100")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let third = app.oneshot(get("/")).await.unwrap();
        assert_eq!(third.status(), StatusCode::OK);
    }
}
