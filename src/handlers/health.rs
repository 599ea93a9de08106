//! Health, readiness, and statistics endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness with version and uptime
//! - `GET /ready` - Readiness probe; 503 once the limiter's reset task stops
//! - `GET /stats` - Limiter configuration and current usage
//!
//! These routes sit outside the rate-limited group so that probes never
//! consume admission capacity.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::state::{AppState, LimiterSnapshot};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    /// `None` when rate limiting is disabled.
    pub rate_limiter: Option<LimiterSnapshot>,
}

/// Health check endpoint. Always 200 while the process serves requests.
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// A periodic or gate limiter whose reset task has stopped would reject
/// every request once its window fills, so the instance reports 503.
#[instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> AppResult<StatusCode> {
    match state.limiter() {
        Some(handle) if !handle.is_running() => Err(AppError::Unavailable(format!(
            "{} limiter reset task is not running",
            handle.strategy()
        ))),
        _ => Ok(StatusCode::OK),
    }
}

/// Statistics endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "uptime_seconds": 3600,
///   "rate_limiter": {
///     "strategy": "gate",
///     "capacity": 100,
///     "window_ms": 1000,
///     "in_use": 12,
///     "running": true
///   }
/// }
/// ```
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.uptime_seconds(),
        rate_limiter: state.limiter().map(|handle| handle.snapshot()),
    })
}
