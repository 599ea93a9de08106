//! Rate-limited demo endpoints.

use std::time::Duration;

use axum::Json;
use axum::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Upper bound for `/slow`.
const MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SlowParams {
    #[serde(default)]
    pub ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SlowResponse {
    pub slept_ms: u64,
}

/// `GET /`
pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse { message: "ok" })
}

/// `GET /slow?ms=250`
///
/// Holds the request open for `ms` milliseconds (capped at ten seconds),
/// which makes the `in_flight` strategy observable from a client.
#[instrument]
pub async fn slow(Query(params): Query<SlowParams>) -> Json<SlowResponse> {
    let slept_ms = params.ms.min(MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(slept_ms)).await;
    Json(SlowResponse { slept_ms })
}
