//! # httpware
//!
//! Admission control for HTTP stacks built on Tower and Axum.
//!
//! A [`RateLimiter`](rate_limit::RateLimiter) decides whether a unit of work
//! may start. Two decorators put one in front of real traffic:
//!
//! - [`RateLimitLayer`](middleware::RateLimitLayer) guards incoming requests
//!   and answers rejections with `429 Too Many Requests`
//! - [`RateLimitClientLayer`](transport::RateLimitClientLayer) guards
//!   outgoing requests sent through any Tower service
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Decorators (server middleware, client transport)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RateLimiter contract (check → begin → end)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Limiters (periodic, gate, continuous, in-flight)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tokio reset task / governor GCRA / atomic counters         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remaining modules make up a small demo server that wires a limiter
//! chosen by environment variables in front of a couple of endpoints.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use axum::{Router, routing::get};
//! use httpware::middleware::RateLimitLayer;
//! use httpware::rate_limit::GateLimiter;
//!
//! # async fn run() -> Result<(), httpware::rate_limit::LimiterError> {
//! let limiter = Arc::new(GateLimiter::new(Duration::from_secs(1), 100)?);
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .layer(RateLimitLayer::new(limiter.clone()));
//!
//! // ... serve `app` ...
//!
//! limiter.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod transport;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, RateLimitStrategy};
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::{AppState, LimiterHandle};
