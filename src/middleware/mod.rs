//! HTTP server middleware.
//!
//! - **Rate Limiting**: admission control in front of handlers, backed by any
//!   [`RateLimiter`](crate::rate_limit::RateLimiter)
//!
//! # Architecture
//!
//! ```text
//! Request → Trace → Rate Limiter → Handler → Response
//!                       ↓
//!               429 Too Many Requests
//! ```

pub mod rate_limit;

pub use rate_limit::{RateLimitLayer, RateLimitService};
