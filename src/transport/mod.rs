//! Decorators for outgoing HTTP transports.

pub mod rate_limit;

pub use rate_limit::{RateLimitClient, RateLimitClientLayer};
