//! Errors produced by the admission-control core.
//!
//! Only [`LimitReachedError`] is an admission outcome. [`LimiterError`] covers
//! construction and reset-task lifecycle and never surfaces per request.

use thiserror::Error;

/// Message carried by [`LimitReachedError`].
pub const REQUEST_LIMIT_REACHED: &str = "request limit reached";

/// No capacity is currently available.
///
/// Carries no data, so it is `Copy` and cheap to hand to error callbacks.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("request limit reached")]
pub struct LimitReachedError;

/// Error type for limiter construction and lifecycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    /// A reset timer cannot tick with a zero period.
    #[error("window must be greater than zero")]
    ZeroWindow,

    /// The continuous-refill limiter needs at least one token of burst.
    #[error("capacity must be greater than zero for a continuous-refill limiter")]
    ZeroCapacity,

    /// The continuous-refill limiter needs at least one nanosecond per token.
    #[error("window must be at least {capacity}ns to refill {capacity} tokens")]
    WindowTooShort { capacity: u32 },

    /// A reset task was requested outside a Tokio runtime.
    #[error("no Tokio runtime available to run the reset task")]
    NoRuntime,
}
