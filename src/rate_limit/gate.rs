//! Error-returning admission gate.
//!
//! Same periodic-reset counter as [`PeriodicLimiter`](super::PeriodicLimiter),
//! but the admission check answers with a `Result` and the reset task is
//! started by the constructor. There is no public `start`; `stop` releases
//! the task.

use std::time::Duration;

use super::periodic::ResetCounter;
use super::{LimitReachedError, LimiterError, RateLimiter, RequestContext};

/// Periodic-reset limiter with an `allow`/`inc`/`dec` surface.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use httpware::rate_limit::{GateLimiter, RequestContext};
///
/// # async fn run() -> Result<(), httpware::rate_limit::LimiterError> {
/// let gate = GateLimiter::new(Duration::from_secs(1), 10)?;
/// let ctx = RequestContext::detached();
///
/// if gate.allow(&ctx).is_ok() {
///     gate.inc(&ctx);
///     // ... do the work ...
///     gate.dec(&ctx);
/// }
///
/// gate.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct GateLimiter {
    counter: ResetCounter,
}

impl GateLimiter {
    /// Create the gate and start its reset task.
    ///
    /// # Errors
    ///
    /// - [`LimiterError::ZeroWindow`] if `window` is zero
    /// - [`LimiterError::NoRuntime`] when called outside a Tokio runtime
    pub fn new(window: Duration, capacity: u32) -> Result<Self, LimiterError> {
        let counter = ResetCounter::new(window, capacity)?;
        counter.start()?;
        Ok(Self { counter })
    }

    /// `Err(LimitReachedError)` when the count is at or above capacity.
    ///
    /// Does not count the request; call [`inc`](Self::inc) once admitted.
    pub fn allow(&self, _ctx: &RequestContext<'_>) -> Result<(), LimitReachedError> {
        if self.counter.is_limit_reached() {
            return Err(LimitReachedError);
        }
        Ok(())
    }

    pub fn inc(&self, _ctx: &RequestContext<'_>) {
        self.counter.inc();
    }

    /// No-op: the reset task frees capacity, not completions.
    pub fn dec(&self, _ctx: &RequestContext<'_>) {}

    /// Cancel the reset task and wait for it to exit. Safe to repeat.
    pub async fn stop(&self) {
        self.counter.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.counter.is_running()
    }

    pub fn count(&self) -> u64 {
        self.counter.count()
    }

    pub fn capacity(&self) -> u32 {
        self.counter.capacity()
    }

    pub fn window(&self) -> Duration {
        self.counter.window()
    }
}

impl RateLimiter for GateLimiter {
    fn check(&self, ctx: &RequestContext<'_>) -> Result<(), LimitReachedError> {
        self.allow(ctx)
    }

    fn begin(&self, ctx: &RequestContext<'_>) {
        self.inc(ctx);
    }

    fn end(&self, ctx: &RequestContext<'_>) {
        self.dec(ctx);
    }
}

impl std::fmt::Debug for GateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateLimiter")
            .field("capacity", &self.capacity())
            .field("window", &self.window())
            .field("count", &self.count())
            .field("running", &self.is_running())
            .finish()
    }
}
