//! Continuous-refill limiter backed by the Governor crate.
//!
//! Governor implements GCRA, which behaves like a token bucket refilled
//! smoothly: `capacity` tokens accrue per `window`, one every
//! `window / capacity`, with a burst of `capacity`. Throughput is smoother
//! than with hard periodic resets and no background task is needed.
//!
//! The refill period is truncated to whole nanoseconds, so the effective
//! rate can be marginally above `capacity` per `window`. A window shorter
//! than one nanosecond per token is rejected.
//!
//! Governor has no side-effect-free probe, so the admission check consumes
//! the token itself. For this limiter `check` is an atomic reserve and
//! `begin`/`end` do nothing.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};

use super::{LimitReachedError, LimiterError, RateLimiter, RequestContext};

/// Unkeyed GCRA limiter admitting `capacity` units per `window`.
pub struct ContinuousLimiter {
    limiter: DefaultDirectRateLimiter,
    capacity: NonZeroU32,
    window: Duration,
}

impl ContinuousLimiter {
    /// # Errors
    ///
    /// - [`LimiterError::ZeroWindow`] if `window` is zero
    /// - [`LimiterError::ZeroCapacity`] if `capacity` is zero
    /// - [`LimiterError::WindowTooShort`] if `window` holds fewer
    ///   nanoseconds than `capacity`
    pub fn new(window: Duration, capacity: u32) -> Result<Self, LimiterError> {
        if window.is_zero() {
            return Err(LimiterError::ZeroWindow);
        }
        let capacity = NonZeroU32::new(capacity).ok_or(LimiterError::ZeroCapacity)?;

        if window.as_nanos() < u128::from(capacity.get()) {
            return Err(LimiterError::WindowTooShort {
                capacity: capacity.get(),
            });
        }

        let period = window / capacity.get();
        let quota = Quota::with_period(period)
            .ok_or(LimiterError::ZeroWindow)?
            .allow_burst(capacity);

        Ok(Self {
            limiter: governor::RateLimiter::direct(quota),
            capacity,
            window,
        })
    }

    /// Try to take a token; `true` when none is available.
    pub fn is_limit_reached(&self) -> bool {
        self.limiter.check().is_err()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity.get()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl RateLimiter for ContinuousLimiter {
    fn check(&self, _ctx: &RequestContext<'_>) -> Result<(), LimitReachedError> {
        if self.is_limit_reached() {
            return Err(LimitReachedError);
        }
        Ok(())
    }

    fn begin(&self, _ctx: &RequestContext<'_>) {}

    fn end(&self, _ctx: &RequestContext<'_>) {}
}

impl std::fmt::Debug for ContinuousLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuousLimiter")
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_parameters() {
        assert!(matches!(
            ContinuousLimiter::new(Duration::ZERO, 1),
            Err(LimiterError::ZeroWindow)
        ));
        assert!(matches!(
            ContinuousLimiter::new(Duration::from_secs(1), 0),
            Err(LimiterError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_limit_reached_then_refilled() {
        let limiter = ContinuousLimiter::new(Duration::from_millis(1), 1).unwrap();

        assert!(!limiter.is_limit_reached());
        assert!(limiter.is_limit_reached());

        std::thread::sleep(Duration::from_millis(2));
        assert!(!limiter.is_limit_reached());
    }

    #[test]
    fn test_burst_equals_capacity() {
        let limiter = ContinuousLimiter::new(Duration::from_secs(60), 3).unwrap();
        let ctx = RequestContext::detached();

        for _ in 0..3 {
            assert!(limiter.check(&ctx).is_ok());
        }
        assert_eq!(limiter.check(&ctx), Err(LimitReachedError));
    }

    #[test]
    fn test_window_shorter_than_capacity_rejected() {
        assert_eq!(
            ContinuousLimiter::new(Duration::from_nanos(9), 10).unwrap_err(),
            LimiterError::WindowTooShort { capacity: 10 }
        );
    }

    #[test]
    fn test_one_nanosecond_per_token_accepted() {
        let limiter = ContinuousLimiter::new(Duration::from_nanos(10), 10).unwrap();
        assert_eq!(limiter.capacity(), 10);
        assert_eq!(limiter.window(), Duration::from_nanos(10));
    }
}
