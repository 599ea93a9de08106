//! Concurrency limiter: caps requests in flight rather than requests per window.
//!
//! `begin` takes a slot and `end` gives it back, so this is the one limiter
//! where the `end` half of the contract frees capacity.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use super::{LimitReachedError, RateLimiter, RequestContext};
use crate::metrics;

/// Decrement-based limiter allowing at most `capacity` concurrent units.
#[derive(Debug)]
pub struct InFlightLimiter {
    capacity: u32,
    in_flight: AtomicU64,
}

impl InFlightLimiter {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            in_flight: AtomicU64::new(0),
        }
    }

    /// Units currently between `begin` and `end`.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl RateLimiter for InFlightLimiter {
    fn check(&self, _ctx: &RequestContext<'_>) -> Result<(), LimitReachedError> {
        if self.in_flight() >= u64::from(self.capacity) {
            return Err(LimitReachedError);
        }
        Ok(())
    }

    fn begin(&self, _ctx: &RequestContext<'_>) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::set_in_flight(now);
    }

    fn end(&self, _ctx: &RequestContext<'_>) {
        // Saturate so an unbalanced `end` cannot wrap the counter.
        match self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => metrics::set_in_flight(previous - 1),
            Err(_) => warn!("end() called with no unit in flight"),
        }
    }
}
