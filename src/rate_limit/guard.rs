//! Drop guard pairing every `begin` with an `end`.
//!
//! Decorators create the guard right after a successful `check` and move it
//! into the response future. `end` then runs when the request completes,
//! fails, or the future is dropped mid-flight.

use std::sync::Arc;

use axum::http::{Method, Uri};

use super::{RateLimiter, RequestContext};

/// Holds one admitted unit of work; releases it on drop.
#[must_use = "dropping the guard immediately ends the unit of work"]
pub struct AdmissionGuard {
    limiter: Arc<dyn RateLimiter>,
    method: Option<Method>,
    uri: Option<Uri>,
}

impl AdmissionGuard {
    /// Call `begin` on `limiter` and return the guard that will call `end`.
    ///
    /// Method and URI are copied so `end` sees the same request target as
    /// `begin` after the request itself has been handed off.
    pub fn begin(limiter: Arc<dyn RateLimiter>, ctx: &RequestContext<'_>) -> Self {
        limiter.begin(ctx);
        Self {
            limiter,
            method: ctx.method().cloned(),
            uri: ctx.uri().cloned(),
        }
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        let ctx = match (&self.method, &self.uri) {
            (Some(method), Some(uri)) => RequestContext::new(method, uri),
            _ => RequestContext::detached(),
        };
        self.limiter.end(&ctx);
    }
}
