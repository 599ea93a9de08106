//! Admission control core.
//!
//! Every limiter implements the same three-step contract used by the
//! decorators in [`crate::middleware`] and [`crate::transport`]:
//!
//! ```text
//! check(ctx) ──Err──► error policy (RateLimitConfig) ──► rejection
//!     │
//!     Ok
//!     ▼
//! begin(ctx) ──► forward request ──► end(ctx)   (end runs on drop)
//! ```
//!
//! # Variants
//!
//! | Limiter              | Frees capacity by          | Background task |
//! |----------------------|----------------------------|-----------------|
//! | [`PeriodicLimiter`]  | full reset every window    | `start`/`stop`  |
//! | [`GateLimiter`]      | full reset every window    | starts in `new` |
//! | [`ContinuousLimiter`]| gradual refill (GCRA)      | none            |
//! | [`InFlightLimiter`]  | `end` of each request      | none            |
//!
//! # Consistency
//!
//! `check` and `begin` are not atomic for the counting limiters. Two callers
//! racing for the last unit of capacity can both pass `check`, so the count
//! may briefly exceed capacity. Callers needing a strict bound use
//! [`PeriodicLimiter::try_acquire`], a single compare-and-increment.
//!
//! Counter state is touched only through atomics. The mutex inside the
//! periodic limiters guards the reset task slot, never the count.

use std::future::Future;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Request, Uri};

pub mod config;
pub mod continuous;
pub mod error;
pub mod gate;
pub mod guard;
pub mod in_flight;
pub mod periodic;

pub use config::{ErrorCallback, RateLimitConfig};
pub use continuous::ContinuousLimiter;
pub use error::{LimitReachedError, LimiterError, REQUEST_LIMIT_REACHED};
pub use gate::GateLimiter;
pub use guard::AdmissionGuard;
pub use in_flight::InFlightLimiter;
pub use periodic::PeriodicLimiter;

/// Borrowed view of the request being admitted.
///
/// The bundled limiters are global and ignore it; keyed limiters can use it
/// to pick a bucket. A detached context carries no request at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext<'a> {
    method: Option<&'a Method>,
    uri: Option<&'a Uri>,
    headers: Option<&'a HeaderMap>,
}

impl<'a> RequestContext<'a> {
    /// Context for admission checks made outside of any request.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Context for a request known only by method and URI.
    pub fn new(method: &'a Method, uri: &'a Uri) -> Self {
        Self {
            method: Some(method),
            uri: Some(uri),
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: &'a HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn method(&self) -> Option<&'a Method> {
        self.method
    }

    pub fn uri(&self) -> Option<&'a Uri> {
        self.uri
    }

    pub fn headers(&self) -> Option<&'a HeaderMap> {
        self.headers
    }
}

impl<'a, B> From<&'a Request<B>> for RequestContext<'a> {
    fn from(req: &'a Request<B>) -> Self {
        Self::new(req.method(), req.uri()).with_headers(req.headers())
    }
}

/// Admission contract implemented by every limiter.
pub trait RateLimiter: Send + Sync {
    /// Decide whether a new unit of work may proceed.
    ///
    /// Counting limiters do not mutate state here.
    fn check(&self, ctx: &RequestContext<'_>) -> Result<(), LimitReachedError>;

    /// Record that a unit of work has started.
    fn begin(&self, ctx: &RequestContext<'_>);

    /// Record that a unit of work has finished, whatever its outcome.
    fn end(&self, ctx: &RequestContext<'_>);
}

impl<T: RateLimiter + ?Sized> RateLimiter for Arc<T> {
    fn check(&self, ctx: &RequestContext<'_>) -> Result<(), LimitReachedError> {
        (**self).check(ctx)
    }

    fn begin(&self, ctx: &RequestContext<'_>) {
        (**self).begin(ctx)
    }

    fn end(&self, ctx: &RequestContext<'_>) {
        (**self).end(ctx)
    }
}

/// Optional capability for limiters that own a background reset task.
pub trait Lifecycle {
    /// Spawn the reset task. Calling it while already running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::NoRuntime`] outside a Tokio runtime.
    fn start(&self) -> Result<(), LimiterError>;

    /// Cancel the reset task and wait for it to exit.
    ///
    /// Returns immediately when no task is running, so it is safe on a
    /// never-started limiter and safe to call repeatedly.
    fn stop(&self) -> impl Future<Output = ()> + Send;

    /// Whether a reset task is currently owned by this limiter.
    fn is_running(&self) -> bool;
}
