//! Rejection policy shared by the server and client decorators.
//!
//! A limiter only knows that capacity ran out. What a caller sees instead
//! (a synthesized `429` response, a custom error, or the bare
//! [`LimitReachedError`]) is decided here.
//!
//! ```rust,ignore
//! let config = RateLimitConfig::new().with_error_callback(|_ctx, _err| {
//!     Ok((StatusCode::SERVICE_UNAVAILABLE, "slow down").into_response())
//! });
//! ```

use std::fmt;
use std::sync::Arc;

use tower::BoxError;

use super::{LimitReachedError, RequestContext};

/// Translates a rejection into the decorator's result type.
pub type ErrorCallback<Res> =
    Arc<dyn Fn(&RequestContext<'_>, LimitReachedError) -> Result<Res, BoxError> + Send + Sync>;

/// Configuration for rate limit decorators.
pub struct RateLimitConfig<Res> {
    error_callback: ErrorCallback<Res>,
}

impl<Res: 'static> RateLimitConfig<Res> {
    /// Create a configuration with the pass-through error policy.
    pub fn new() -> Self {
        Self {
            error_callback: Arc::new(passthrough::<Res>),
        }
    }

    /// Override the rejection callback.
    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestContext<'_>, LimitReachedError) -> Result<Res, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.error_callback = Arc::new(callback);
        self
    }

    /// Apply the configured policy to a rejection.
    pub fn on_limit_reached(
        &self,
        ctx: &RequestContext<'_>,
        err: LimitReachedError,
    ) -> Result<Res, BoxError> {
        (self.error_callback)(ctx, err)
    }
}

fn passthrough<Res>(_: &RequestContext<'_>, err: LimitReachedError) -> Result<Res, BoxError> {
    Err(Box::new(err))
}

impl<Res: 'static> Default for RateLimitConfig<Res> {
    fn default() -> Self {
        Self::new()
    }
}

// Manual impls: a derive would require `Res: Clone` / `Res: Debug`.
impl<Res> Clone for RateLimitConfig<Res> {
    fn clone(&self) -> Self {
        Self {
            error_callback: self.error_callback.clone(),
        }
    }
}

impl<Res> fmt::Debug for RateLimitConfig<Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig").finish_non_exhaustive()
    }
}
