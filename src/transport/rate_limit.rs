//! Client-side rate limiting for outgoing requests.
//!
//! Wraps any Tower service that sends `Request<B>` (an HTTP client, a
//! connection pool, another layer stack) and refuses to forward once the
//! limiter reports no capacity.
//!
//! On rejection the error policy's result is returned as-is: `Ok(response)`
//! reaches the caller as a normal response, `Err(e)` as the service error.
//! The default policy yields [`LimitReachedError`](crate::rate_limit::LimitReachedError),
//! recoverable with `err.downcast_ref::<LimitReachedError>()`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::Request;
use tower::{BoxError, Layer, Service};
use tracing::{debug, trace};

use crate::metrics::{self, Side};
use crate::rate_limit::{AdmissionGuard, RateLimitConfig, RateLimiter, RequestContext};

/// Layer adding admission control in front of an outgoing transport.
///
/// `Res` is the wrapped service's response type; the error policy must
/// produce the same type.
///
/// # Example
///
/// ```rust,ignore
/// let client = ServiceBuilder::new()
///     .layer(RateLimitClientLayer::new(limiter))
///     .service(http_client);
/// ```
pub struct RateLimitClientLayer<Res> {
    limiter: Arc<dyn RateLimiter>,
    config: RateLimitConfig<Res>,
}

impl<Res: 'static> RateLimitClientLayer<Res> {
    /// Layer using the pass-through rejection policy.
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self::with_config(limiter, RateLimitConfig::new())
    }
}

impl<Res> RateLimitClientLayer<Res> {
    pub fn with_config(limiter: Arc<dyn RateLimiter>, config: RateLimitConfig<Res>) -> Self {
        Self { limiter, config }
    }
}

impl<Res> Clone for RateLimitClientLayer<Res> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}

impl<Res> fmt::Debug for RateLimitClientLayer<Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitClientLayer").finish_non_exhaustive()
    }
}

impl<S, Res> Layer<S> for RateLimitClientLayer<Res> {
    type Service = RateLimitClient<S, Res>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitClient {
            inner,
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}

/// Rate limited transport wrapper.
pub struct RateLimitClient<S, Res> {
    inner: S,
    limiter: Arc<dyn RateLimiter>,
    config: RateLimitConfig<Res>,
}

impl<S: Clone, Res> Clone for RateLimitClient<S, Res> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, B, Res> Service<Request<B>> for RateLimitClient<S, Res>
where
    S: Service<Request<B>, Response = Res> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    B: Send + 'static,
    Res: Send + 'static,
{
    type Response = Res;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Res, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let ctx = RequestContext::from(&req);

        if let Err(err) = self.limiter.check(&ctx) {
            metrics::record_rejected(Side::Client);
            debug!(
                method = %req.method(),
                uri = %req.uri(),
                "Outgoing request rejected by rate limiter"
            );

            let result = self.config.on_limit_reached(&ctx, err);
            return Box::pin(async move { result });
        }

        let guard = AdmissionGuard::begin(self.limiter.clone(), &ctx);
        metrics::record_admitted(Side::Client);
        trace!(uri = %req.uri(), "Outgoing request admitted");

        // Call the service that `poll_ready` prepared; keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move {
            let _guard = guard;
            inner.call(req).await.map_err(Into::into)
        })
    }
}
