//! Server-side rate limiting middleware.
//!
//! # Flow
//!
//! ```text
//! Request ──► limiter.check ──Err──► error policy ──Ok(resp)──► resp
//!                 │                        └──Err(e)──► 429 Too Many Requests, body = e
//!                 Ok
//!                 ▼
//!            AdmissionGuard::begin ──► inner service ──► guard dropped (end)
//! ```
//!
//! With the default policy every rejection becomes a `429` whose body is
//! `request limit reached`. A custom callback can build any response instead.
//!
//! The limiter is shared, not per client: all requests through one layer
//! draw from the same capacity.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{trace, warn};

use crate::metrics::{self, Side};
use crate::rate_limit::{AdmissionGuard, RateLimitConfig, RateLimiter, RequestContext};

/// Rate limiting layer for Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(GateLimiter::new(Duration::from_secs(1), 100)?);
/// let app = Router::new()
///     .route("/api", get(handler))
///     .layer(RateLimitLayer::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<dyn RateLimiter>,
    config: RateLimitConfig<Response<Body>>,
}

impl RateLimitLayer {
    /// Layer using the default rejection policy.
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self::with_config(limiter, RateLimitConfig::new())
    }

    /// Layer using a custom rejection policy.
    pub fn with_config(
        limiter: Arc<dyn RateLimiter>,
        config: RateLimitConfig<Response<Body>>,
    ) -> Self {
        Self { limiter, config }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<dyn RateLimiter>,
    config: RateLimitConfig<Response<Body>>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let ctx = RequestContext::from(&req);

        if let Err(err) = self.limiter.check(&ctx) {
            metrics::record_rejected(Side::Server);
            warn!(
                method = %req.method(),
                path = %req.uri().path(),
                "Rate limit exceeded"
            );

            let response = match self.config.on_limit_reached(&ctx, err) {
                Ok(response) => response,
                Err(e) => (StatusCode::TOO_MANY_REQUESTS, e.to_string()).into_response(),
            };
            return Box::pin(async move { Ok(response) });
        }

        let guard = AdmissionGuard::begin(self.limiter.clone(), &ctx);
        metrics::record_admitted(Side::Server);
        trace!(path = %req.uri().path(), "Request admitted");

        // Call the service that `poll_ready` prepared; keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move {
            // Held until the inner future resolves or is dropped.
            let _guard = guard;
            inner.call(req).await
        })
    }
}
