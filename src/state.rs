//! Shared application state for Axum handlers.
//!
//! Holds the runtime configuration and the limiter selected by
//! `RATE_LIMIT_STRATEGY`. The state is cloned into every handler; the
//! limiter itself is shared through an `Arc`, so all clones draw from the
//! same capacity.
//!
//! # Lifecycle
//!
//! Periodic and gate limiters own a background reset task. Call
//! [`AppState::shutdown`] once the server has stopped to end it cleanly.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, RateLimitStrategy};
use crate::error::AppResult;
use crate::rate_limit::{
    ContinuousLimiter, GateLimiter, InFlightLimiter, Lifecycle, PeriodicLimiter, RateLimiter,
};
use crate::utils::duration_millis;

/// Concrete limiter behind the API routes.
///
/// Kept as an enum rather than a bare `Arc<dyn RateLimiter>` so that
/// lifecycle control and statistics stay reachable.
#[derive(Debug, Clone)]
pub enum LimiterHandle {
    Periodic(Arc<PeriodicLimiter>),
    Gate(Arc<GateLimiter>),
    Continuous(Arc<ContinuousLimiter>),
    InFlight(Arc<InFlightLimiter>),
}

/// Point-in-time view of the limiter for `/stats`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub strategy: String,
    pub capacity: u32,
    /// Window in milliseconds; absent for `in_flight`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_ms: Option<u64>,
    /// Units counted in the current window, or requests in flight.
    /// Absent for `continuous`, which keeps no counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_use: Option<u64>,
    pub running: bool,
}

impl LimiterHandle {
    /// Build and, where needed, start the limiter described by `config`.
    ///
    /// Returns `Ok(None)` when rate limiting is disabled. Must be called
    /// from within a Tokio runtime for the periodic and gate strategies.
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let window = config.rate_limit_window;
        let capacity = config.rate_limit_capacity;

        let handle = match config.rate_limit_strategy {
            RateLimitStrategy::Disabled => return Ok(None),
            RateLimitStrategy::Periodic => {
                let limiter = PeriodicLimiter::new(window, capacity)?;
                limiter.start()?;
                Self::Periodic(Arc::new(limiter))
            }
            RateLimitStrategy::Gate => Self::Gate(Arc::new(GateLimiter::new(window, capacity)?)),
            RateLimitStrategy::Continuous => {
                Self::Continuous(Arc::new(ContinuousLimiter::new(window, capacity)?))
            }
            RateLimitStrategy::InFlight => Self::InFlight(Arc::new(InFlightLimiter::new(capacity))),
        };

        Ok(Some(handle))
    }

    /// The limiter as a trait object, ready for the middleware layer.
    pub fn limiter(&self) -> Arc<dyn RateLimiter> {
        match self {
            Self::Periodic(l) => l.clone(),
            Self::Gate(l) => l.clone(),
            Self::Continuous(l) => l.clone(),
            Self::InFlight(l) => l.clone(),
        }
    }

    pub fn strategy(&self) -> RateLimitStrategy {
        match self {
            Self::Periodic(_) => RateLimitStrategy::Periodic,
            Self::Gate(_) => RateLimitStrategy::Gate,
            Self::Continuous(_) => RateLimitStrategy::Continuous,
            Self::InFlight(_) => RateLimitStrategy::InFlight,
        }
    }

    /// False only when a reset-driven limiter has lost its reset task.
    pub fn is_running(&self) -> bool {
        match self {
            Self::Periodic(l) => l.is_running(),
            Self::Gate(l) => l.is_running(),
            Self::Continuous(_) | Self::InFlight(_) => true,
        }
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        let (capacity, window, in_use) = match self {
            Self::Periodic(l) => (l.capacity(), Some(l.window()), Some(l.count())),
            Self::Gate(l) => (l.capacity(), Some(l.window()), Some(l.count())),
            Self::Continuous(l) => (l.capacity(), Some(l.window()), None),
            Self::InFlight(l) => (l.capacity(), None, Some(l.in_flight())),
        };

        LimiterSnapshot {
            strategy: self.strategy().to_string(),
            capacity,
            window_ms: window.map(duration_millis),
            in_use,
            running: self.is_running(),
        }
    }

    /// Stop the reset task, if this limiter has one.
    pub async fn stop(&self) {
        match self {
            Self::Periodic(l) => l.stop().await,
            Self::Gate(l) => l.stop().await,
            Self::Continuous(_) | Self::InFlight(_) => {}
        }
    }
}

/// Shared application state for Axum handlers.
///
/// # Lifecycle
///
/// ```rust,ignore
/// let state = AppState::new(config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Application configuration
    pub config: Arc<Config>,
    limiter: Option<LimiterHandle>,
}

impl AppState {
    /// Create application state, building the configured limiter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Limiter` if the limiter parameters are invalid or
    /// no Tokio runtime is available to drive the reset task.
    pub fn new(config: Config) -> AppResult<Self> {
        let limiter = LimiterHandle::from_config(&config)?;

        match &limiter {
            Some(handle) => info!(
                strategy = %handle.strategy(),
                capacity = config.rate_limit_capacity,
                window_ms = duration_millis(config.rate_limit_window),
                "Rate limiter initialized"
            ),
            None => info!("Rate limiting disabled"),
        }

        Ok(Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            limiter,
        })
    }

    pub fn limiter(&self) -> Option<&LimiterHandle> {
        self.limiter.as_ref()
    }

    /// Stop limiter background tasks.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(handle) = &self.limiter {
            debug!(strategy = %handle.strategy(), "Stopping rate limiter");
            handle.stop().await;
        }
        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(strategy: RateLimitStrategy) -> Config {
        Config {
            rate_limit_strategy: strategy,
            rate_limit_window: Duration::from_millis(250),
            rate_limit_capacity: 5,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_has_no_limiter() {
        let state = AppState::new(config(RateLimitStrategy::Disabled)).unwrap();
        assert!(state.limiter().is_none());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_periodic_is_started() {
        let state = AppState::new(config(RateLimitStrategy::Periodic)).unwrap();
        let handle = state.limiter().unwrap();

        assert_eq!(handle.strategy(), RateLimitStrategy::Periodic);
        assert!(handle.is_running());

        state.shutdown().await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_shutdown_twice() {
        let state = AppState::new(config(RateLimitStrategy::Gate)).unwrap();
        state.shutdown().await;
        state.shutdown().await;
        assert!(!state.limiter().unwrap().is_running());
    }

    #[test]
    fn test_gate_outside_runtime_fails() {
        let result = AppState::new(config(RateLimitStrategy::Gate));
        assert!(matches!(result, Err(crate::error::AppError::Limiter(_))));
    }

    #[tokio::test]
    async fn test_snapshot_fields() {
        let state = AppState::new(config(RateLimitStrategy::InFlight)).unwrap();
        let snapshot = state.limiter().unwrap().snapshot();

        assert_eq!(snapshot.strategy, "in_flight");
        assert_eq!(snapshot.capacity, 5);
        assert_eq!(snapshot.window_ms, None);
        assert_eq!(snapshot.in_use, Some(0));
        assert!(snapshot.running);

        let state = AppState::new(config(RateLimitStrategy::Continuous)).unwrap();
        let snapshot = state.limiter().unwrap().snapshot();
        assert_eq!(snapshot.window_ms, Some(250));
        assert_eq!(snapshot.in_use, None);
    }

    #[tokio::test]
    async fn test_limiter_shared_between_clones() {
        let state = AppState::new(config(RateLimitStrategy::Periodic)).unwrap();
        let clone = state.clone();

        let ctx = crate::rate_limit::RequestContext::detached();
        state.limiter().unwrap().limiter().begin(&ctx);

        assert_eq!(clone.limiter().unwrap().snapshot().in_use, Some(1));
        state.shutdown().await;
    }
}
