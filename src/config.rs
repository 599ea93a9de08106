//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. A `.env` file is honoured when present.
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_STRATEGY`: `periodic`, `gate`, `continuous`, `in_flight` or
//!   `disabled` (default: `gate`)
//! - `RATE_LIMIT_WINDOW_MS`: Window length in milliseconds (default: 1000)
//! - `RATE_LIMIT_CAPACITY`: Units admitted per window, or concurrent units for
//!   `in_flight` (default: 100)
//!
//! # Observability
//!
//! - `RUST_LOG`: Log filter, read by the tracing subscriber (default: `info`)
//! - `METRICS_PORT`: Prometheus endpoint port, 0 disables it (default: 9090)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Which limiter guards the API routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStrategy {
    /// No admission control.
    Disabled,
    /// Periodic-reset counter with explicit start/stop.
    Periodic,
    /// Periodic-reset gate started at construction.
    Gate,
    /// Continuous-refill (GCRA) limiter.
    Continuous,
    /// Cap on concurrent requests.
    InFlight,
}

impl RateLimitStrategy {
    /// Whether the strategy is driven by `RATE_LIMIT_WINDOW_MS`.
    pub fn uses_window(self) -> bool {
        matches!(self, Self::Periodic | Self::Gate | Self::Continuous)
    }
}

impl FromStr for RateLimitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "periodic" => Ok(Self::Periodic),
            "gate" => Ok(Self::Gate),
            "continuous" => Ok(Self::Continuous),
            "in_flight" | "in-flight" => Ok(Self::InFlight),
            other => Err(format!(
                "unknown strategy '{other}' (expected periodic, gate, continuous, in_flight or disabled)"
            )),
        }
    }
}

impl fmt::Display for RateLimitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::Periodic => "periodic",
            Self::Gate => "gate",
            Self::Continuous => "continuous",
            Self::InFlight => "in_flight",
        };
        f.write_str(name)
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    pub rate_limit_strategy: RateLimitStrategy,

    /// Window between counter resets, or the refill window for `continuous`
    pub rate_limit_window: Duration,

    /// Units admitted per window (concurrent units for `in_flight`)
    pub rate_limit_capacity: u32,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a value fails to parse or the
    /// combination is invalid (e.g. a zero window).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            rate_limit_strategy: Self::parse_env("RATE_LIMIT_STRATEGY", RateLimitStrategy::Gate)?,
            rate_limit_window: Duration::from_millis(Self::parse_env(
                "RATE_LIMIT_WINDOW_MS",
                1000,
            )?),
            rate_limit_capacity: Self::parse_env("RATE_LIMIT_CAPACITY", 100)?,

            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        let strategy = self.rate_limit_strategy;

        if strategy.uses_window() && self.rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(format!(
                "RATE_LIMIT_WINDOW_MS must be greater than 0 for the {strategy} strategy"
            )));
        }

        if strategy == RateLimitStrategy::Continuous && self.rate_limit_capacity == 0 {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_CAPACITY must be greater than 0 for the continuous strategy"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address, or `None` when disabled.
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            rate_limit_strategy: RateLimitStrategy::Gate,
            rate_limit_window: Duration::from_secs(1),
            rate_limit_capacity: 100,
            metrics_port: 9090,
        }
    }
}
