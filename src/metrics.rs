//! Prometheus metrics for admission control.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `httpware_rate_limit_admitted_total` - Requests that passed the admission check (label: side)
//! - `httpware_rate_limit_rejected_total` - Requests rejected by a limiter (label: side)
//! - `httpware_rate_limit_resets_total` - Periodic counter resets
//!
//! ## Gauges
//! - `httpware_rate_limit_in_flight` - Units held by the in-flight limiter
//!
//! The `side` label is `server` for the middleware and `client` for the
//! transport decorator.
//!
//! Recording functions are safe to call before (or without) [`init_metrics`];
//! the `metrics` facade drops samples when no recorder is installed.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const RATE_LIMIT_ADMITTED_TOTAL: &str = "httpware_rate_limit_admitted_total";
    pub const RATE_LIMIT_REJECTED_TOTAL: &str = "httpware_rate_limit_rejected_total";
    pub const RATE_LIMIT_RESETS_TOTAL: &str = "httpware_rate_limit_resets_total";
    pub const RATE_LIMIT_IN_FLIGHT: &str = "httpware_rate_limit_in_flight";
}

/// Which decorator made the admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

impl Side {
    fn as_str(self) -> &'static str {
        match self {
            Side::Server => "server",
            Side::Client => "client",
        }
    }
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (e.g. the port is
/// taken or a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::RATE_LIMIT_ADMITTED_TOTAL,
        "Total number of requests admitted by a rate limiter"
    );
    describe_counter!(
        names::RATE_LIMIT_REJECTED_TOTAL,
        "Total number of requests rejected by a rate limiter"
    );
    describe_counter!(
        names::RATE_LIMIT_RESETS_TOTAL,
        "Total number of periodic admission counter resets"
    );
    describe_gauge!(
        names::RATE_LIMIT_IN_FLIGHT,
        "Units currently held by the in-flight limiter"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_admitted(side: Side) {
    counter!(names::RATE_LIMIT_ADMITTED_TOTAL, "side" => side.as_str()).increment(1);
}

pub fn record_rejected(side: Side) {
    counter!(names::RATE_LIMIT_REJECTED_TOTAL, "side" => side.as_str()).increment(1);
}

pub fn record_counter_reset() {
    counter!(names::RATE_LIMIT_RESETS_TOTAL).increment(1);
}

pub fn set_in_flight(units: u64) {
    gauge!(names::RATE_LIMIT_IN_FLIGHT).set(units as f64);
}
