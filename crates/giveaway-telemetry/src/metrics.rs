//! Prometheus metrics for procedures.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `giveaway_procedure_calls_total` | Counter | `procedure`, `outcome` | Completed invocations |
//! | `giveaway_procedure_duration_seconds` | Histogram | `procedure` | Invocation latency |
//! | `giveaway_procedures_in_flight` | Gauge | - | Invocations currently running |
//! | `giveaway_cache_invalidations_total` | Counter | `result` | Cache tags invalidated |
//! | `giveaway_http_requests_total` | Counter | `route`, `status` | HTTP requests served |
//!
//! `outcome` is `ok` or the failure code (`UNAUTHORIZED`, `CONFLICT`, ...).
//! Without an installed recorder every recording function is a no-op.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use giveaway_core::ErrorCode;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle used to render the `/metrics` page.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const CALLS_TOTAL: &str = "giveaway_procedure_calls_total";
const DURATION_SECONDS: &str = "giveaway_procedure_duration_seconds";
const IN_FLIGHT: &str = "giveaway_procedures_in_flight";
const INVALIDATIONS_TOTAL: &str = "giveaway_cache_invalidations_total";
const HTTP_REQUESTS_TOTAL: &str = "giveaway_http_requests_total";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for procedure duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// Rendering happens through [`render_metrics`]; no listener is started here.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a recorder is already installed
/// or the bucket list is empty.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialised.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(CALLS_TOTAL, "Total procedure invocations by outcome");
    describe_histogram!(DURATION_SECONDS, "Procedure invocation duration in seconds");
    describe_gauge!(IN_FLIGHT, "Procedure invocations currently running");
    describe_counter!(
        INVALIDATIONS_TOTAL,
        "Cache tag invalidations by result (ok, error)"
    );
    describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests served by route and status");
}

/// Returns the `outcome` label for a finished invocation.
#[must_use]
pub fn outcome_label(code: Option<ErrorCode>) -> &'static str {
    code.map_or("ok", |code| code.as_str())
}

/// Records a finished procedure invocation.
pub fn record_procedure_call(procedure: &str, code: Option<ErrorCode>, duration: Duration) {
    counter!(
        CALLS_TOTAL,
        "procedure" => procedure.to_string(),
        "outcome" => outcome_label(code)
    )
    .increment(1);

    histogram!(DURATION_SECONDS, "procedure" => procedure.to_string())
        .record(duration.as_secs_f64());
}

/// Records one cache tag invalidation attempt.
pub fn record_cache_invalidation(success: bool) {
    counter!(
        INVALIDATIONS_TOTAL,
        "result" => if success { "ok" } else { "error" }
    )
    .increment(1);
}

/// Records an HTTP request served by the procedure server.
pub fn record_http_request(route: &str, status: u16) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Keeps the in-flight gauge raised until dropped.
///
/// The gauge is lowered even if the invocation unwinds.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Raises the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(config.duration_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(None), "ok");
        assert_eq!(outcome_label(Some(ErrorCode::Conflict)), "CONFLICT");
        assert_eq!(
            outcome_label(Some(ErrorCode::InternalServerError)),
            "INTERNAL_SERVER_ERROR"
        );
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_procedure_call("createTeam", None, Duration::from_millis(3));
        record_procedure_call("createTeam", Some(ErrorCode::Unauthorized), Duration::ZERO);
        record_cache_invalidation(true);
        record_cache_invalidation(false);
        record_http_request("/procedures/createTeam", 200);
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_disabled_metrics_is_noop() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }
}
