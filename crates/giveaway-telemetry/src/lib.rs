//! Observability for Giveaway services.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus-format counters and histograms via the `metrics` crate
//!
//! # Example
//!
//! ```rust,ignore
//! use giveaway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::default())?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initialises logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::debug!(
        json = config.logging.json_format,
        metrics = config.metrics.enabled,
        "telemetry initialised"
    );
    Ok(())
}
