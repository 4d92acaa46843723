//! Structured logging for Giveaway services.
//!
//! Installs a `tracing-subscriber` registry with either JSON output
//! (production) or pretty output (development). Every procedure invocation
//! runs inside a `procedure` span carrying the fields in [`fields`].
//!
//! # Example
//!
//! ```rust,ignore
//! use giveaway_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(procedure = "createTeam", "registered");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. `"info"`, `"giveaway_procedure=debug,hyper=warn"`).
    pub level: String,

    /// Whether to output JSON.
    pub json_format: bool,

    /// Whether to log span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

/// Installs the global log subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// Standard log field names.
pub mod fields {
    /// Procedure name.
    pub const PROCEDURE: &str = "procedure";

    /// Per-invocation request ID.
    pub const REQUEST_ID: &str = "request_id";

    /// Caller, as `user:{id}`. Never an email address.
    pub const USER: &str = "user";

    /// Failure code.
    pub const CODE: &str = "code";

    /// Duration in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";

    /// Error detail (server-side only).
    pub const ERROR: &str = "error";

    /// Cache tag.
    pub const TAG: &str = "tag";

    /// HTTP method.
    pub const HTTP_METHOD: &str = "http.method";

    /// HTTP path.
    pub const HTTP_PATH: &str = "http.path";

    /// HTTP status code.
    pub const HTTP_STATUS: &str = "http.status_code";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_filter_directives() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("giveaway_procedure=debug,hyper=warn").is_ok());
        assert!(create_env_filter("giveaway=notalevel").is_err());
    }

    #[test]
    fn test_disabled_logging_is_noop() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let parsed = serde_json::from_value::<LogConfig>(serde_json::json!({ "colour": true }));
        assert!(parsed.is_err());

        let parsed: LogConfig =
            serde_json::from_value(serde_json::json!({ "level": "warn" })).expect("partial config");
        assert_eq!(parsed.level, "warn");
        assert!(parsed.json_format);
    }
}
