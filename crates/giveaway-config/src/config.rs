//! The root configuration type.

use std::collections::HashSet;
use std::net::SocketAddr;

use giveaway_procedure::TagCacheConfig;
use giveaway_telemetry::{create_env_filter, LogConfig, MetricsConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ServerConfig, SessionsConfig};

/// Complete Giveaway server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use giveaway_config::GiveawayConfig;
///
/// let config = GiveawayConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GiveawayConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Session resolution settings.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Cache-tag bookkeeping settings.
    #[serde(default)]
    pub cache: TagCacheConfig,
}

impl GiveawayConfig {
    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_connections",
                "must be greater than 0",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than 0",
            ));
        }

        if self.logging.enabled {
            if let Err(err) = create_env_filter(&self.logging.level) {
                return Err(ConfigError::invalid_value("logging.level", err.to_string()));
            }
        }

        let header = self.sessions.token_header.trim();
        if header.is_empty() || !header.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(ConfigError::invalid_value(
                "sessions.token_header",
                "must be a non-empty header name",
            ));
        }
        if self.sessions.session_ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "sessions.session_ttl_secs",
                "must be greater than 0",
            ));
        }
        let mut seen = HashSet::new();
        for token in &self.sessions.tokens {
            if token.token.is_empty() || token.user_id.is_empty() {
                return Err(ConfigError::validation_error(
                    "sessions.tokens entries need a token and a user_id",
                ));
            }
            if !seen.insert(token.token.as_str()) {
                return Err(ConfigError::validation_error(format!(
                    "sessions.tokens: duplicate token for user {}",
                    token.user_id
                )));
            }
        }

        if self.cache.max_tags == 0 {
            return Err(ConfigError::invalid_value(
                "cache.max_tags",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Local development preset: pretty `debug` logs on loopback.
    ///
    /// ```
    /// use giveaway_config::GiveawayConfig;
    ///
    /// let config = GiveawayConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.logging = LogConfig::development();
        config
    }

    /// Production preset: JSON `info` logs with metrics on.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::production();
        config.metrics.enabled = true;
        config
    }

    /// Telemetry settings in the shape `giveaway-telemetry` initialises from.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: self.logging.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticToken;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GiveawayConfig::default().validate().is_ok());
        assert!(GiveawayConfig::development().validate().is_ok());
        assert!(GiveawayConfig::production().validate().is_ok());
    }

    #[test]
    fn test_presets_differ_in_logging() {
        assert!(!GiveawayConfig::development().logging.json_format);
        assert!(GiveawayConfig::production().logging.json_format);
    }

    #[test]
    fn test_invalid_http_addr() {
        let mut config = GiveawayConfig::default();
        config.server.http_addr = "not-an-address".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_empty_token_header() {
        let mut config = GiveawayConfig::default();
        config.sessions.token_header = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cache_capacity() {
        let mut config = GiveawayConfig::default();
        config.cache.max_tags = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.max_tags"));
    }

    #[test]
    fn test_duplicate_tokens_rejected() {
        let token = StaticToken {
            token: "tok".to_string(),
            user_id: "alice".to_string(),
            email: None,
            name: None,
        };
        let mut config = GiveawayConfig::default();
        config.sessions.tokens = vec![token.clone(), token];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            [server]
            http_addr = "127.0.0.1:3000"
            port = 3000
        "#;
        assert!(toml::from_str::<GiveawayConfig>(toml).is_err());

        let toml = r#"
            [auth]
            enabled = true
        "#;
        assert!(toml::from_str::<GiveawayConfig>(toml).is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_sections() {
        let toml = r#"
            [sessions]
            token_header = "x-session-token"

            [[sessions.tokens]]
            token = "dev-alice"
            user_id = "alice"
            email = "alice@example.com"

            [cache]
            max_tags = 500
        "#;
        let config: GiveawayConfig = toml::from_str(toml).expect("valid TOML");
        assert_eq!(config.sessions.token_header, "x-session-token");
        assert_eq!(config.sessions.tokens[0].user_id, "alice");
        assert_eq!(config.cache.max_tags, 500);
        assert_eq!(config.server, ServerConfig::default());
    }
}
