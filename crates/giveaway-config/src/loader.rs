//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, GiveawayConfig};

/// Configuration loader.
///
/// Layers are applied in order, later ones winning:
/// 1. Built-in defaults (or a preset)
/// 2. A TOML or JSON file
/// 3. `PREFIX__SECTION__KEY` environment variables
///
/// # Example
///
/// ```no_run
/// use giveaway_config::ConfigLoader;
///
/// # fn main() -> Result<(), giveaway_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("giveaway.toml")?
///     .with_env_prefix("GIVEAWAY")
///     .with_dotenv()
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: GiveawayConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from [`GiveawayConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GiveawayConfig::default(),
            env_prefix: None,
        }
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = GiveawayConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = GiveawayConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// The file replaces the configuration built so far; sections it omits
    /// take their defaults.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        self.config = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                )))
            }
        };
        Ok(self)
    }

    /// Loads `path` if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` (`"toml"` or `"json"`).
    ///
    /// ```
    /// use giveaway_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Enables `PREFIX__SECTION__KEY` environment overrides, e.g.
    /// `GIVEAWAY__SERVER__HTTP_ADDR=0.0.0.0:9000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file into the process environment, if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        self
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<GiveawayConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
            self.apply_env_overrides(&prefix, vars)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> GiveawayConfig {
        self.config
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut overrides: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(&marker))
            .collect();
        overrides.sort();

        for (key, value) in overrides {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = path.split("__").collect();

        let config = &mut self.config;
        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "MAX_CONNECTIONS"] => {
                config.server.max_connections = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_number(key, value)?;
            }

            ["LOGGING", "ENABLED"] => config.logging.enabled = require_bool(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.json_format = match value.to_lowercase().as_str() {
                    "json" => true,
                    "pretty" => false,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => config.logging.span_events = require_bool(key, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => {
                config.logging.file_line_info = require_bool(key, value)?;
            }

            ["METRICS", "ENABLED"] => config.metrics.enabled = require_bool(key, value)?,

            ["SESSIONS", "TOKEN_HEADER"] => config.sessions.token_header = value.to_string(),
            ["SESSIONS", "SESSION_TTL_SECS"] => {
                config.sessions.session_ttl_secs = parse_number(key, value)?;
            }

            ["CACHE", "MAX_TAGS"] => config.cache.max_tags = parse_number(key, value)?,

            [section, field @ ..] => {
                return Err(ConfigError::unknown_field(field.join("__"), *section));
            }
            [] => return Err(ConfigError::env_parse_error(key, "invalid key format")),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn require_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parses a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"server": {"http_addr": "127.0.0.1:3000"}, "cache": {"max_tags": 10}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert_eq!(config.cache.max_tags, 10);
    }

    #[test]
    fn test_loader_with_string_unknown_format() {
        assert!(ConfigLoader::new().with_string("", "yaml").is_err());
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/giveaway.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/giveaway.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, GiveawayConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_overrides(
                "TEST",
                vars(&[
                    ("TEST__SERVER__HTTP_ADDR", "127.0.0.1:9000"),
                    ("TEST__LOGGING__FORMAT", "pretty"),
                    ("TEST__METRICS__ENABLED", "false"),
                    ("TEST__SESSIONS__TOKEN_HEADER", "x-token"),
                    ("TEST__CACHE__MAX_TAGS", "42"),
                    ("OTHER__SERVER__HTTP_ADDR", "10.0.0.1:1"),
                    ("TESTING", "ignored"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert!(!config.logging.json_format);
        assert!(!config.metrics.enabled);
        assert_eq!(config.sessions.token_header, "x-token");
        assert_eq!(config.cache.max_tags, 42);
    }

    #[test]
    fn test_env_invalid_integer() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__CACHE__MAX_TAGS", "lots", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_env_unknown_key() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__SERVER__PORT", "8080", "TEST");
        assert!(matches!(result, Err(ConfigError::UnknownField { .. })));
    }
}
