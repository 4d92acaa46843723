//! Configuration sections owned by this crate.
//!
//! Logging and metrics sections come from `giveaway-telemetry`; the cache
//! section is the procedure crate's [`TagCacheConfig`](giveaway_procedure::TagCacheConfig).

use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g. `"0.0.0.0:8080"`).
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: default_max_connections(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    10_000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Session resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Header carrying the `Bearer` token.
    #[serde(default = "default_token_header")]
    pub token_header: String,

    /// Lifetime of the sessions issued for static tokens, in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Tokens known at startup.
    #[serde(default)]
    pub tokens: Vec<StaticToken>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            token_header: default_token_header(),
            session_ttl_secs: default_session_ttl(),
            tokens: Vec::new(),
        }
    }
}

fn default_token_header() -> String {
    "authorization".to_string()
}

fn default_session_ttl() -> u64 {
    3600
}

/// A bearer token mapped to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticToken {
    /// The opaque token.
    pub token: String,
    /// User it authenticates.
    pub user_id: String,
    /// User email.
    #[serde(default)]
    pub email: Option<String>,
    /// User display name.
    #[serde(default)]
    pub name: Option<String>,
}
