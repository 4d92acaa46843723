//! Typed configuration for the Giveaway server.
//!
//! - TOML and JSON files
//! - `GIVEAWAY__SECTION__KEY` environment overrides and an optional `.env`
//! - Strict parsing: unknown fields are errors
//!
//! # Configuration file format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_connections = 10000
//! max_body_bytes = 65536
//!
//! [logging]
//! level = "info"
//! json_format = true
//!
//! [metrics]
//! enabled = true
//!
//! [sessions]
//! token_header = "authorization"
//! session_ttl_secs = 3600
//!
//! [[sessions.tokens]]
//! token = "dev-alice"
//! user_id = "alice"
//!
//! [cache]
//! max_tags = 10000
//! ```

#![doc(html_root_url = "https://docs.rs/giveaway-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::GiveawayConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{ServerConfig, SessionsConfig, StaticToken};
