//! Server errors.

use thiserror::Error;

/// Errors raised while building or running a [`Server`](crate::Server).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server was assembled with missing or invalid settings.
    #[error("Invalid server configuration: {0}")]
    Config(String),

    /// The listen address could not be parsed or bound.
    #[error("Bind error: {0}")]
    Bind(String),

    /// An I/O error on the listening socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a bind error.
    #[must_use]
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind(message.into())
    }
}
