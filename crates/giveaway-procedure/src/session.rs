//! Session resolution.
//!
//! The gate never inspects transport details. It hands whatever
//! [`Credentials`] the request-scoped environment carries to a
//! [`SessionResolver`], which answers with a raw [`Session`] or `None`.

use std::fmt;

use giveaway_core::{AppError, Session};

use crate::BoxFuture;

/// Opaque credentials attached to one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Wraps a bearer token.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Resolves the ambient session for a request.
///
/// Implementations must not mutate the session; the gate only reads it.
pub trait SessionResolver: Send + Sync {
    /// Returns the raw session for `credentials`, or `None` when there is none.
    fn resolve<'a>(
        &'a self,
        credentials: Option<&'a Credentials>,
    ) -> BoxFuture<'a, Result<Option<Session>, AppError>>;
}

/// A resolver that never finds a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessions;

impl SessionResolver for NoSessions {
    fn resolve<'a>(
        &'a self,
        _credentials: Option<&'a Credentials>,
    ) -> BoxFuture<'a, Result<Option<Session>, AppError>> {
        Box::pin(async { Ok(None) })
    }
}
