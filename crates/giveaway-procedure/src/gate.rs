//! Authorization gate.
//!
//! Runs first in every invocation. In [`AuthMode::Required`] a missing,
//! incomplete, or expired session short-circuits with `UNAUTHORIZED`; in
//! [`AuthMode::Optional`] the handler simply receives no user.

use giveaway_core::{AppError, Identity};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::session::{Credentials, SessionResolver};

/// Message returned when a signed-in caller is required.
pub const SIGN_IN_REQUIRED: &str = "You must be signed in to do that";

/// Whether a procedure requires a caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// A fresh identity must exist.
    Required,
    /// The identity is resolved if present.
    Optional,
}

impl AuthMode {
    /// Returns `true` for [`AuthMode::Required`].
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Resolves the caller identity for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationGate {
    mode: AuthMode,
}

impl AuthorizationGate {
    /// Creates a gate for `mode`.
    #[must_use]
    pub const fn new(mode: AuthMode) -> Self {
        Self { mode }
    }

    /// Returns the gate's mode.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Resolves the caller.
    ///
    /// Returns `Ok(None)` for anonymous callers in optional mode. A resolver
    /// failure is `UNAUTHORIZED` in required mode and anonymous otherwise.
    pub async fn resolve(
        &self,
        sessions: &dyn SessionResolver,
        credentials: Option<&Credentials>,
        clock: &dyn Clock,
    ) -> Result<Option<Identity>, AppError> {
        let session = match sessions.resolve(credentials).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, mode = ?self.mode, "session resolution failed");
                if self.mode.is_required() {
                    return Err(AppError::unauthorized(SIGN_IN_REQUIRED).with_cause(err));
                }
                None
            }
        };

        let identity = session.and_then(|s| s.into_identity(clock.now()));

        match (self.mode, identity) {
            (AuthMode::Required, None) => {
                tracing::debug!("rejected: no fresh session");
                Err(AppError::unauthorized(SIGN_IN_REQUIRED))
            }
            (_, identity) => Ok(identity),
        }
    }
}
