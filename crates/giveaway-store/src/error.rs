//! Store error types.

use giveaway_core::AppError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Looked-up identifier.
        id: String,
    },

    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    /// The backend failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound { .. } => Self::not_found(err.to_string()),
            StoreError::Conflict(message) => Self::conflict(message.clone()),
            StoreError::Unavailable(_) => Self::internal_generic().with_cause(err),
        }
    }
}
