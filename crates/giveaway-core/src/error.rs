//! Error types for Giveaway procedures.
//!
//! This module provides the closed [`ErrorCode`] taxonomy and the
//! [`AppError`] type that handlers and the authorization gate raise for
//! expected business-rule violations.
//!
//! # Error codes
//!
//! | `ErrorCode` | Meaning | HTTP status |
//! |---|---|---|
//! | `UNAUTHORIZED` | no or invalid identity when one is required | 401 |
//! | `FORBIDDEN` | identity present but not allowed on this resource | 403 |
//! | `NOT_FOUND` | referenced entity absent | 404 |
//! | `CONFLICT` | uniqueness or state violation | 409 |
//! | `VALIDATION_ERROR` | input failed schema parsing | 400 |
//! | `BAD_REQUEST` | precondition violated for the current entity state | 400 |
//! | `INTERNAL_SERVER_ERROR` | unexpected handler failure or output contract breach | 500 |
//! | `UNKNOWN_HTTP_ERROR` | client-side catch-all for transport failures | 502 |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::outcome::Failure;

/// Result type alias using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Message returned for every unexpected failure. Raw error text never
/// reaches the caller.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Boxed error kept as the cause of an [`AppError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Machine-readable failure codes.
///
/// The set is closed: every failure [`Outcome`](crate::Outcome) carries
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No identity, or an expired one, where an identity is required.
    Unauthorized,
    /// Identity present but not allowed to touch this resource.
    Forbidden,
    /// The referenced entity does not exist.
    NotFound,
    /// Uniqueness or state conflict.
    Conflict,
    /// Input failed schema parsing.
    ValidationError,
    /// Precondition violated (action not applicable in the current state).
    BadRequest,
    /// Unexpected handler failure.
    InternalServerError,
    /// Transport-level failure observed by a client.
    UnknownHttpError,
}

impl ErrorCode {
    /// All codes in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::ValidationError,
        Self::BadRequest,
        Self::InternalServerError,
        Self::UnknownHttpError,
    ];

    /// Returns the wire representation of this code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::UnknownHttpError => "UNKNOWN_HTTP_ERROR",
        }
    }

    /// Returns the HTTP status used when this code crosses an HTTP boundary.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationError | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownHttpError => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns `true` when the caller, not the server, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::InternalServerError | Self::UnknownHttpError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown error code string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}

/// An expected application failure.
///
/// Handlers return `AppError` (usually wrapped in `anyhow::Error`) for
/// business-rule violations. The procedure boundary translates it into a
/// failure outcome with the same code and message. The `cause` is kept for
/// server-side logging only and never reaches the caller.
///
/// # Example
///
/// ```
/// use giveaway_core::{AppError, ErrorCode};
///
/// fn find(id: &str) -> Result<(), AppError> {
///     Err(AppError::not_found(format!("Sweepstakes {id} not found")))
/// }
///
/// let err = find("abc123").unwrap_err();
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Error, Debug)]
#[error("{code}: {message}")]
pub struct AppError {
    code: ErrorCode,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl AppError {
    /// Creates an error with an explicit code.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an `UNAUTHORIZED` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Creates a `FORBIDDEN` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Creates a `NOT_FOUND` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Creates a `NOT_FOUND` error naming the missing resource.
    #[must_use]
    pub fn not_found_resource(resource_type: &str, resource_id: &str) -> Self {
        Self::not_found(format!("{resource_type} '{resource_id}' not found"))
    }

    /// Creates a `CONFLICT` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Creates a `VALIDATION_ERROR` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Creates a `BAD_REQUEST` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Creates an `INTERNAL_SERVER_ERROR` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Creates an `INTERNAL_SERVER_ERROR` with the generic message.
    #[must_use]
    pub fn internal_generic() -> Self {
        Self::internal(INTERNAL_ERROR_MESSAGE)
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the caller-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Projects this error onto the caller-facing failure payload.
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        Failure::new(self.code, self.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_screaming_snake_case() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_string(&code).expect("serialization should work");
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_code_from_str() {
        assert_eq!("CONFLICT".parse::<ErrorCode>(), Ok(ErrorCode::Conflict));
        assert_eq!(
            "UNKNOWN_HTTP_ERROR".parse::<ErrorCode>(),
            Ok(ErrorCode::UnknownHttpError)
        );
        assert!("conflict".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn test_all_codes_have_error_status() {
        for code in ErrorCode::ALL {
            let status = code.http_status();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "{code} should map to an error status, got {status}"
            );
        }
    }

    #[test]
    fn test_client_error_split() {
        assert!(ErrorCode::ValidationError.is_client_error());
        assert!(ErrorCode::Unauthorized.is_client_error());
        assert!(!ErrorCode::InternalServerError.is_client_error());
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::conflict("Profile already exists");
        assert_eq!(err.to_string(), "CONFLICT: Profile already exists");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.message(), "Profile already exists");
    }

    #[test]
    fn test_not_found_resource() {
        let err = AppError::not_found_resource("Team", "team_123");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.message().contains("team_123"));
    }

    #[test]
    fn test_cause_is_kept_but_not_in_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = AppError::internal("Could not save").with_cause(io);
        assert!(err.cause().is_some());

        let failure = err.to_failure();
        assert_eq!(failure.code, ErrorCode::InternalServerError);
        assert!(!failure.message.contains("disk on fire"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = AppError::forbidden("Not a team member").into();
        let app = err.downcast_ref::<AppError>().expect("should downcast");
        assert_eq!(app.code(), ErrorCode::Forbidden);
    }
}
