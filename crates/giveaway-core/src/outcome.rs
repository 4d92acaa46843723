//! The success/failure envelope returned by every procedure.
//!
//! An [`Outcome`] is built fresh for every invocation and never mutated.
//! On the wire it is a flat JSON object discriminated by `ok`:
//!
//! ```json
//! { "ok": true, "id": "a1B2c3" }
//! { "ok": false, "code": "CONFLICT", "message": "Profile already exists" }
//! ```
//!
//! Success payloads that do not serialize to a JSON object are nested under
//! a `data` key; unit payloads produce a bare `{ "ok": true }`.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{AppError, ErrorCode};

/// Key used to nest non-object success payloads.
const DATA_KEY: &str = "data";

/// The failure half of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct Failure {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message, safe to show to the caller.
    pub message: String,
}

impl Failure {
    /// Creates a failure payload.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Tagged success/failure result of a procedure call.
///
/// Callers must branch on [`Outcome::is_ok`] (or match) before reading
/// success data.
///
/// # Example
///
/// ```
/// use giveaway_core::{ErrorCode, Outcome};
/// use serde_json::json;
///
/// let ok: Outcome<serde_json::Value> = Outcome::success(json!({ "id": "abc123" }));
/// assert_eq!(serde_json::to_value(&ok).unwrap(), json!({ "ok": true, "id": "abc123" }));
///
/// let failed: Outcome<()> = Outcome::failure(ErrorCode::NotFound, "missing");
/// assert_eq!(
///     serde_json::to_value(&failed).unwrap(),
///     json!({ "ok": false, "code": "NOT_FOUND", "message": "missing" })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The procedure completed and produced `T`.
    Success(T),
    /// The procedure failed.
    Failure(Failure),
}

impl<T> Outcome<T> {
    /// Wraps a success payload.
    pub const fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Builds a failure outcome.
    #[must_use]
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Failure(Failure::new(code, message))
    }

    /// Returns `true` for a success outcome.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the success payload, if any.
    pub const fn ok(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure payload, if any.
    pub const fn failure_ref(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Returns the failure code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.failure_ref().map(|f| f.code)
    }

    /// Returns the failure message, if any.
    pub fn message(&self) -> Option<&str> {
        self.failure_ref().map(|f| f.message.as_str())
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Maps the success payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

impl<T> From<AppError> for Outcome<T> {
    fn from(err: AppError) -> Self {
        Self::Failure(err.to_failure())
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

impl<T> From<Result<T, AppError>> for Outcome<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => err.into(),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(value) => {
                let fields = success_fields(value).map_err(S::Error::custom)?;
                let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
                map.serialize_entry("ok", &true)?;
                for (key, value) in &fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Failure(failure) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("code", &failure.code)?;
                map.serialize_entry("message", &failure.message)?;
                map.end()
            }
        }
    }
}

/// Flattens a success payload into the fields that sit next to `ok`.
fn success_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    let fields = match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("ok");
            map
        }
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert(DATA_KEY.to_string(), other);
            map
        }
    };
    Ok(fields)
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Outcome<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let ok = map
            .remove("ok")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| D::Error::missing_field("ok"))?;

        if !ok {
            let failure = serde_json::from_value(Value::Object(map)).map_err(D::Error::custom)?;
            return Ok(Self::Failure(failure));
        }

        if map.is_empty() {
            if let Ok(value) = serde_json::from_value(Value::Null) {
                return Ok(Self::Success(value));
            }
        }

        let nested = match map.get(DATA_KEY) {
            Some(data) if map.len() == 1 => Some(data.clone()),
            _ => None,
        };

        match serde_json::from_value(Value::Object(map)) {
            Ok(value) => Ok(Self::Success(value)),
            Err(err) => match nested {
                Some(data) => serde_json::from_value(data)
                    .map(Self::Success)
                    .map_err(D::Error::custom),
                None => Err(D::Error::custom(err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Created {
        id: String,
    }

    #[test]
    fn test_success_is_flattened() {
        let outcome = Outcome::success(Created {
            id: "a1B2c3".to_string(),
        });
        let json = serde_json::to_value(&outcome).expect("serialization should work");
        assert_eq!(json, json!({ "ok": true, "id": "a1B2c3" }));
    }

    #[test]
    fn test_failure_shape() {
        let outcome: Outcome<Created> = Outcome::failure(ErrorCode::Conflict, "X");
        let json = serde_json::to_value(&outcome).expect("serialization should work");
        assert_eq!(json, json!({ "ok": false, "code": "CONFLICT", "message": "X" }));
    }

    #[test]
    fn test_unit_success() {
        let outcome = Outcome::success(());
        let json = serde_json::to_value(&outcome).expect("serialization should work");
        assert_eq!(json, json!({ "ok": true }));

        let parsed: Outcome<()> = serde_json::from_value(json).expect("should deserialize");
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_scalar_success_nested_under_data() {
        let outcome = Outcome::success(vec![1, 2, 3]);
        let json = serde_json::to_value(&outcome).expect("serialization should work");
        assert_eq!(json, json!({ "ok": true, "data": [1, 2, 3] }));

        let parsed: Outcome<Vec<i32>> = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(parsed.ok(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_parse_from_wire() {
        let parsed: Outcome<Created> =
            serde_json::from_value(json!({ "ok": true, "id": "zz99zz" })).expect("should parse");
        assert_eq!(parsed.ok().map(|c| c.id.as_str()), Some("zz99zz"));

        let parsed: Outcome<Created> = serde_json::from_value(
            json!({ "ok": false, "code": "UNAUTHORIZED", "message": "Sign in" }),
        )
        .expect("should parse");
        assert_eq!(parsed.code(), Some(ErrorCode::Unauthorized));
        assert_eq!(parsed.message(), Some("Sign in"));
    }

    #[test]
    fn test_missing_ok_is_rejected() {
        let parsed = serde_json::from_value::<Outcome<Created>>(json!({ "id": "x" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_from_app_error() {
        let outcome: Outcome<Created> = AppError::not_found("gone").into();
        assert_eq!(outcome.code(), Some(ErrorCode::NotFound));
        assert!(outcome.ok().is_none());
    }

    #[test]
    fn test_into_result_and_map() {
        let outcome = Outcome::success(2).map(|n| n * 10);
        assert_eq!(outcome.into_result(), Ok(20));

        let failed: Outcome<i32> = Outcome::failure(ErrorCode::BadRequest, "nope");
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
    }
}
