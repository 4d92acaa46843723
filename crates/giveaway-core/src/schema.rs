//! Runtime schemas for procedure input and output.
//!
//! A [`Schema`] checks a `serde_json::Value` and reports the first violation
//! it finds. Procedures pair a schema with a serde type: the schema checks the
//! shape and the refinements serde cannot express (lengths, ranges, formats),
//! then serde turns the checked value into the typed input.
//!
//! # Example
//!
//! ```
//! use giveaway_core::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::object()
//!     .field("email", Schema::string().email())
//!     .field("name", Schema::string().min_length(1).max_length(80))
//!     .optional("bio", Schema::string().max_length(280));
//!
//! assert!(schema.validate(&json!({ "email": "a@b.co", "name": "Ada" })).is_ok());
//!
//! let err = schema.validate(&json!({ "email": "nope", "name": "Ada" })).unwrap_err();
//! assert_eq!(err.path, "$.email");
//! ```

use std::sync::OnceLock;

use chrono::DateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The first violation found while validating a value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Location of the violation (`$`, `$.field`, `$.items[2]`).
    pub path: String,
    /// What was wrong.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    /// `local@domain.tld`.
    Email,
    /// RFC 3339 timestamp.
    DateTime,
}

/// A property of an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property schema.
    pub schema: Schema,
    /// Whether the property must be present.
    pub required: bool,
}

/// A runtime schema over JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// String type.
    String {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Allowed values.
        one_of: Option<Vec<String>>,
        /// Required format.
        format: Option<StringFormat>,
    },
    /// Integer type.
    Integer {
        /// Minimum value.
        minimum: Option<i64>,
        /// Maximum value.
        maximum: Option<i64>,
    },
    /// Number (float) type.
    Number {
        /// Minimum value.
        minimum: Option<f64>,
        /// Maximum value.
        maximum: Option<f64>,
    },
    /// Boolean type.
    Boolean,
    /// Array type.
    Array {
        /// Schema for array items.
        items: Box<Schema>,
        /// Minimum number of items.
        min_items: Option<usize>,
        /// Maximum number of items.
        max_items: Option<usize>,
    },
    /// Object type. Properties are checked in declaration order.
    Object {
        /// Declared properties.
        properties: Vec<Property>,
        /// Reject properties that are not declared.
        #[serde(default)]
        strict: bool,
    },
    /// Either null or the inner schema.
    Nullable {
        /// The non-null schema.
        inner: Box<Schema>,
    },
    /// Accepts anything.
    Any,
    /// Accepts only null.
    Null,
}

impl Schema {
    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
            one_of: None,
            format: None,
        }
    }

    /// Creates an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// Creates an empty object schema. Add properties with [`Schema::field`]
    /// and [`Schema::optional`].
    #[must_use]
    pub fn object() -> Self {
        Self::Object {
            properties: Vec::new(),
            strict: false,
        }
    }

    /// Creates a schema that accepts anything.
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// Creates a null schema.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Allows null in addition to this schema.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            nullable @ Self::Nullable { .. } => nullable,
            other => Self::Nullable {
                inner: Box::new(other),
            },
        }
    }

    /// Adds a required property to an object schema.
    #[must_use]
    pub fn field(self, name: &str, schema: Schema) -> Self {
        self.with_property(name, schema, true)
    }

    /// Adds an optional property to an object schema.
    #[must_use]
    pub fn optional(self, name: &str, schema: Schema) -> Self {
        self.with_property(name, schema, false)
    }

    fn with_property(self, name: &str, schema: Schema, required: bool) -> Self {
        match self {
            Self::Object {
                mut properties,
                strict,
            } => {
                properties.retain(|p| p.name != name);
                properties.push(Property {
                    name: name.to_string(),
                    schema,
                    required,
                });
                Self::Object { properties, strict }
            }
            other => other,
        }
    }

    /// Rejects undeclared properties on an object schema.
    #[must_use]
    pub fn strict(self) -> Self {
        match self {
            Self::Object { properties, .. } => Self::Object {
                properties,
                strict: true,
            },
            other => other,
        }
    }

    /// Sets the minimum length for string schemas.
    #[must_use]
    pub fn min_length(self, len: usize) -> Self {
        match self {
            Self::String {
                max_length,
                one_of,
                format,
                ..
            } => Self::String {
                min_length: Some(len),
                max_length,
                one_of,
                format,
            },
            other => other,
        }
    }

    /// Sets the maximum length for string schemas.
    #[must_use]
    pub fn max_length(self, len: usize) -> Self {
        match self {
            Self::String {
                min_length,
                one_of,
                format,
                ..
            } => Self::String {
                min_length,
                max_length: Some(len),
                one_of,
                format,
            },
            other => other,
        }
    }

    /// Restricts a string schema to a fixed set of values.
    #[must_use]
    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            Self::String {
                min_length,
                max_length,
                format,
                ..
            } => Self::String {
                min_length,
                max_length,
                one_of: Some(values.into_iter().map(Into::into).collect()),
                format,
            },
            other => other,
        }
    }

    /// Requires an email address.
    #[must_use]
    pub fn email(self) -> Self {
        self.with_format(StringFormat::Email)
    }

    /// Requires an RFC 3339 timestamp.
    #[must_use]
    pub fn date_time(self) -> Self {
        self.with_format(StringFormat::DateTime)
    }

    fn with_format(self, format: StringFormat) -> Self {
        match self {
            Self::String {
                min_length,
                max_length,
                one_of,
                ..
            } => Self::String {
                min_length,
                max_length,
                one_of,
                format: Some(format),
            },
            other => other,
        }
    }

    /// Sets the minimum value for integer schemas.
    #[must_use]
    pub fn minimum_int(self, min: i64) -> Self {
        match self {
            Self::Integer { maximum, .. } => Self::Integer {
                minimum: Some(min),
                maximum,
            },
            other => other,
        }
    }

    /// Sets the maximum value for integer schemas.
    #[must_use]
    pub fn maximum_int(self, max: i64) -> Self {
        match self {
            Self::Integer { minimum, .. } => Self::Integer {
                minimum,
                maximum: Some(max),
            },
            other => other,
        }
    }

    /// Sets the minimum number of items for array schemas.
    #[must_use]
    pub fn min_items(self, min: usize) -> Self {
        match self {
            Self::Array {
                items, max_items, ..
            } => Self::Array {
                items,
                min_items: Some(min),
                max_items,
            },
            other => other,
        }
    }

    /// Sets the maximum number of items for array schemas.
    #[must_use]
    pub fn max_items(self, max: usize) -> Self {
        match self {
            Self::Array {
                items, min_items, ..
            } => Self::Array {
                items,
                min_items,
                max_items: Some(max),
            },
            other => other,
        }
    }

    /// Validates a JSON value, returning the first violation.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.validate_at_path(value, "$")
    }

    fn validate_at_path(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        match self {
            Self::Any => Ok(()),

            Self::Null => {
                if value.is_null() {
                    Ok(())
                } else {
                    Err(type_mismatch(path, "null", value))
                }
            }

            Self::Nullable { inner } => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate_at_path(value, path)
                }
            }

            Self::String {
                min_length,
                max_length,
                one_of,
                format,
            } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(path, "string", value))?;
                let len = s.chars().count();

                if let Some(min) = min_length {
                    if len < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("must contain at least {min} character(s)"),
                        ));
                    }
                }

                if let Some(max) = max_length {
                    if len > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("must contain at most {max} character(s)"),
                        ));
                    }
                }

                if let Some(allowed) = one_of {
                    if !allowed.iter().any(|a| a == s) {
                        return Err(ValidationError::new(
                            path,
                            format!("must be one of: {}", allowed.join(", ")),
                        ));
                    }
                }

                match format {
                    Some(StringFormat::Email) if !is_email(s) => {
                        Err(ValidationError::new(path, "invalid email address"))
                    }
                    Some(StringFormat::DateTime) if DateTime::parse_from_rfc3339(s).is_err() => {
                        Err(ValidationError::new(path, "invalid RFC 3339 timestamp"))
                    }
                    _ => Ok(()),
                }
            }

            Self::Integer { minimum, maximum } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch(path, "integer", value))?;

                if let Some(min) = minimum {
                    if n < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is less than minimum {min}"),
                        ));
                    }
                }

                if let Some(max) = maximum {
                    if n > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is greater than maximum {max}"),
                        ));
                    }
                }

                Ok(())
            }

            Self::Number { minimum, maximum } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| type_mismatch(path, "number", value))?;

                if let Some(min) = minimum {
                    if n < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is less than minimum {min}"),
                        ));
                    }
                }

                if let Some(max) = maximum {
                    if n > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is greater than maximum {max}"),
                        ));
                    }
                }

                Ok(())
            }

            Self::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(type_mismatch(path, "boolean", value))
                }
            }

            Self::Array {
                items,
                min_items,
                max_items,
            } => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| type_mismatch(path, "array", value))?;

                if let Some(min) = min_items {
                    if arr.len() < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("must contain at least {min} item(s)"),
                        ));
                    }
                }

                if let Some(max) = max_items {
                    if arr.len() > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("must contain at most {max} item(s)"),
                        ));
                    }
                }

                for (idx, item) in arr.iter().enumerate() {
                    items.validate_at_path(item, &format!("{path}[{idx}]"))?;
                }

                Ok(())
            }

            Self::Object { properties, strict } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| type_mismatch(path, "object", value))?;

                for property in properties {
                    let prop_path = format!("{path}.{}", property.name);
                    match obj.get(&property.name) {
                        Some(prop_value) => {
                            property.schema.validate_at_path(prop_value, &prop_path)?;
                        }
                        None if property.required => {
                            return Err(ValidationError::new(prop_path, "required"));
                        }
                        None => {}
                    }
                }

                if *strict {
                    if let Some(unknown) = obj
                        .keys()
                        .find(|key| !properties.iter().any(|p| &p.name == *key))
                    {
                        return Err(ValidationError::new(
                            format!("{path}.{unknown}"),
                            "unrecognized property",
                        ));
                    }
                }

                Ok(())
            }
        }
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::new(
        path,
        format!("expected {expected}, received {}", value_type_name(value)),
    )
}

/// Dot-atom local part, dot-separated hostname labels, alphabetic TLD.
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$";

fn is_email(s: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|email| email.is_match(s))
}

/// Returns a human-readable name for a JSON value type.
fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn profile_schema() -> Schema {
        Schema::object()
            .field("userId", Schema::string().min_length(1))
            .field("displayName", Schema::string().min_length(2).max_length(40))
            .optional("bio", Schema::string().max_length(160).nullable())
    }

    #[test]
    fn test_valid_object() {
        let value = json!({ "userId": "u1", "displayName": "Ada", "bio": null });
        assert!(profile_schema().validate(&value).is_ok());
    }

    #[test]
    fn test_missing_required_property() {
        let err = profile_schema()
            .validate(&json!({ "displayName": "Ada" }))
            .unwrap_err();
        assert_eq!(err.path, "$.userId");
        assert_eq!(err.message, "required");
    }

    #[test]
    fn test_first_violation_in_declaration_order() {
        let err = profile_schema()
            .validate(&json!({ "userId": 7, "displayName": "A" }))
            .unwrap_err();
        assert_eq!(err.path, "$.userId");
        assert_eq!(err.to_string(), "$.userId: expected string, received number");
    }

    #[test]
    fn test_string_length_counts_characters() {
        let schema = Schema::string().max_length(3);
        assert!(schema.validate(&json!("äöü")).is_ok());
        assert!(schema.validate(&json!("äöüß")).is_err());
    }

    #[test]
    fn test_one_of() {
        let schema = Schema::string().one_of(["DRAFT", "ACTIVE"]);
        assert!(schema.validate(&json!("DRAFT")).is_ok());
        let err = schema.validate(&json!("ENDED")).unwrap_err();
        assert!(err.message.contains("DRAFT, ACTIVE"));
    }

    #[test]
    fn test_email_format() {
        let schema = Schema::string().email();
        for good in ["winner@example.com", "first.last+tag@mail.example.co.uk", "x@y.io"] {
            assert!(schema.validate(&json!(good)).is_ok(), "{good} should be accepted");
        }
        for bad in [
            "",
            "no-at",
            "@example.com",
            "a@b",
            "a b@example.com",
            "a@@b.co",
            "a@b..co",
            ".a@example.com",
            "a@-example.com",
            "a@example.c0m",
        ] {
            assert!(schema.validate(&json!(bad)).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_date_time_format() {
        let schema = Schema::string().date_time();
        assert!(schema.validate(&json!("2026-05-01T09:00:00Z")).is_ok());
        assert!(schema.validate(&json!("next tuesday")).is_err());
    }

    #[test]
    fn test_array_items_path() {
        let schema = Schema::array(Schema::integer().minimum_int(0)).max_items(3);
        let err = schema.validate(&json!([1, -2, 3])).unwrap_err();
        assert_eq!(err.path, "$[1]");
        assert!(schema.validate(&json!([1, 2, 3, 4])).is_err());
    }

    #[test]
    fn test_strict_object_rejects_unknown() {
        let schema = Schema::object().field("id", Schema::string()).strict();
        let err = schema
            .validate(&json!({ "id": "x", "extra": true }))
            .unwrap_err();
        assert_eq!(err.path, "$.extra");

        let lenient = Schema::object().field("id", Schema::string());
        assert!(lenient.validate(&json!({ "id": "x", "extra": true })).is_ok());
    }

    #[test]
    fn test_redeclaring_field_replaces_it() {
        let schema = Schema::object()
            .field("id", Schema::integer())
            .optional("id", Schema::string());
        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({ "id": "x" })).is_ok());
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_value(Schema::string().min_length(1)).expect("serialize");
        assert_eq!(json["type"], "string");
        assert_eq!(json["min_length"], 1);
    }

    proptest! {
        #[test]
        fn prop_integer_bounds(n in -1000i64..1000) {
            let schema = Schema::integer().minimum_int(-10).maximum_int(10);
            prop_assert_eq!(schema.validate(&json!(n)).is_ok(), (-10..=10).contains(&n));
        }

        #[test]
        fn prop_any_accepts_everything(s in ".*", n in any::<i64>(), b in any::<bool>()) {
            let value = json!({ "s": s, "n": n, "b": b });
            prop_assert!(Schema::any().validate(&value).is_ok());
        }
    }
}
