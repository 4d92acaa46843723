//! Input parsing and output contracts.
//!
//! Malformed input is the caller's fault (`VALIDATION_ERROR`); malformed
//! output is the server's fault (`INTERNAL_SERVER_ERROR`).

use std::fmt;
use std::marker::PhantomData;

use giveaway_core::{AppError, Schema, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Parses raw procedure input: schema first, then serde.
pub struct InputParser<I> {
    schema: Schema,
    _marker: PhantomData<fn() -> I>,
}

impl<I> fmt::Debug for InputParser<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputParser")
            .field("schema", &self.schema)
            .finish()
    }
}

impl<I: DeserializeOwned> InputParser<I> {
    /// Creates a parser for `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            _marker: PhantomData,
        }
    }

    /// Returns the input schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parses `raw` into `I`.
    ///
    /// Both schema violations and serde failures become `VALIDATION_ERROR`
    /// carrying the first violation.
    pub fn parse(&self, raw: &Value) -> Result<I, AppError> {
        self.schema
            .validate(raw)
            .map_err(|violation| AppError::validation(violation.to_string()))?;

        serde_json::from_value(raw.clone()).map_err(|err| {
            let violation = ValidationError::new("$", err.to_string());
            AppError::validation(violation.to_string()).with_cause(err)
        })
    }
}

/// Field the result envelope uses to tell success from failure.
const ENVELOPE_TAG: &str = "ok";

/// Checks handler output against its declared schema.
pub struct OutputContract<O> {
    schema: Schema,
    _marker: PhantomData<fn(&O)>,
}

impl<O> fmt::Debug for OutputContract<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputContract")
            .field("schema", &self.schema)
            .finish()
    }
}

impl<O: Serialize> OutputContract<O> {
    /// Creates a contract for `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            _marker: PhantomData,
        }
    }

    /// Returns the output schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Serializes `output` and validates it.
    ///
    /// A breach is `INTERNAL_SERVER_ERROR` with the generic message; the
    /// violation is kept as the cause for server-side logs. A top-level `ok`
    /// field is a breach since it would collide with the envelope tag.
    pub fn check(&self, output: &O) -> Result<Value, AppError> {
        let value = serde_json::to_value(output)
            .map_err(|err| AppError::internal_generic().with_cause(err))?;

        if value.get(ENVELOPE_TAG).is_some() {
            let violation =
                ValidationError::new(format!("$.{ENVELOPE_TAG}"), "reserved by the result envelope");
            return Err(AppError::internal_generic().with_cause(violation));
        }

        self.schema
            .validate(&value)
            .map_err(|violation| AppError::internal_generic().with_cause(violation))?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use giveaway_core::{ErrorCode, INTERNAL_ERROR_MESSAGE};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct EnterInput {
        sweepstakes_id: String,
        email: String,
    }

    fn parser() -> InputParser<EnterInput> {
        InputParser::new(
            Schema::object()
                .field("sweepstakesId", Schema::string().min_length(6).max_length(6))
                .field("email", Schema::string().email()),
        )
    }

    #[test]
    fn test_parse_valid_input() {
        let input = parser()
            .parse(&json!({ "sweepstakesId": "a1B2c3", "email": "x@y.io" }))
            .expect("valid input");
        assert_eq!(input.sweepstakes_id, "a1B2c3");
    }

    #[test]
    fn test_schema_violation_reports_first_path() {
        let err = parser()
            .parse(&json!({ "sweepstakesId": "short", "email": "bad" }))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.message().starts_with("$.sweepstakesId:"), "{}", err.message());
    }

    #[test]
    fn test_serde_failure_is_validation_error() {
        let lenient: InputParser<EnterInput> = InputParser::new(Schema::any());
        let err = lenient.parse(&json!({ "email": "x@y.io" })).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.message().contains("sweepstakesId"));
    }

    #[test]
    fn test_output_breach_is_internal() {
        let contract: OutputContract<EnterInput> =
            OutputContract::new(Schema::object().field("entryId", Schema::string()));
        let err = contract
            .check(&EnterInput {
                sweepstakes_id: "a1B2c3".to_string(),
                email: "x@y.io".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalServerError);
        assert_eq!(err.message(), INTERNAL_ERROR_MESSAGE);
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_output_with_ok_field_is_internal() {
        #[derive(Serialize)]
        struct Shadowing {
            ok: bool,
            id: String,
        }

        let contract: OutputContract<Shadowing> = OutputContract::new(
            Schema::object()
                .field("ok", Schema::boolean())
                .field("id", Schema::string()),
        );
        let err = contract
            .check(&Shadowing {
                ok: false,
                id: "thing_1".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalServerError);
        assert_eq!(err.message(), INTERNAL_ERROR_MESSAGE);
        assert!(err.cause().is_some_and(|cause| cause.to_string().starts_with("$.ok:")));
    }

    #[test]
    fn test_output_ok_returns_value() {
        let contract: OutputContract<EnterInput> =
            OutputContract::new(Schema::object().field("email", Schema::string().email()));
        let value = contract
            .check(&EnterInput {
                sweepstakes_id: "a1B2c3".to_string(),
                email: "x@y.io".to_string(),
            })
            .expect("valid output");
        assert_eq!(value["email"], "x@y.io");
    }
}
