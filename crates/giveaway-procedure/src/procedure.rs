//! The callable procedure and its per-invocation algorithm.
//!
//! ```text
//! authorize ─▶ parse input ─▶ handler ─▶ check output ─▶ invalidate ─▶ Success
//!     │             │            │             │
//!     ▼             ▼            ▼             ▼
//! UNAUTHORIZED  VALIDATION   AppError code  INTERNAL_SERVER_ERROR
//!                 _ERROR     or INTERNAL
//! ```
//!
//! Each step's failure short-circuits every later step. Nothing escapes
//! [`Procedure::call`]: handler errors and panics become failure outcomes, and
//! a panicking invalidation hook is logged without touching the success.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use giveaway_core::{AppError, ErrorCode, Identity, Outcome, RequestId, Schema};
use giveaway_telemetry::metrics::{record_cache_invalidation, record_procedure_call, InFlightGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::environment::Environment;
use crate::gate::{AuthMode, AuthorizationGate, SIGN_IN_REQUIRED};
use crate::invalidation::{invalidate_all, InvalidationKeys, KeyArgs};
use crate::validation::{InputParser, OutputContract};
use crate::BoxFuture;

/// What a handler receives.
pub struct HandlerArgs<I, D: ?Sized> {
    /// The parsed input.
    pub input: I,
    /// The caller; always `Some` for `authorized()` procedures.
    pub user: Option<Identity>,
    /// The data-store handle.
    pub db: Arc<D>,
    /// The environment clock's reading when the call was authorized.
    pub now: DateTime<Utc>,
}

impl<I: fmt::Debug, D: ?Sized> fmt::Debug for HandlerArgs<I, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerArgs")
            .field("input", &self.input)
            .field("user", &self.user)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl<I, D: ?Sized> HandlerArgs<I, D> {
    /// Returns the caller or an `UNAUTHORIZED` error.
    pub fn require_user(&self) -> Result<&Identity, AppError> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::unauthorized(SIGN_IN_REQUIRED))
    }
}

pub(crate) type HandlerFn<I, O, D> =
    Arc<dyn Fn(HandlerArgs<I, D>) -> BoxFuture<'static, anyhow::Result<O>> + Send + Sync>;

pub(crate) struct Invalidation<I, O> {
    pub(crate) keys: InvalidationKeys<I, O>,
    pub(crate) retain_input: fn(&I) -> I,
}

pub(crate) struct Definition<I, O, D: ?Sized> {
    pub(crate) name: String,
    pub(crate) gate: AuthorizationGate,
    pub(crate) input: InputParser<I>,
    pub(crate) output: OutputContract<O>,
    pub(crate) invalidation: Option<Invalidation<I, O>>,
    pub(crate) handler: HandlerFn<I, O, D>,
}

/// A configured, callable procedure.
///
/// Immutable once built; clones share one definition. Concurrent calls share
/// nothing but the definition and the environment's collaborators.
pub struct Procedure<I, O, D: ?Sized> {
    definition: Arc<Definition<I, O, D>>,
}

impl<I, O, D: ?Sized> Clone for Procedure<I, O, D> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
        }
    }
}

impl<I, O, D: ?Sized> fmt::Debug for Procedure<I, O, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.definition.name)
            .field("auth", &self.definition.gate.mode())
            .field("invalidates", &self.definition.invalidation.is_some())
            .finish_non_exhaustive()
    }
}

impl<I, O, D: ?Sized> Procedure<I, O, D> {
    pub(crate) fn from_definition(definition: Definition<I, O, D>) -> Self {
        Self {
            definition: Arc::new(definition),
        }
    }

    /// Returns the procedure name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the authorization mode.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.definition.gate.mode()
    }
}

impl<I, O, D> Procedure<I, O, D>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    D: ?Sized + Send + Sync + 'static,
{
    /// Returns the input schema.
    #[must_use]
    pub fn input_schema(&self) -> &Schema {
        self.definition.input.schema()
    }

    /// Returns the output schema.
    #[must_use]
    pub fn output_schema(&self) -> &Schema {
        self.definition.output.schema()
    }

    /// Invokes the procedure with raw JSON input.
    ///
    /// Never panics and never returns an error: every failure is an
    /// [`Outcome::Failure`].
    pub async fn call(&self, env: &Environment<D>, raw: Value) -> Outcome<O> {
        let name = self.definition.name.as_str();
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "procedure",
            procedure = %name,
            request_id = %request_id,
            user = tracing::field::Empty,
        );

        let started = Instant::now();
        let _in_flight = InFlightGuard::new();
        let outcome = self.run(env, raw).instrument(span.clone()).await;
        let elapsed = started.elapsed();

        record_procedure_call(name, outcome.code(), elapsed);
        span.in_scope(|| {
            tracing::debug!(
                outcome = giveaway_telemetry::metrics::outcome_label(outcome.code()),
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                "procedure finished"
            );
        });

        outcome
    }

    /// Invokes the procedure with any serializable input.
    pub async fn call_with<T: Serialize + ?Sized>(
        &self,
        env: &Environment<D>,
        input: &T,
    ) -> Outcome<O> {
        match serde_json::to_value(input) {
            Ok(raw) => self.call(env, raw).await,
            Err(err) => AppError::validation(format!("$: {err}")).into(),
        }
    }

    async fn run(&self, env: &Environment<D>, raw: Value) -> Outcome<O> {
        let def = &*self.definition;

        let user = match def
            .gate
            .resolve(env.sessions(), env.credentials(), env.clock())
            .await
        {
            Ok(user) => user,
            Err(err) => return err.into(),
        };
        if let Some(user) = &user {
            tracing::Span::current().record("user", user.log_id().as_str());
        }

        let input = match def.input.parse(&raw) {
            Ok(input) => input,
            Err(err) => {
                tracing::debug!(error = %err, "input rejected");
                return err.into();
            }
        };

        let retained = def
            .invalidation
            .as_ref()
            .map(|invalidation| (invalidation.retain_input)(&input));

        let args = HandlerArgs {
            input,
            user: user.clone(),
            db: Arc::clone(env.db()),
            now: env.clock().now(),
        };
        let handler = Arc::clone(&def.handler);
        let result = AssertUnwindSafe(async move { handler(args).await })
            .catch_unwind()
            .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return normalize_handler_error(err).into(),
            Err(panic) => {
                tracing::error!(panic = %panic_message(panic.as_ref()), "procedure handler panicked");
                return AppError::internal_generic().into();
            }
        };

        if let Err(err) = def.output.check(&output) {
            let detail = err.cause().map(ToString::to_string).unwrap_or_default();
            tracing::error!(error = %detail, "handler output breached its contract");
            return err.into();
        }

        if let (Some(invalidation), Some(input)) = (&def.invalidation, retained) {
            let invalidated = AssertUnwindSafe(async {
                let tags = (invalidation.keys)(KeyArgs {
                    input: &input,
                    output: &output,
                    user: user.as_ref(),
                });
                invalidate_all(env.cache(), &tags).await
            })
            .catch_unwind()
            .await;

            if let Err(panic) = invalidated {
                tracing::warn!(
                    panic = %panic_message(panic.as_ref()),
                    "cache invalidation panicked"
                );
                record_cache_invalidation(false);
            }
        }

        Outcome::success(output)
    }
}

/// Translates a handler error into the error the caller sees.
fn normalize_handler_error(err: anyhow::Error) -> AppError {
    match err.downcast::<AppError>() {
        Ok(app) => {
            match app.code() {
                ErrorCode::InternalServerError | ErrorCode::UnknownHttpError => {
                    tracing::error!(code = %app.code(), error = ?app, "procedure failed");
                }
                code => tracing::info!(code = %code, reason = app.message(), "procedure rejected"),
            }
            app
        }
        Err(other) => {
            tracing::error!(error = ?other, "procedure handler failed");
            AppError::internal_generic()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        return message;
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message;
    }
    "non-string panic payload"
}
