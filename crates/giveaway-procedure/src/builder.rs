//! Staged procedure builder.
//!
//! Each stage is its own type, so methods for a later stage do not exist on
//! an earlier one:
//!
//! ```text
//! procedure(name) ─authorized()/optional_auth()─▶ AuthorizationSet
//!   ─input::<I>(schema)─▶ InputSet<I> ─output::<O>(schema)─▶ OutputSet<I, O>
//!   ─[invalidates(f)]─▶ InvalidationSet<I, O> ─handler(f)─▶ Procedure<I, O, D>
//! ```
//!
//! ```compile_fail
//! use giveaway_procedure::procedure;
//!
//! // No authorization mode chosen yet.
//! let _ = procedure("createTeam").input::<String>(giveaway_core::Schema::string());
//! ```

use std::future::Future;
use std::sync::Arc;

use giveaway_core::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::gate::{AuthMode, AuthorizationGate};
use crate::invalidation::{InvalidationKeys, KeyArgs};
use crate::procedure::{Definition, HandlerArgs, HandlerFn, Invalidation, Procedure};
use crate::validation::{InputParser, OutputContract};

/// No authorization mode chosen.
#[derive(Debug)]
pub struct Unconfigured;

/// Authorization mode chosen.
#[derive(Debug)]
pub struct AuthorizationSet;

/// Input schema chosen.
#[derive(Debug)]
pub struct InputSet<I> {
    input: InputParser<I>,
}

/// Output schema chosen.
#[derive(Debug)]
pub struct OutputSet<I, O> {
    input: InputParser<I>,
    output: OutputContract<O>,
}

/// Invalidation-key function chosen.
pub struct InvalidationSet<I, O> {
    input: InputParser<I>,
    output: OutputContract<O>,
    invalidation: Invalidation<I, O>,
}

/// A procedure under construction.
#[derive(Debug)]
pub struct ProcedureBuilder<S> {
    name: String,
    mode: AuthMode,
    stage: S,
}

/// Starts a procedure named `name`.
///
/// # Example
///
/// ```
/// use giveaway_core::Schema;
/// use giveaway_procedure::{procedure, HandlerArgs};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize)]
/// struct Input { name: String }
///
/// #[derive(Serialize)]
/// struct Output { greeting: String }
///
/// let greet = procedure("greet")
///     .optional_auth()
///     .input::<Input>(Schema::object().field("name", Schema::string().min_length(1)))
///     .output::<Output>(Schema::object().field("greeting", Schema::string()))
///     .handler(|args: HandlerArgs<Input, ()>| async move {
///         anyhow::Ok(Output { greeting: format!("Hello, {}!", args.input.name) })
///     });
///
/// assert_eq!(greet.name(), "greet");
/// ```
#[must_use]
pub fn procedure(name: impl Into<String>) -> ProcedureBuilder<Unconfigured> {
    ProcedureBuilder {
        name: name.into(),
        mode: AuthMode::Optional,
        stage: Unconfigured,
    }
}

impl ProcedureBuilder<Unconfigured> {
    /// Requires a fresh caller identity.
    #[must_use]
    pub fn authorized(self) -> ProcedureBuilder<AuthorizationSet> {
        self.auth(AuthMode::Required)
    }

    /// Resolves the caller identity if present.
    #[must_use]
    pub fn optional_auth(self) -> ProcedureBuilder<AuthorizationSet> {
        self.auth(AuthMode::Optional)
    }

    /// Sets the authorization mode explicitly.
    #[must_use]
    pub fn auth(self, mode: AuthMode) -> ProcedureBuilder<AuthorizationSet> {
        ProcedureBuilder {
            name: self.name,
            mode,
            stage: AuthorizationSet,
        }
    }
}

impl ProcedureBuilder<AuthorizationSet> {
    /// Declares the input type and its schema.
    #[must_use]
    pub fn input<I: DeserializeOwned>(self, schema: Schema) -> ProcedureBuilder<InputSet<I>> {
        ProcedureBuilder {
            name: self.name,
            mode: self.mode,
            stage: InputSet {
                input: InputParser::new(schema),
            },
        }
    }
}

impl<I> ProcedureBuilder<InputSet<I>> {
    /// Declares the output type and its schema.
    #[must_use]
    pub fn output<O: Serialize>(self, schema: Schema) -> ProcedureBuilder<OutputSet<I, O>> {
        ProcedureBuilder {
            name: self.name,
            mode: self.mode,
            stage: OutputSet {
                input: self.stage.input,
                output: OutputContract::new(schema),
            },
        }
    }
}

impl<I, O> ProcedureBuilder<OutputSet<I, O>>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    /// Sets the function computing cache tags after a success.
    #[must_use]
    pub fn invalidates<F>(self, keys: F) -> ProcedureBuilder<InvalidationSet<I, O>>
    where
        I: Clone,
        F: Fn(KeyArgs<'_, I, O>) -> Vec<String> + Send + Sync + 'static,
    {
        let keys: InvalidationKeys<I, O> = Arc::new(keys);
        ProcedureBuilder {
            name: self.name,
            mode: self.mode,
            stage: InvalidationSet {
                input: self.stage.input,
                output: self.stage.output,
                invalidation: Invalidation {
                    keys,
                    retain_input: I::clone,
                },
            },
        }
    }

    /// Sets the handler, producing the callable procedure.
    #[must_use]
    pub fn handler<D, F, Fut>(self, handler: F) -> Procedure<I, O, D>
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(HandlerArgs<I, D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        finish(self.name, self.mode, self.stage.input, self.stage.output, None, handler)
    }
}

impl<I, O> ProcedureBuilder<InvalidationSet<I, O>>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    /// Sets the handler, producing the callable procedure.
    #[must_use]
    pub fn handler<D, F, Fut>(self, handler: F) -> Procedure<I, O, D>
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(HandlerArgs<I, D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        let InvalidationSet {
            input,
            output,
            invalidation,
        } = self.stage;
        finish(self.name, self.mode, input, output, Some(invalidation), handler)
    }
}

fn finish<I, O, D, F, Fut>(
    name: String,
    mode: AuthMode,
    input: InputParser<I>,
    output: OutputContract<O>,
    invalidation: Option<Invalidation<I, O>>,
    handler: F,
) -> Procedure<I, O, D>
where
    D: ?Sized + Send + Sync + 'static,
    F: Fn(HandlerArgs<I, D>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
{
    let handler: HandlerFn<I, O, D> = Arc::new(move |args| Box::pin(handler(args)));
    Procedure::from_definition(Definition {
        name,
        gate: AuthorizationGate::new(mode),
        input,
        output,
        invalidation,
        handler,
    })
}
