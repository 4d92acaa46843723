//! Type-erased procedure registry.
//!
//! The HTTP surface dispatches by name; it never knows a procedure's input or
//! output types. Registered procedures are stored behind [`ErasedProcedure`],
//! which returns the success payload as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use giveaway_core::{AppError, Outcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::environment::Environment;
use crate::gate::AuthMode;
use crate::procedure::Procedure;
use crate::BoxFuture;

/// A procedure whose input and output types have been erased.
pub trait ErasedProcedure<D: ?Sized>: Send + Sync {
    /// Returns the procedure name.
    fn name(&self) -> &str;

    /// Returns the authorization mode.
    fn auth_mode(&self) -> AuthMode;

    /// Invokes the procedure, returning the success payload as JSON.
    fn invoke<'a>(
        &'a self,
        env: &'a Environment<D>,
        raw: Value,
    ) -> BoxFuture<'a, Outcome<Value>>;
}

impl<I, O, D> ErasedProcedure<D> for Procedure<I, O, D>
where
    I: DeserializeOwned + Send + Sync + 'static,
    O: Serialize + Send + Sync + 'static,
    D: ?Sized + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        Procedure::name(self)
    }

    fn auth_mode(&self) -> AuthMode {
        Procedure::auth_mode(self)
    }

    fn invoke<'a>(
        &'a self,
        env: &'a Environment<D>,
        raw: Value,
    ) -> BoxFuture<'a, Outcome<Value>> {
        Box::pin(async move {
            match self.call(env, raw).await {
                Outcome::Success(output) => match serde_json::to_value(output) {
                    Ok(value) => Outcome::Success(value),
                    Err(err) => {
                        tracing::error!(error = %err, "procedure output could not be serialized");
                        AppError::internal_generic().into()
                    }
                },
                Outcome::Failure(failure) => Outcome::Failure(failure),
            }
        })
    }
}

/// Summary of a registered procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcedureInfo {
    /// Procedure name.
    pub name: String,
    /// Authorization mode.
    pub auth: AuthMode,
}

/// Registry mapping procedure names to type-erased procedures.
///
/// # Example
///
/// ```
/// use giveaway_procedure::ProcedureRegistry;
///
/// let registry = ProcedureRegistry::<()>::new();
/// assert!(registry.is_empty());
/// ```
pub struct ProcedureRegistry<D: ?Sized> {
    procedures: BTreeMap<String, Arc<dyn ErasedProcedure<D>>>,
}

impl<D: ?Sized> Default for ProcedureRegistry<D> {
    fn default() -> Self {
        Self {
            procedures: BTreeMap::new(),
        }
    }
}

impl<D: ?Sized> std::fmt::Debug for ProcedureRegistry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureRegistry")
            .field("procedures", &self.procedures.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<D: ?Sized + Send + Sync + 'static> ProcedureRegistry<D> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `procedure` under its name, replacing any previous one.
    pub fn register<P>(&mut self, procedure: P) -> &mut Self
    where
        P: ErasedProcedure<D> + 'static,
    {
        let name = procedure.name().to_string();
        if self.procedures.insert(name.clone(), Arc::new(procedure)).is_some() {
            tracing::warn!(procedure = %name, "procedure registered twice; keeping the last");
        }
        self
    }

    /// Returns `true` if a procedure is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.procedures.keys().map(String::as_str).collect()
    }

    /// Describes every registered procedure.
    #[must_use]
    pub fn describe(&self) -> Vec<ProcedureInfo> {
        self.procedures
            .values()
            .map(|procedure| ProcedureInfo {
                name: procedure.name().to_string(),
                auth: procedure.auth_mode(),
            })
            .collect()
    }

    /// Returns the number of registered procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Invokes the procedure registered under `name`.
    ///
    /// Returns `None` if no such procedure exists.
    pub async fn invoke(
        &self,
        name: &str,
        env: &Environment<D>,
        raw: Value,
    ) -> Option<Outcome<Value>> {
        let procedure = Arc::clone(self.procedures.get(name)?);
        Some(procedure.invoke(env, raw).await)
    }
}
