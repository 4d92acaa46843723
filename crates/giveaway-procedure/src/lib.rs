//! # Giveaway Procedure
//!
//! Typed server procedures. A procedure bundles an authorization mode, an
//! input schema, an output schema, an optional cache-invalidation function
//! and a handler, and is invoked as `raw input -> Outcome`:
//!
//! ```
//! use std::sync::Arc;
//! use giveaway_core::{AppError, ErrorCode, Schema};
//! use giveaway_procedure::{procedure, Environment, HandlerArgs};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct Input { name: String }
//!
//! #[derive(Serialize)]
//! struct Output { id: String }
//!
//! let create_team = procedure("createTeam")
//!     .authorized()
//!     .input::<Input>(Schema::object().field("name", Schema::string().min_length(1)))
//!     .output::<Output>(Schema::object().field("id", Schema::string()))
//!     .handler(|args: HandlerArgs<Input, ()>| async move {
//!         let user = args.require_user()?;
//!         anyhow::Ok(Output { id: format!("{}-{}", user.id, args.input.name) })
//!     });
//!
//! # tokio_test::block_on(async {
//! let env = Environment::builder(Arc::new(())).build();
//! let outcome = create_team.call(&env, serde_json::json!({ "name": "Ops" })).await;
//! assert_eq!(outcome.code(), Some(ErrorCode::Unauthorized));
//! # });
//! ```
//!
//! Procedures never panic and never return `Err` to their caller.

#![doc(html_root_url = "https://docs.rs/giveaway-procedure/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod builder;
mod clock;
mod environment;
pub mod gate;
pub mod invalidation;
mod procedure;
pub mod registry;
mod session;
pub mod validation;

pub use giveaway_core::BoxFuture;

pub use builder::{procedure, ProcedureBuilder};
pub use clock::{Clock, SystemClock};
pub use environment::{Environment, EnvironmentBuilder};
pub use gate::{AuthMode, AuthorizationGate, SIGN_IN_REQUIRED};
pub use invalidation::{
    CacheInvalidator, CacheStats, InvalidationError, InvalidationKeys, KeyArgs, NoopInvalidator,
    TagCache, TagCacheConfig, TagSnapshot,
};
pub use procedure::{HandlerArgs, Procedure};
pub use registry::{ErasedProcedure, ProcedureInfo, ProcedureRegistry};
pub use session::{Credentials, NoSessions, SessionResolver};
pub use validation::{InputParser, OutputContract};
