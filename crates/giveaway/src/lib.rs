//! # Giveaway
//!
//! Typed server procedures for hosting sweepstakes.
//!
//! A procedure bundles an authorization mode, input and output schemas,
//! cache-tag invalidation and a handler. Every call returns an
//! [`Outcome`](prelude::Outcome): `{ "ok": true, ... }` on success or
//! `{ "ok": false, "code", "message" }` on failure, never a panic.
//!
//! ## Crates
//!
//! | Module | Crate |
//! |---|---|
//! | [`core`] | envelope, error codes, identity, schemas |
//! | [`procedure`] | builder, gate, validation, invalidation, registry |
//! | [`store`] | data-store collaborator and the in-memory store |
//! | [`actions`] | team, sweepstakes, entry and profile procedures |
//! | [`client`] | call-site helper with local and HTTP transports |
//! | [`config`] | layered configuration |
//! | [`telemetry`] | logging and metrics |
//! | [`server`] | HTTP server |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use giveaway::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Deserialize)]
//! struct Rename { id: String, name: String }
//!
//! #[derive(Serialize)]
//! struct Renamed { id: String }
//!
//! let rename = procedure("renameThing")
//!     .authorized()
//!     .input::<Rename>(
//!         Schema::object()
//!             .field("id", Schema::string())
//!             .field("name", Schema::string().min_length(1)),
//!     )
//!     .output::<Renamed>(Schema::object().field("id", Schema::string()))
//!     .invalidates(|args| vec![format!("thing:{}", args.input.id)])
//!     .handler(|args: HandlerArgs<Rename, ()>| async move {
//!         anyhow::Ok(Renamed { id: args.input.id })
//!     });
//!
//! # tokio_test::block_on(async {
//! let env = Environment::builder(Arc::new(())).build();
//! let outcome = rename
//!     .call(&env, serde_json::json!({ "id": "t1", "name": "New" }))
//!     .await;
//! assert_eq!(outcome.code(), Some(ErrorCode::Unauthorized));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/giveaway/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use giveaway_actions as actions;
pub use giveaway_client as client;
pub use giveaway_config as config;
pub use giveaway_core as core;
pub use giveaway_procedure as procedure;
pub use giveaway_server as server;
pub use giveaway_store as store;
pub use giveaway_telemetry as telemetry;

/// Common imports.
///
/// ```rust,ignore
/// use giveaway::prelude::*;
/// ```
pub mod prelude {
    pub use giveaway_core::{AppError, ErrorCode, Failure, Identity, Outcome, Schema, Session};

    pub use giveaway_procedure::{
        procedure, AuthMode, CacheInvalidator, Clock, Credentials, Environment, HandlerArgs,
        Procedure, ProcedureRegistry, SessionResolver, TagCache,
    };

    pub use giveaway_store::{MemoryStore, Store, StoreError};

    pub use giveaway_actions::{register_all, Action};

    pub use giveaway_client::{
        CallState, HttpCaller, LocalCaller, Notifier, ProcedureCaller, ToastQueue, UseProcedure,
    };

    pub use giveaway_config::{ConfigLoader, GiveawayConfig};

    pub use giveaway_server::{Server, ShutdownSignal, TokenSessions};
}
