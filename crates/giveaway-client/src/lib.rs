//! # Giveaway Client
//!
//! Call-site helper for invoking procedures:
//!
//! - [`UseProcedure`] - loading flag, observable [`CallState`], success and
//!   failure callbacks, toast on failure by default
//! - [`LocalCaller`] - in-process calls against an [`Environment`](giveaway_procedure::Environment)
//! - [`HttpCaller`] - `POST /procedures/{name}` against a running server
//! - [`ToastQueue`] - the default [`Notifier`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use giveaway_client::{LocalCaller, ToastQueue, UseProcedure};
//! use giveaway_core::Schema;
//! use giveaway_procedure::{procedure, Environment, HandlerArgs};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Greet { name: String }
//!
//! #[derive(Clone, Serialize)]
//! struct Greeting { text: String }
//!
//! # tokio_test::block_on(async {
//! let greet = procedure("greet")
//!     .optional_auth()
//!     .input::<Greet>(Schema::object().field("name", Schema::string()))
//!     .output::<Greeting>(Schema::object().field("text", Schema::string()))
//!     .handler(|args: HandlerArgs<Greet, ()>| async move {
//!         anyhow::Ok(Greeting { text: format!("Hello, {}", args.input.name) })
//!     });
//!
//! let env = Environment::builder(Arc::new(())).build();
//! let toasts = Arc::new(ToastQueue::default());
//! let hook = UseProcedure::<Greeting>::new(Arc::new(LocalCaller::new(greet, env)))
//!     .notifier(toasts.clone());
//!
//! let outcome = hook.run(&json!({ "name": "Ann" })).await;
//! assert_eq!(outcome.ok().map(|g| g.text.as_str()), Some("Hello, Ann"));
//!
//! let outcome = hook.run(&json!({})).await;
//! assert!(!outcome.is_ok());
//! assert_eq!(toasts.messages().len(), 1);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/giveaway-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod caller;
mod hook;
mod notify;

pub use caller::{
    HttpCaller, LocalCaller, ProcedureCaller, TransportError, TRANSPORT_FAILURE_MESSAGE,
};
pub use hook::{CallState, UseProcedure};
pub use notify::{Notifier, Toast, ToastLevel, ToastQueue, DEFAULT_TOAST_TTL};
