//! # Giveaway Server
//!
//! HTTP transport for Giveaway procedures, built on hyper:
//!
//! - `POST /procedures/{name}` for every registered procedure
//! - Bearer-token session resolution ([`TokenSessions`])
//! - `/health`, `/ready` and `/metrics` endpoints
//! - Graceful shutdown with connection draining
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use giveaway_actions::register_all;
//! use giveaway_procedure::{Environment, ProcedureRegistry};
//! use giveaway_server::{Server, TokenSessions};
//! use giveaway_store::{MemoryStore, Store};
//!
//! # async fn serve() -> Result<(), giveaway_server::ServerError> {
//! let db: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! let env = Environment::builder(db)
//!     .sessions(Arc::new(TokenSessions::new(chrono::Duration::hours(1))))
//!     .build();
//!
//! let mut registry = ProcedureRegistry::new();
//! register_all(&mut registry);
//!
//! Server::builder()
//!     .http_addr("127.0.0.1:8080")
//!     .registry(registry)
//!     .environment(env)
//!     .build()?
//!     .run()
//!     .await
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/giveaway-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod health;
mod server;
pub mod sessions;
pub mod shutdown;

pub use error::ServerError;
pub use health::{HealthCheck, HealthStatus, ReadinessCheck, ReadinessStatus};
pub use server::{BoundServer, Server, ServerBuilder, PROCEDURE_PREFIX};
pub use sessions::TokenSessions;
pub use shutdown::ShutdownSignal;
