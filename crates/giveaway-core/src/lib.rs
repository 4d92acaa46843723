//! # Giveaway Core
//!
//! Core types shared by every Giveaway crate:
//!
//! - [`Outcome`] - The `{ ok, ... }` envelope every procedure returns
//! - [`ErrorCode`] / [`AppError`] - The closed failure taxonomy
//! - [`Identity`] / [`Session`] - Caller identity and session freshness
//! - [`Schema`] - Runtime validation for procedure input and output
//! - [`RequestId`] - UUID v7 invocation identifier

#![doc(html_root_url = "https://docs.rs/giveaway-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::future::Future;
use std::pin::Pin;

mod context;
mod error;
mod identity;
mod outcome;
pub mod schema;

pub use context::RequestId;
pub use error::{
    AppError, AppResult, BoxError, ErrorCode, UnknownErrorCode, INTERNAL_ERROR_MESSAGE,
};
pub use identity::{Identity, Session, SessionUser};
pub use outcome::{Failure, Outcome};
pub use schema::{Schema, ValidationError};

/// A boxed, sendable future, used by object-safe async collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
