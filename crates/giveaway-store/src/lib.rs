//! # Giveaway Store
//!
//! The data-store collaborator handed to every procedure as `db`:
//!
//! - [`Store`] - Object-safe async handle with scoped transactions
//! - [`MemoryStore`] - In-process implementation
//! - [`model`] - Teams, memberships, sweepstakes, profiles, entries

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod id;
mod memory;
pub mod model;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use model::{Entry, Membership, Profile, Role, Sweepstakes, SweepstakesStatus, Team};
pub use store::{Store, StoreTx, TxWork};
