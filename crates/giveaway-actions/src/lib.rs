//! # Giveaway Actions
//!
//! The product procedures of the Giveaway app, built with
//! [`giveaway_procedure`] over a [`Store`]:
//!
//! | Procedure | Auth | Effect |
//! |---|---|---|
//! | `createTeam` | required | new team, caller becomes owner |
//! | `createSweepstakes` | required, member | new `DRAFT` sweepstakes |
//! | `updateSweepstakes` | required, member | edit a draft |
//! | `publishSweepstakes` | required, member | `DRAFT` to `ACTIVE` |
//! | `deleteSweepstakes` | required, member | ownership-scoped delete |
//! | `listSweepstakes` | required, member | dashboard list |
//! | `getSweepstakes` | optional | public view |
//! | `enterSweepstakes` | optional | one entry per email |
//! | `pickWinner` | required, member | random draw, ends the sweepstakes |
//! | `fetchProfile` | required | read-only |
//! | `updateProfile` | required | onboarding profile, create once |
//!
//! ```
//! use giveaway_actions::register_all;
//! use giveaway_procedure::ProcedureRegistry;
//! use giveaway_store::Store;
//!
//! let mut registry = ProcedureRegistry::<dyn Store>::new();
//! register_all(&mut registry);
//! assert!(registry.contains("createSweepstakes"));
//! ```

#![doc(html_root_url = "https://docs.rs/giveaway-actions/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod access;
pub mod entries;
pub mod profiles;
pub mod sweepstakes;
pub mod tags;
pub mod teams;

use giveaway_procedure::{Procedure, ProcedureRegistry};
use giveaway_store::Store;

/// A product procedure over the shared store.
pub type Action<I, O> = Procedure<I, O, dyn Store>;

pub use entries::{enter_sweepstakes, pick_winner};
pub use profiles::{fetch_profile, update_profile};
pub use sweepstakes::{
    create_sweepstakes, delete_sweepstakes, get_sweepstakes, list_sweepstakes,
    publish_sweepstakes, update_sweepstakes,
};
pub use teams::create_team;

/// Registers every product procedure under its name.
pub fn register_all(registry: &mut ProcedureRegistry<dyn Store>) -> &mut ProcedureRegistry<dyn Store> {
    registry
        .register(create_team())
        .register(create_sweepstakes())
        .register(update_sweepstakes())
        .register(publish_sweepstakes())
        .register(delete_sweepstakes())
        .register(list_sweepstakes())
        .register(get_sweepstakes())
        .register(enter_sweepstakes())
        .register(pick_winner())
        .register(fetch_profile())
        .register(update_profile())
}
