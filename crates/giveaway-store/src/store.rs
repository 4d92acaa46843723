//! The data-store collaborator.
//!
//! [`Store`] is the process-wide handle procedures receive as `db`. It is
//! safe for concurrent use. Multi-step writes go through
//! [`Store::transaction`], which applies a [`StoreTx`] unit of work
//! all-or-nothing.

use giveaway_core::BoxFuture;

use crate::error::StoreResult;
use crate::model::{Entry, Membership, Profile, Sweepstakes, Team};

/// A unit of work run inside [`Store::transaction`].
///
/// Returning `Err` discards every write made through the handle.
pub type TxWork<'a> = Box<dyn FnOnce(&mut dyn StoreTx) -> StoreResult<()> + Send + 'a>;

/// Synchronous view of the store inside a transaction.
pub trait StoreTx {
    /// Looks up a team.
    fn team(&self, id: &str) -> Option<Team>;
    /// Returns `true` if `user_id` belongs to `team_id`.
    fn is_member(&self, team_id: &str, user_id: &str) -> bool;
    /// Looks up a sweepstakes.
    fn sweepstakes(&self, id: &str) -> Option<Sweepstakes>;
    /// Returns the entries of a sweepstakes, oldest first.
    fn entries(&self, sweepstakes_id: &str) -> Vec<Entry>;
    /// Inserts a team. Conflicts if the id is taken.
    fn insert_team(&mut self, team: Team) -> StoreResult<()>;
    /// Adds a membership. Conflicts if it already exists.
    fn add_member(&mut self, membership: Membership) -> StoreResult<()>;
    /// Inserts a sweepstakes. Conflicts if the id is taken.
    fn insert_sweepstakes(&mut self, sweepstakes: Sweepstakes) -> StoreResult<()>;
    /// Replaces a sweepstakes. Not found if it does not exist.
    fn update_sweepstakes(&mut self, sweepstakes: Sweepstakes) -> StoreResult<()>;
}

/// Process-wide data-store handle.
pub trait Store: Send + Sync {
    /// Looks up a team.
    fn team<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Team>>>;

    /// Returns `true` if `user_id` belongs to `team_id`.
    fn is_member<'a>(&'a self, team_id: &'a str, user_id: &'a str)
        -> BoxFuture<'a, StoreResult<bool>>;

    /// Looks up a sweepstakes.
    fn sweepstakes<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Sweepstakes>>>;

    /// Lists a team's sweepstakes, newest first.
    fn list_sweepstakes_for_team<'a>(
        &'a self,
        team_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Sweepstakes>>>;

    /// Looks up a user's profile.
    fn profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<Profile>>>;

    /// Returns the entries of a sweepstakes, oldest first.
    fn entries<'a>(&'a self, sweepstakes_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Entry>>>;

    /// Inserts a team.
    fn insert_team(&self, team: Team) -> BoxFuture<'_, StoreResult<()>>;

    /// Adds a membership.
    fn add_member(&self, membership: Membership) -> BoxFuture<'_, StoreResult<()>>;

    /// Inserts a sweepstakes.
    fn insert_sweepstakes(&self, sweepstakes: Sweepstakes) -> BoxFuture<'_, StoreResult<()>>;

    /// Replaces a sweepstakes.
    fn update_sweepstakes(&self, sweepstakes: Sweepstakes) -> BoxFuture<'_, StoreResult<()>>;

    /// Deletes a sweepstakes only if `user_id` is a member of its team.
    ///
    /// Returns `false` when nothing matched; the caller cannot tell a missing
    /// sweepstakes from one owned by another team.
    fn delete_sweepstakes_owned_by<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>>;

    /// Inserts a profile. Conflicts if the user already has one.
    fn insert_profile(&self, profile: Profile) -> BoxFuture<'_, StoreResult<()>>;

    /// Inserts an entry. Conflicts on a duplicate email for the same sweepstakes.
    fn insert_entry(&self, entry: Entry) -> BoxFuture<'_, StoreResult<()>>;

    /// Runs `work` atomically.
    fn transaction<'a>(&'a self, work: TxWork<'a>) -> BoxFuture<'a, StoreResult<()>>;
}
