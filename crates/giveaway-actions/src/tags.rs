//! Cache-tag conventions.
//!
//! Pages that render a resource subscribe to its tag; procedures that change
//! the resource invalidate it.

/// Teams visible to `user_id`.
#[must_use]
pub fn teams(user_id: &str) -> String {
    format!("teams:{user_id}")
}

/// The sweepstakes list of `team_id`.
#[must_use]
pub fn team_sweepstakes(team_id: &str) -> String {
    format!("team-sweepstakes:{team_id}")
}

/// A single sweepstakes.
#[must_use]
pub fn sweepstakes(id: &str) -> String {
    format!("sweepstakes:{id}")
}

/// Entries of a sweepstakes.
#[must_use]
pub fn entries(sweepstakes_id: &str) -> String {
    format!("entries:{sweepstakes_id}")
}

/// A user's profile.
#[must_use]
pub fn profile(user_id: &str) -> String {
    format!("profile:{user_id}")
}
