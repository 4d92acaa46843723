//! Entities persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team of hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The user who created the team.
    pub owner_id: String,
}

/// A member's role within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Created the team.
    Owner,
    /// Invited member.
    Member,
}

/// Membership of a user in a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Team identifier.
    pub team_id: String,
    /// User identifier.
    pub user_id: String,
    /// Role within the team.
    pub role: Role,
}

/// Lifecycle of a sweepstakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SweepstakesStatus {
    /// Being edited; not visible to entrants.
    Draft,
    /// Accepting entries.
    Active,
    /// Closed; a winner may have been drawn.
    Ended,
    /// Withdrawn.
    Cancelled,
}

impl SweepstakesStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Ended => "ENDED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// All wire names.
    pub const NAMES: [&'static str; 4] = ["DRAFT", "ACTIVE", "ENDED", "CANCELLED"];
}

/// A giveaway owned by a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sweepstakes {
    /// Six-character public identifier.
    pub id: String,
    /// Owning team.
    pub team_id: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: SweepstakesStatus,
    /// When entries open.
    pub starts_at: Option<DateTime<Utc>>,
    /// When entries close.
    pub ends_at: Option<DateTime<Utc>>,
    /// The drawn entry, once a winner is picked.
    pub winner_entry_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A user's public profile, created during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Owning user.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Optional bio.
    pub bio: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One participant's entry into a sweepstakes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Entry identifier.
    pub id: String,
    /// The sweepstakes entered.
    pub sweepstakes_id: String,
    /// Entrant email; unique per sweepstakes.
    pub email: String,
    /// Entrant name.
    pub name: String,
    /// Entry time.
    pub created_at: DateTime<Utc>,
}
