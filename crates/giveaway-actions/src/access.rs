//! Team membership checks shared by the host-side procedures.

use giveaway_core::{AppError, Identity};
use giveaway_store::{Store, Sweepstakes, Team};

/// Message for callers outside the owning team.
pub(crate) const NOT_A_MEMBER: &str = "You are not a member of this team";

/// Loads `team_id` and checks that `user` belongs to it.
pub(crate) async fn member_team(
    db: &dyn Store,
    team_id: &str,
    user: &Identity,
) -> Result<Team, AppError> {
    let team = db
        .team(team_id)
        .await?
        .ok_or_else(|| AppError::not_found_resource("Team", team_id))?;
    if !db.is_member(team_id, &user.id).await? {
        return Err(AppError::forbidden(NOT_A_MEMBER));
    }
    Ok(team)
}

/// Loads sweepstakes `id` and checks that `user` belongs to its team.
pub(crate) async fn member_sweepstakes(
    db: &dyn Store,
    id: &str,
    user: &Identity,
) -> Result<Sweepstakes, AppError> {
    let sweepstakes = db
        .sweepstakes(id)
        .await?
        .ok_or_else(|| AppError::not_found_resource("Sweepstakes", id))?;
    if !db.is_member(&sweepstakes.team_id, &user.id).await? {
        return Err(AppError::forbidden(NOT_A_MEMBER));
    }
    Ok(sweepstakes)
}
