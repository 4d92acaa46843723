//! Team procedures.

use giveaway_core::{AppError, Schema};
use giveaway_procedure::{procedure, HandlerArgs};
use giveaway_store::{id, Membership, Role, Store, StoreTx, Team};
use serde::{Deserialize, Serialize};

use crate::{tags, Action};

/// Name of the team-creation procedure.
pub const CREATE_TEAM: &str = "createTeam";

/// Longest team name accepted.
pub const MAX_TEAM_NAME: usize = 64;

/// Input of [`create_team`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamInput {
    /// Display name.
    pub name: String,
}

/// Output of [`create_team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTeam {
    /// The new team's id.
    pub id: String,
}

/// Creates a team owned by the caller.
pub fn create_team() -> Action<CreateTeamInput, CreatedTeam> {
    procedure(CREATE_TEAM)
        .authorized()
        .input::<CreateTeamInput>(
            Schema::object().field("name", Schema::string().min_length(1).max_length(MAX_TEAM_NAME)),
        )
        .output::<CreatedTeam>(Schema::object().field("id", Schema::string().min_length(1)))
        .invalidates(|args| {
            args.user
                .map(|user| vec![tags::teams(&user.id)])
                .unwrap_or_default()
        })
        .handler(|args: HandlerArgs<CreateTeamInput, dyn Store>| async move {
            let user = args.require_user()?.clone();
            let name = args.input.name.trim().to_string();
            if name.is_empty() {
                anyhow::bail!(AppError::validation("$.name: must not be blank"));
            }

            let team = Team {
                id: id::prefixed_id("team"),
                name,
                owner_id: user.id.clone(),
            };
            let membership = Membership {
                team_id: team.id.clone(),
                user_id: user.id.clone(),
                role: Role::Owner,
            };
            let created = CreatedTeam {
                id: team.id.clone(),
            };

            args.db
                .transaction(Box::new(move |tx: &mut dyn StoreTx| {
                    tx.insert_team(team)?;
                    tx.add_member(membership)
                }))
                .await
                .map_err(AppError::from)?;

            tracing::info!(team_id = %created.id, owner = %user.id, "team created");
            anyhow::Ok(created)
        })
}
