//! Host-side sweepstakes procedures.
//!
//! Every procedure here requires a signed-in member of the owning team,
//! except [`get_sweepstakes`], which serves the public entry page.

use chrono::{DateTime, Utc};
use giveaway_core::{AppError, Schema};
use giveaway_procedure::{procedure, HandlerArgs};
use giveaway_store::id::{self, SWEEPSTAKES_ID_LEN};
use giveaway_store::{Store, StoreError, Sweepstakes, SweepstakesStatus};
use serde::{Deserialize, Serialize};

use crate::access::{member_sweepstakes, member_team};
use crate::{tags, Action};

/// Name given to a freshly created sweepstakes.
pub const DEFAULT_NAME: &str = "Untitled sweepstakes";

/// Longest sweepstakes name accepted.
pub const MAX_NAME: usize = 120;

/// Attempts at drawing an unused identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 3;

/// Name of [`create_sweepstakes`].
pub const CREATE_SWEEPSTAKES: &str = "createSweepstakes";
/// Name of [`update_sweepstakes`].
pub const UPDATE_SWEEPSTAKES: &str = "updateSweepstakes";
/// Name of [`publish_sweepstakes`].
pub const PUBLISH_SWEEPSTAKES: &str = "publishSweepstakes";
/// Name of [`delete_sweepstakes`].
pub const DELETE_SWEEPSTAKES: &str = "deleteSweepstakes";
/// Name of [`list_sweepstakes`].
pub const LIST_SWEEPSTAKES: &str = "listSweepstakes";
/// Name of [`get_sweepstakes`].
pub const GET_SWEEPSTAKES: &str = "getSweepstakes";

fn id_schema() -> Schema {
    Schema::string().min_length(1).max_length(64)
}

fn status_schema() -> Schema {
    Schema::string().one_of(SweepstakesStatus::NAMES)
}

/// Schema of a serialized [`Sweepstakes`].
pub fn sweepstakes_schema() -> Schema {
    Schema::object()
        .field("id", id_schema())
        .field("teamId", id_schema())
        .field("name", Schema::string().min_length(1).max_length(MAX_NAME))
        .field("status", status_schema())
        .field("startsAt", Schema::string().date_time().nullable())
        .field("endsAt", Schema::string().date_time().nullable())
        .field("winnerEntryId", Schema::string().nullable())
        .field("createdAt", Schema::string().date_time())
}

/// Input naming a team.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    /// Team identifier.
    pub id: String,
}

/// Input naming a sweepstakes.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepstakesId {
    /// Sweepstakes identifier.
    pub id: String,
}

/// Output of [`create_sweepstakes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSweepstakes {
    /// The six-character identifier.
    pub id: String,
}

/// Output of the procedures that change one sweepstakes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepstakesRef {
    /// Sweepstakes identifier.
    pub id: String,
    /// Owning team.
    pub team_id: String,
    /// Status after the change.
    pub status: SweepstakesStatus,
}

impl From<&Sweepstakes> for SweepstakesRef {
    fn from(sweepstakes: &Sweepstakes) -> Self {
        Self {
            id: sweepstakes.id.clone(),
            team_id: sweepstakes.team_id.clone(),
            status: sweepstakes.status,
        }
    }
}

fn ref_schema() -> Schema {
    Schema::object()
        .field("id", id_schema())
        .field("teamId", id_schema())
        .field("status", status_schema())
}

fn ref_tags(sweepstakes: &SweepstakesRef) -> Vec<String> {
    vec![
        tags::team_sweepstakes(&sweepstakes.team_id),
        tags::sweepstakes(&sweepstakes.id),
    ]
}

/// Creates a draft sweepstakes for a team the caller belongs to.
pub fn create_sweepstakes() -> Action<TeamRef, CreatedSweepstakes> {
    procedure(CREATE_SWEEPSTAKES)
        .authorized()
        .input::<TeamRef>(Schema::object().field("id", id_schema()))
        .output::<CreatedSweepstakes>(Schema::object().field(
            "id",
            Schema::string()
                .min_length(SWEEPSTAKES_ID_LEN)
                .max_length(SWEEPSTAKES_ID_LEN),
        ))
        .invalidates(|args| vec![tags::team_sweepstakes(&args.input.id)])
        .handler(|args: HandlerArgs<TeamRef, dyn Store>| async move {
            let user = args.require_user()?.clone();
            let team = member_team(args.db.as_ref(), &args.input.id, &user).await?;

            let mut attempts = 0;
            let sweepstakes = loop {
                let candidate = Sweepstakes {
                    id: id::sweepstakes_id(),
                    team_id: team.id.clone(),
                    name: DEFAULT_NAME.to_string(),
                    status: SweepstakesStatus::Draft,
                    starts_at: None,
                    ends_at: None,
                    winner_entry_id: None,
                    created_at: args.now,
                };
                match args.db.insert_sweepstakes(candidate.clone()).await {
                    Ok(()) => break candidate,
                    Err(StoreError::Conflict(_)) if attempts + 1 < MAX_ID_ATTEMPTS => {
                        attempts += 1;
                        tracing::debug!(attempts, "sweepstakes id taken, drawing another");
                    }
                    Err(err) => anyhow::bail!(AppError::from(err)),
                }
            };

            tracing::info!(sweepstakes_id = %sweepstakes.id, team_id = %team.id, "sweepstakes created");
            anyhow::Ok(CreatedSweepstakes { id: sweepstakes.id })
        })
}

/// Input of [`update_sweepstakes`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSweepstakesInput {
    /// Sweepstakes identifier.
    pub id: String,
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New start of the entry window.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// New end of the entry window.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// Edits a draft sweepstakes.
pub fn update_sweepstakes() -> Action<UpdateSweepstakesInput, SweepstakesRef> {
    procedure(UPDATE_SWEEPSTAKES)
        .authorized()
        .input::<UpdateSweepstakesInput>(
            Schema::object()
                .field("id", id_schema())
                .optional("name", Schema::string().min_length(1).max_length(MAX_NAME))
                .optional("startsAt", Schema::string().date_time())
                .optional("endsAt", Schema::string().date_time()),
        )
        .output::<SweepstakesRef>(ref_schema())
        .invalidates(|args| ref_tags(args.output))
        .handler(
            |args: HandlerArgs<UpdateSweepstakesInput, dyn Store>| async move {
                let user = args.require_user()?.clone();
                let mut sweepstakes =
                    member_sweepstakes(args.db.as_ref(), &args.input.id, &user).await?;

                if sweepstakes.status != SweepstakesStatus::Draft {
                    anyhow::bail!(AppError::bad_request(
                        "Only draft sweepstakes can be edited"
                    ));
                }

                let UpdateSweepstakesInput {
                    name,
                    starts_at,
                    ends_at,
                    ..
                } = args.input;
                if let Some(name) = name {
                    sweepstakes.name = name;
                }
                sweepstakes.starts_at = starts_at.or(sweepstakes.starts_at);
                sweepstakes.ends_at = ends_at.or(sweepstakes.ends_at);
                if let (Some(start), Some(end)) = (sweepstakes.starts_at, sweepstakes.ends_at) {
                    if end <= start {
                        anyhow::bail!(AppError::bad_request(
                            "The end date must be after the start date"
                        ));
                    }
                }

                let updated = SweepstakesRef::from(&sweepstakes);
                args.db
                    .update_sweepstakes(sweepstakes)
                    .await
                    .map_err(AppError::from)?;
                anyhow::Ok(updated)
            },
        )
}

/// Opens a draft sweepstakes for entries.
pub fn publish_sweepstakes() -> Action<SweepstakesId, SweepstakesRef> {
    procedure(PUBLISH_SWEEPSTAKES)
        .authorized()
        .input::<SweepstakesId>(Schema::object().field("id", id_schema()))
        .output::<SweepstakesRef>(ref_schema())
        .invalidates(|args| ref_tags(args.output))
        .handler(|args: HandlerArgs<SweepstakesId, dyn Store>| async move {
            let user = args.require_user()?.clone();
            let mut sweepstakes =
                member_sweepstakes(args.db.as_ref(), &args.input.id, &user).await?;

            if sweepstakes.status != SweepstakesStatus::Draft {
                anyhow::bail!(AppError::bad_request(format!(
                    "Cannot publish a sweepstakes that is {}",
                    sweepstakes.status.as_str()
                )));
            }

            sweepstakes.status = SweepstakesStatus::Active;
            let published = SweepstakesRef::from(&sweepstakes);
            args.db
                .update_sweepstakes(sweepstakes)
                .await
                .map_err(AppError::from)?;
            tracing::info!(sweepstakes_id = %published.id, "sweepstakes published");
            anyhow::Ok(published)
        })
}

/// Deletes a sweepstakes, scoped to the caller's teams.
///
/// A sweepstakes owned by another team is reported as not found.
pub fn delete_sweepstakes() -> Action<SweepstakesId, SweepstakesRef> {
    procedure(DELETE_SWEEPSTAKES)
        .authorized()
        .input::<SweepstakesId>(Schema::object().field("id", id_schema()))
        .output::<SweepstakesRef>(ref_schema())
        .invalidates(|args| ref_tags(args.output))
        .handler(|args: HandlerArgs<SweepstakesId, dyn Store>| async move {
            let user = args.require_user()?.clone();
            let id = args.input.id.as_str();
            let not_found = || AppError::not_found_resource("Sweepstakes", id);

            let sweepstakes = args
                .db
                .sweepstakes(id)
                .await
                .map_err(AppError::from)?
                .ok_or_else(not_found)?;
            let deleted = args
                .db
                .delete_sweepstakes_owned_by(id, &user.id)
                .await
                .map_err(AppError::from)?;
            if !deleted {
                tracing::debug!(sweepstakes_id = %id, user = %user.id, "delete matched nothing");
                anyhow::bail!(not_found());
            }

            tracing::info!(sweepstakes_id = %id, "sweepstakes deleted");
            anyhow::Ok(SweepstakesRef::from(&sweepstakes))
        })
}

/// Input of [`list_sweepstakes`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSweepstakesInput {
    /// Team identifier.
    pub team_id: String,
}

/// Output of [`list_sweepstakes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepstakesList {
    /// The team's sweepstakes, newest first.
    pub sweepstakes: Vec<Sweepstakes>,
}

/// Lists a team's sweepstakes for the dashboard.
pub fn list_sweepstakes() -> Action<ListSweepstakesInput, SweepstakesList> {
    procedure(LIST_SWEEPSTAKES)
        .authorized()
        .input::<ListSweepstakesInput>(Schema::object().field("teamId", id_schema()))
        .output::<SweepstakesList>(
            Schema::object().field("sweepstakes", Schema::array(sweepstakes_schema())),
        )
        .handler(
            |args: HandlerArgs<ListSweepstakesInput, dyn Store>| async move {
                let user = args.require_user()?.clone();
                let team = member_team(args.db.as_ref(), &args.input.team_id, &user).await?;
                let sweepstakes = args
                    .db
                    .list_sweepstakes_for_team(&team.id)
                    .await
                    .map_err(AppError::from)?;
                anyhow::Ok(SweepstakesList { sweepstakes })
            },
        )
}

/// Output of [`get_sweepstakes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSweepstakes {
    /// Sweepstakes identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: SweepstakesStatus,
    /// Number of entries so far.
    pub entry_count: usize,
}

/// Public view of a sweepstakes.
///
/// Drafts are only visible to members of the owning team.
pub fn get_sweepstakes() -> Action<SweepstakesId, PublicSweepstakes> {
    procedure(GET_SWEEPSTAKES)
        .optional_auth()
        .input::<SweepstakesId>(Schema::object().field("id", id_schema()))
        .output::<PublicSweepstakes>(
            Schema::object()
                .field("id", id_schema())
                .field("name", Schema::string().min_length(1))
                .field("status", status_schema())
                .field("entryCount", Schema::integer().minimum_int(0)),
        )
        .handler(|args: HandlerArgs<SweepstakesId, dyn Store>| async move {
            let id = args.input.id.as_str();
            let not_found = || AppError::not_found_resource("Sweepstakes", id);
            let sweepstakes = args
                .db
                .sweepstakes(id)
                .await
                .map_err(AppError::from)?
                .ok_or_else(not_found)?;

            if sweepstakes.status == SweepstakesStatus::Draft {
                let visible = match &args.user {
                    Some(user) => args
                        .db
                        .is_member(&sweepstakes.team_id, &user.id)
                        .await
                        .map_err(AppError::from)?,
                    None => false,
                };
                if !visible {
                    anyhow::bail!(not_found());
                }
            }

            let entry_count = args.db.entries(id).await.map_err(AppError::from)?.len();
            anyhow::Ok(PublicSweepstakes {
                id: sweepstakes.id,
                name: sweepstakes.name,
                status: sweepstakes.status,
                entry_count,
            })
        })
}
