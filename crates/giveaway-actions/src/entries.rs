//! Entrant-facing entry flow and winner selection.

use giveaway_core::{AppError, Schema};
use giveaway_procedure::{procedure, HandlerArgs};
use giveaway_store::{id, Entry, Store, StoreError, StoreTx, SweepstakesStatus};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::access::member_sweepstakes;
use crate::sweepstakes::SweepstakesId;
use crate::{tags, Action};

/// Name of [`enter_sweepstakes`].
pub const ENTER_SWEEPSTAKES: &str = "enterSweepstakes";
/// Name of [`pick_winner`].
pub const PICK_WINNER: &str = "pickWinner";

/// Input of [`enter_sweepstakes`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterInput {
    /// The sweepstakes to enter.
    pub sweepstakes_id: String,
    /// Entrant email.
    pub email: String,
    /// Entrant name.
    pub name: String,
}

/// Output of [`enter_sweepstakes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReceipt {
    /// The new entry's id.
    pub entry_id: String,
}

/// Enters a participant into an active sweepstakes.
///
/// Open to anonymous callers. One entry per email address.
pub fn enter_sweepstakes() -> Action<EnterInput, EntryReceipt> {
    procedure(ENTER_SWEEPSTAKES)
        .optional_auth()
        .input::<EnterInput>(
            Schema::object()
                .field("sweepstakesId", Schema::string().min_length(1))
                .field("email", Schema::string().email().max_length(254))
                .field("name", Schema::string().min_length(1).max_length(80)),
        )
        .output::<EntryReceipt>(Schema::object().field("entryId", Schema::string().min_length(1)))
        .invalidates(|args| {
            vec![
                tags::entries(&args.input.sweepstakes_id),
                tags::sweepstakes(&args.input.sweepstakes_id),
            ]
        })
        .handler(|args: HandlerArgs<EnterInput, dyn Store>| async move {
            let input = args.input;
            let sweepstakes = args
                .db
                .sweepstakes(&input.sweepstakes_id)
                .await
                .map_err(AppError::from)?
                .filter(|s| s.status != SweepstakesStatus::Draft)
                .ok_or_else(|| AppError::not_found_resource("Sweepstakes", &input.sweepstakes_id))?;

            if sweepstakes.status != SweepstakesStatus::Active {
                anyhow::bail!(AppError::bad_request(
                    "This sweepstakes is not accepting entries"
                ));
            }
            let now = args.now;
            if sweepstakes.starts_at.is_some_and(|start| now < start) {
                anyhow::bail!(AppError::bad_request("This sweepstakes has not started yet"));
            }
            if sweepstakes.ends_at.is_some_and(|end| now >= end) {
                anyhow::bail!(AppError::bad_request("This sweepstakes has ended"));
            }

            let entry = Entry {
                id: id::prefixed_id("entry"),
                sweepstakes_id: sweepstakes.id,
                email: input.email.trim().to_lowercase(),
                name: input.name.trim().to_string(),
                created_at: now,
            };
            let receipt = EntryReceipt {
                entry_id: entry.id.clone(),
            };
            args.db.insert_entry(entry).await.map_err(AppError::from)?;
            anyhow::Ok(receipt)
        })
}

/// Output of [`pick_winner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    /// The drawn entry.
    pub entry_id: String,
    /// Its email, for contacting the winner.
    pub email: String,
    /// Team owning the sweepstakes.
    pub team_id: String,
}

/// Draws a winner uniformly at random and ends the sweepstakes.
pub fn pick_winner() -> Action<SweepstakesId, Winner> {
    procedure(PICK_WINNER)
        .authorized()
        .input::<SweepstakesId>(Schema::object().field("id", Schema::string().min_length(1)))
        .output::<Winner>(
            Schema::object()
                .field("entryId", Schema::string().min_length(1))
                .field("email", Schema::string().email())
                .field("teamId", Schema::string().min_length(1)),
        )
        .invalidates(|args| {
            vec![
                tags::team_sweepstakes(&args.output.team_id),
                tags::sweepstakes(&args.input.id),
            ]
        })
        .handler(|args: HandlerArgs<SweepstakesId, dyn Store>| async move {
            let user = args.require_user()?.clone();
            let sweepstakes = member_sweepstakes(args.db.as_ref(), &args.input.id, &user).await?;

            if !matches!(
                sweepstakes.status,
                SweepstakesStatus::Active | SweepstakesStatus::Ended
            ) {
                anyhow::bail!(AppError::bad_request(
                    "Winners can only be drawn for active or ended sweepstakes"
                ));
            }
            if sweepstakes.winner_entry_id.is_some() {
                anyhow::bail!(AppError::conflict("A winner has already been picked"));
            }

            let team_id = sweepstakes.team_id;
            let id = sweepstakes.id;
            let mut drawn: Option<Entry> = None;
            let slot = &mut drawn;
            args.db
                .transaction(Box::new(move |tx: &mut dyn StoreTx| {
                    let mut current = tx
                        .sweepstakes(&id)
                        .ok_or_else(|| StoreError::not_found("Sweepstakes", id.clone()))?;
                    if current.winner_entry_id.is_some() {
                        return Err(StoreError::conflict("A winner has already been picked"));
                    }
                    let entries = tx.entries(&id);
                    let Some(winner) = entries.choose(&mut rand::thread_rng()).cloned() else {
                        return Ok(());
                    };
                    current.status = SweepstakesStatus::Ended;
                    current.winner_entry_id = Some(winner.id.clone());
                    tx.update_sweepstakes(current)?;
                    *slot = Some(winner);
                    Ok(())
                }))
                .await
                .map_err(AppError::from)?;

            let Some(winner) = drawn else {
                anyhow::bail!(AppError::bad_request("There are no entries to draw from"));
            };
            tracing::info!(sweepstakes_id = %winner.sweepstakes_id, entry_id = %winner.id, "winner picked");
            anyhow::Ok(Winner {
                entry_id: winner.id,
                email: winner.email,
                team_id,
            })
        })
}
