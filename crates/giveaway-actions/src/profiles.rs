//! Onboarding profile procedures.

use giveaway_core::{AppError, Schema};
use giveaway_procedure::{procedure, HandlerArgs};
use giveaway_store::{Profile, Store};
use serde::{Deserialize, Serialize};

use crate::{tags, Action};

/// Name of [`fetch_profile`].
pub const FETCH_PROFILE: &str = "fetchProfile";
/// Name of [`update_profile`].
pub const UPDATE_PROFILE: &str = "updateProfile";

/// Input of [`fetch_profile`]; always empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchProfileInput {}

/// Output of [`fetch_profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    /// The caller's profile, if onboarding is done.
    pub profile: Option<Profile>,
}

fn profile_schema() -> Schema {
    Schema::object()
        .field("userId", Schema::string().min_length(1))
        .field("displayName", Schema::string().min_length(1))
        .field("bio", Schema::string().nullable())
        .field("createdAt", Schema::string().date_time())
}

/// Returns the caller's profile. Read-only.
pub fn fetch_profile() -> Action<FetchProfileInput, ProfileView> {
    procedure(FETCH_PROFILE)
        .authorized()
        .input::<FetchProfileInput>(Schema::object())
        .output::<ProfileView>(Schema::object().field("profile", profile_schema().nullable()))
        .handler(|args: HandlerArgs<FetchProfileInput, dyn Store>| async move {
            let user = args.require_user()?;
            let profile = args.db.profile(&user.id).await.map_err(AppError::from)?;
            anyhow::Ok(ProfileView { profile })
        })
}

/// Input of [`update_profile`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    /// Must be the caller's own id.
    pub user_id: String,
    /// Public display name.
    pub display_name: String,
    /// Optional bio.
    #[serde(default)]
    pub bio: Option<String>,
}

/// Output of [`update_profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProfile {
    /// Owner of the saved profile.
    pub user_id: String,
}

/// Creates the caller's onboarding profile.
///
/// Fails with `CONFLICT` when the profile already exists; nothing is
/// overwritten.
pub fn update_profile() -> Action<UpdateProfileInput, SavedProfile> {
    procedure(UPDATE_PROFILE)
        .authorized()
        .input::<UpdateProfileInput>(
            Schema::object()
                .field("userId", Schema::string().min_length(1))
                .field("displayName", Schema::string().min_length(1).max_length(80))
                .optional("bio", Schema::string().max_length(280).nullable()),
        )
        .output::<SavedProfile>(Schema::object().field("userId", Schema::string().min_length(1)))
        .invalidates(|args| vec![tags::profile(&args.output.user_id)])
        .handler(|args: HandlerArgs<UpdateProfileInput, dyn Store>| async move {
            let user = args.require_user()?;
            if args.input.user_id != user.id {
                anyhow::bail!(AppError::forbidden("You can only edit your own profile"));
            }

            let UpdateProfileInput {
                user_id,
                display_name,
                bio,
            } = args.input;
            let profile = Profile {
                user_id: user_id.clone(),
                display_name,
                bio: bio.filter(|b| !b.trim().is_empty()),
                created_at: args.now,
            };
            args.db
                .insert_profile(profile)
                .await
                .map_err(AppError::from)?;
            anyhow::Ok(SavedProfile { user_id })
        })
}
