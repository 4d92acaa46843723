//! # Giveaway Test
//!
//! Test doubles for exercising procedures without a real auth provider,
//! cache, or database:
//!
//! - [`FixedClock`] - A clock that only moves when told to
//! - [`StaticSessions`] - Canned session answers, with a call counter
//! - [`RecordingInvalidator`] - Records (or fails) cache tags
//! - [`CountingStore`] - Counts every data-store call
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Duration;
//! use giveaway_test::{epoch, session_for, test_env, CountingStore, StaticSessions};
//!
//! let store = Arc::new(CountingStore::default());
//! let sessions = StaticSessions::always(session_for("alice", epoch() + Duration::hours(1)));
//! let env = test_env(store.clone(), sessions);
//! assert!(env.credentials().is_none());
//! assert_eq!(store.calls(), 0);
//! ```

#![doc(html_root_url = "https://docs.rs/giveaway-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use giveaway_core::Session;
use giveaway_procedure::Environment;
use giveaway_store::Store;

mod clock;
mod invalidation;
mod sessions;
mod store;

pub use clock::FixedClock;
pub use invalidation::RecordingInvalidator;
pub use sessions::StaticSessions;
pub use store::CountingStore;

/// The instant every [`FixedClock::default`] starts at: 2026-01-01T00:00:00Z.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A complete session for `user_id` expiring at `expires`.
#[must_use]
pub fn session_for(user_id: &str, expires: DateTime<Utc>) -> Session {
    Session::new(user_id, expires)
        .with_email(format!("{user_id}@example.com"))
        .with_name(user_id)
}

/// An environment over `store` with `sessions`, a [`FixedClock`] at
/// [`epoch`], and a [`RecordingInvalidator`].
#[must_use]
pub fn test_env<S: Store + 'static>(
    store: Arc<S>,
    sessions: StaticSessions,
) -> Environment<dyn Store> {
    let db: Arc<dyn Store> = store;
    Environment::builder(db)
        .sessions(Arc::new(sessions))
        .clock(Arc::new(FixedClock::default()))
        .cache(Arc::new(RecordingInvalidator::new()))
        .build()
}
