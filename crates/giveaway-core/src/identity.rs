//! Caller identity and session projection.
//!
//! The session-resolution collaborator returns a raw [`Session`]. The
//! authorization gate turns it into an [`Identity`] only when the session is
//! complete and unexpired; anything else is treated as "no session".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The resolved caller of a procedure.
///
/// Resolved once per invocation and never cached beyond it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier.
    pub id: String,
    /// Email address, when the auth provider shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the underlying session stops being valid.
    pub expires: DateTime<Utc>,
}

impl Identity {
    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes the email address.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("user:{}", self.id)
    }
}

/// User part of a raw session as returned by the auth provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User identifier, possibly missing for incomplete sessions.
    #[serde(default)]
    pub id: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Expiry timestamp, possibly missing for incomplete sessions.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

/// A raw session, `{ user: { id, expires, ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The session's user.
    pub user: SessionUser,
}

impl Session {
    /// Creates a complete session for `id` expiring at `expires`.
    #[must_use]
    pub fn new(id: impl Into<String>, expires: DateTime<Utc>) -> Self {
        Self {
            user: SessionUser {
                id: Some(id.into()),
                email: None,
                name: None,
                expires: Some(expires),
            },
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.user.name = Some(name.into());
        self
    }

    /// Returns `true` if the session has an id and expires strictly after `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let has_id = self.user.id.as_deref().is_some_and(|id| !id.is_empty());
        let unexpired = self.user.expires.is_some_and(|expires| expires > now);
        has_id && unexpired
    }

    /// Projects the session onto an [`Identity`].
    ///
    /// Returns `None` for incomplete sessions and for sessions whose expiry is
    /// at or before `now`.
    #[must_use]
    pub fn into_identity(self, now: DateTime<Utc>) -> Option<Identity> {
        if !self.is_fresh(now) {
            return None;
        }
        let SessionUser {
            id,
            email,
            name,
            expires,
        } = self.user;
        Some(Identity {
            id: id?,
            email,
            name,
            expires: expires?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_fresh_session_projects_identity() {
        let session = Session::new("user_1", now() + Duration::hours(1)).with_email("a@b.co");
        let identity = session.into_identity(now()).expect("fresh session");
        assert_eq!(identity.id, "user_1");
        assert_eq!(identity.email.as_deref(), Some("a@b.co"));
        assert_eq!(identity.log_id(), "user:user_1");
    }

    #[test]
    fn test_expiry_equal_to_now_is_absent() {
        let session = Session::new("user_1", now());
        assert!(session.into_identity(now()).is_none());
    }

    #[test]
    fn test_one_millisecond_ahead_is_present() {
        let session = Session::new("user_1", now() + Duration::milliseconds(1));
        assert!(session.into_identity(now()).is_some());
    }

    #[test]
    fn test_missing_id_is_absent() {
        let mut session = Session::new("user_1", now() + Duration::hours(1));
        session.user.id = None;
        assert!(session.clone().into_identity(now()).is_none());

        session.user.id = Some(String::new());
        assert!(session.into_identity(now()).is_none());
    }

    #[test]
    fn test_missing_expiry_is_absent() {
        let mut session = Session::new("user_1", now());
        session.user.expires = None;
        assert!(session.into_identity(now()).is_none());
    }

    #[test]
    fn test_session_wire_shape() {
        let json = serde_json::json!({
            "user": { "id": "u1", "expires": "2026-03-01T13:00:00Z" }
        });
        let session: Session = serde_json::from_value(json).expect("should deserialize");
        assert!(session.is_fresh(now()));
    }

    proptest! {
        #[test]
        fn prop_freshness_matches_offset(offset_ms in -86_400_000i64..86_400_000i64) {
            let session = Session::new("user_1", now() + Duration::milliseconds(offset_ms));
            prop_assert_eq!(session.into_identity(now()).is_some(), offset_ms > 0);
        }
    }
}
