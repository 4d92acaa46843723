//! Bearer-token session resolution.
//!
//! [`TokenSessions`] maps opaque tokens to sessions. A session registered
//! without an expiry is issued fresh on every lookup, valid for the
//! configured lifetime from the resolver's clock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use giveaway_config::SessionsConfig;
use giveaway_core::{AppError, Session};
use giveaway_procedure::{BoxFuture, Clock, Credentials, SessionResolver, SystemClock};
use parking_lot::RwLock;

const BEARER: &str = "bearer";

/// Extracts the token from an `Authorization: Bearer <token>` value.
///
/// The scheme is case-insensitive. Returns `None` for other schemes and
/// for an empty token.
///
/// ```
/// use giveaway_server::sessions::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc"), Some("abc"));
/// assert_eq!(bearer_token("bearer   abc "), Some("abc"));
/// assert_eq!(bearer_token("Basic abc"), None);
/// assert_eq!(bearer_token("Bearer "), None);
/// ```
#[must_use]
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// In-memory token to session map.
pub struct TokenSessions {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSessions")
            .field("tokens", &self.sessions.read().len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSessions {
    /// Creates an empty resolver issuing sessions valid for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            clock: Arc::new(SystemClock),
        }
    }

    /// Builds a resolver from the `[sessions]` configuration section.
    #[must_use]
    pub fn from_config(config: &SessionsConfig) -> Self {
        let ttl = i64::try_from(config.session_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let resolver = Self::new(ttl);
        for grant in &config.tokens {
            let mut session = Session::default();
            session.user.id = Some(grant.user_id.clone());
            session.user.email.clone_from(&grant.email);
            session.user.name.clone_from(&grant.name);
            resolver.insert(grant.token.clone(), session);
        }
        resolver
    }

    /// Uses `clock` to stamp issued sessions.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers `session` under `token`, replacing any previous one.
    ///
    /// Leave `session.user.expires` unset to have it issued per lookup.
    pub fn insert(&self, token: impl Into<String>, session: Session) {
        self.sessions.write().insert(token.into(), session);
    }

    /// Forgets `token`. Returns `true` if it was known.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    /// Number of known tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` when no token is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn lookup(&self, token: &str) -> Option<Session> {
        let mut session = self.sessions.read().get(token).cloned()?;
        if session.user.expires.is_none() {
            let now = self.clock.now();
            session.user.expires = Some(now.checked_add_signed(self.ttl).unwrap_or(now));
        }
        Some(session)
    }
}

impl SessionResolver for TokenSessions {
    fn resolve<'a>(
        &'a self,
        credentials: Option<&'a Credentials>,
    ) -> BoxFuture<'a, Result<Option<Session>, AppError>> {
        Box::pin(async move { Ok(credentials.and_then(|c| self.lookup(c.token()))) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use giveaway_config::StaticToken;

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn config() -> SessionsConfig {
        SessionsConfig {
            session_ttl_secs: 60,
            tokens: vec![StaticToken {
                token: "tok_alice".to_string(),
                user_id: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
                name: None,
            }],
            ..SessionsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_configured_token_issues_fresh_session() {
        let sessions = TokenSessions::from_config(&config()).with_clock(Arc::new(Frozen(noon())));
        let credentials = Credentials::bearer("tok_alice");

        let session = sessions
            .resolve(Some(&credentials))
            .await
            .expect("resolver never fails")
            .expect("known token");

        assert_eq!(session.user.id.as_deref(), Some("alice"));
        assert_eq!(session.user.expires, Some(noon() + Duration::seconds(60)));
        assert!(session.is_fresh(noon()));
    }

    #[tokio::test]
    async fn test_unknown_or_missing_token_has_no_session() {
        let sessions = TokenSessions::from_config(&config());
        let stranger = Credentials::bearer("tok_mallory");

        assert!(sessions.resolve(Some(&stranger)).await.expect("ok").is_none());
        assert!(sessions.resolve(None).await.expect("ok").is_none());
    }

    #[tokio::test]
    async fn test_explicit_expiry_is_kept() {
        let sessions = TokenSessions::new(Duration::hours(1));
        sessions.insert("old", Session::new("bob", noon()));

        let session = sessions
            .resolve(Some(&Credentials::bearer("old")))
            .await
            .expect("ok")
            .expect("known token");
        assert_eq!(session.user.expires, Some(noon()));

        assert!(sessions.revoke("old"));
        assert!(sessions.is_empty());
    }
}
