use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use giveaway_core::{AppError, BoxFuture, Session};
use giveaway_procedure::{Credentials, SessionResolver};

/// A session resolver with canned answers.
///
/// Tokens map to sessions; a request without a known token gets the
/// fallback session, if any.
#[derive(Debug, Default)]
pub struct StaticSessions {
    by_token: HashMap<String, Session>,
    fallback: Option<Session>,
    failing: bool,
    calls: AtomicUsize,
}

impl StaticSessions {
    /// A resolver that never finds a session.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A resolver that returns `session` for every request.
    #[must_use]
    pub fn always(session: Session) -> Self {
        Self {
            fallback: Some(session),
            ..Self::default()
        }
    }

    /// A resolver whose backend is down.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Maps a bearer token to a session.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, session: Session) -> Self {
        self.by_token.insert(token.into(), session);
        self
    }

    /// Returns how many times the resolver was consulted.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionResolver for StaticSessions {
    fn resolve<'a>(
        &'a self,
        credentials: Option<&'a Credentials>,
    ) -> BoxFuture<'a, Result<Option<Session>, AppError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = if self.failing {
            Err(AppError::internal("session backend unavailable"))
        } else {
            Ok(credentials
                .and_then(|c| self.by_token.get(c.token()))
                .or(self.fallback.as_ref())
                .cloned())
        };
        Box::pin(async move { answer })
    }
}
