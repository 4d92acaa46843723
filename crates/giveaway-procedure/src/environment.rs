//! Process-wide collaborators handed to every invocation.

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::invalidation::{CacheInvalidator, NoopInvalidator};
use crate::session::{Credentials, NoSessions, SessionResolver};

/// Everything a procedure needs besides its input.
///
/// The shared environment holds no request state. A server scopes it per
/// request with [`Environment::with_credentials`], which only clones `Arc`s.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use giveaway_procedure::{Credentials, Environment, TagCache};
///
/// let env = Environment::builder(Arc::new(Vec::<String>::new()))
///     .cache(Arc::new(TagCache::default()))
///     .build();
/// let scoped = env.with_credentials(Credentials::bearer("token"));
/// assert!(scoped.credentials().is_some());
/// assert!(env.credentials().is_none());
/// ```
pub struct Environment<D: ?Sized> {
    db: Arc<D>,
    sessions: Arc<dyn SessionResolver>,
    cache: Arc<dyn CacheInvalidator>,
    clock: Arc<dyn Clock>,
    credentials: Option<Credentials>,
}

impl<D: ?Sized> Clone for Environment<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            sessions: Arc::clone(&self.sessions),
            cache: Arc::clone(&self.cache),
            clock: Arc::clone(&self.clock),
            credentials: self.credentials.clone(),
        }
    }
}

impl<D: ?Sized> fmt::Debug for Environment<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl<D: ?Sized> Environment<D> {
    /// Starts building an environment around a data-store handle.
    #[must_use]
    pub fn builder(db: Arc<D>) -> EnvironmentBuilder<D> {
        EnvironmentBuilder {
            db,
            sessions: Arc::new(NoSessions),
            cache: Arc::new(NoopInvalidator),
            clock: Arc::new(SystemClock),
        }
    }

    /// Returns a copy scoped to one request's credentials.
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..self.clone()
        }
    }

    /// Returns a copy with no credentials.
    #[must_use]
    pub fn anonymous(&self) -> Self {
        Self {
            credentials: None,
            ..self.clone()
        }
    }

    /// Returns the data-store handle.
    #[must_use]
    pub fn db(&self) -> &Arc<D> {
        &self.db
    }

    /// Returns the session resolver.
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionResolver {
        self.sessions.as_ref()
    }

    /// Returns the cache invalidator.
    #[must_use]
    pub fn cache(&self) -> &dyn CacheInvalidator {
        self.cache.as_ref()
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns the request's credentials, if scoped.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// Builder for [`Environment`].
pub struct EnvironmentBuilder<D: ?Sized> {
    db: Arc<D>,
    sessions: Arc<dyn SessionResolver>,
    cache: Arc<dyn CacheInvalidator>,
    clock: Arc<dyn Clock>,
}

impl<D: ?Sized> EnvironmentBuilder<D> {
    /// Sets the session resolver. Defaults to [`NoSessions`].
    #[must_use]
    pub fn sessions(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Sets the cache invalidator. Defaults to [`NoopInvalidator`].
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the clock. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the shared (unscoped) environment.
    #[must_use]
    pub fn build(self) -> Environment<D> {
        Environment {
            db: self.db,
            sessions: self.sessions,
            cache: self.cache,
            clock: self.clock,
            credentials: None,
        }
    }
}
