use std::collections::HashSet;

use giveaway_core::BoxFuture;
use giveaway_procedure::{CacheInvalidator, InvalidationError};
use parking_lot::Mutex;

/// Records every tag it is asked to invalidate.
///
/// Tags registered with [`RecordingInvalidator::fail_on`] fail with
/// `Unavailable` and are not recorded. A [`panicking`](Self::panicking)
/// recorder panics on every call.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    tags: Mutex<Vec<String>>,
    failing: HashSet<String>,
    fail_all: bool,
    panic_all: bool,
}

impl RecordingInvalidator {
    /// Creates a recorder that accepts every tag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder whose backend rejects every tag.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Creates a recorder that panics when asked to invalidate anything.
    #[must_use]
    pub fn panicking() -> Self {
        Self {
            panic_all: true,
            ..Self::default()
        }
    }

    /// Makes invalidating `tag` fail.
    #[must_use]
    pub fn fail_on(mut self, tag: impl Into<String>) -> Self {
        self.failing.insert(tag.into());
        self
    }

    /// Returns the recorded tags in order.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Result<(), InvalidationError>> {
        if self.panic_all {
            panic!("cache client panicked on {tag}");
        }
        let result = if self.fail_all || self.failing.contains(tag) {
            Err(InvalidationError::Unavailable(format!("cannot reach cache for {tag}")))
        } else {
            self.tags.lock().push(tag.to_string());
            Ok(())
        };
        Box::pin(async move { result })
    }
}
