//! Cache invalidation hook.
//!
//! After a successful invocation the procedure computes cache tags from
//! `{ input, output, user }` and hands each to a [`CacheInvalidator`].
//! Invalidation is best-effort: failures are logged and counted, never
//! returned to the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use giveaway_core::Identity;
use giveaway_telemetry::metrics::record_cache_invalidation;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BoxFuture;

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum InvalidationError {
    /// The tag is empty or otherwise unusable.
    #[error("invalid cache tag: {0:?}")]
    InvalidTag(String),

    /// The cache backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Marks cached data stale by tag.
pub trait CacheInvalidator: Send + Sync {
    /// Invalidates everything cached under `tag`.
    fn invalidate<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Result<(), InvalidationError>>;
}

/// Discards every invalidation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate<'a>(&'a self, _tag: &'a str) -> BoxFuture<'a, Result<(), InvalidationError>> {
        Box::pin(async { Ok(()) })
    }
}

/// What the invalidation-key function sees.
#[derive(Debug)]
pub struct KeyArgs<'a, I, O> {
    /// The parsed input.
    pub input: &'a I,
    /// The validated output.
    pub output: &'a O,
    /// The caller, if any.
    pub user: Option<&'a Identity>,
}

/// Computes cache tags for a finished invocation.
pub type InvalidationKeys<I, O> = Arc<dyn Fn(KeyArgs<'_, I, O>) -> Vec<String> + Send + Sync>;

/// Invalidates `tags` one after another, logging and counting failures.
///
/// Returns the number of tags that failed.
pub async fn invalidate_all(cache: &dyn CacheInvalidator, tags: &[String]) -> usize {
    let mut failed = 0;
    for tag in tags {
        match cache.invalidate(tag).await {
            Ok(()) => {
                tracing::debug!(tag = %tag, "cache tag invalidated");
                record_cache_invalidation(true);
            }
            Err(err) => {
                tracing::warn!(tag = %tag, error = %err, "cache invalidation failed");
                record_cache_invalidation(false);
                failed += 1;
            }
        }
    }
    failed
}

/// Configuration for [`TagCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagCacheConfig {
    /// Maximum number of tags tracked before the least recently bumped are evicted.
    pub max_tags: usize,
}

impl Default for TagCacheConfig {
    fn default() -> Self {
        Self { max_tags: 10_000 }
    }
}

/// Tag cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Successful invalidations.
    pub invalidations: u64,
    /// Rejected invalidations.
    pub rejected: u64,
    /// Tags evicted due to capacity.
    pub evictions: u64,
    /// Tags currently tracked.
    pub size: usize,
}

/// Generations observed for a set of tags.
///
/// Cached data stored alongside a snapshot is fresh while
/// [`TagCache::is_fresh`] holds for that snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSnapshot {
    generations: Vec<(String, u64)>,
}

/// In-process tag → generation map.
///
/// Invalidating a tag bumps its generation; readers compare the generation
/// they saw when caching against the current one. Generations come from one
/// monotonic counter, and evicted tags report the highest evicted generation,
/// so eviction can cause a spurious miss but never a stale hit.
#[derive(Debug)]
pub struct TagCache {
    config: TagCacheConfig,
    generations: RwLock<HashMap<String, u64>>,
    next_generation: AtomicU64,
    evicted_floor: AtomicU64,
    invalidations: AtomicU64,
    rejected: AtomicU64,
    evictions: AtomicU64,
}

impl Default for TagCache {
    fn default() -> Self {
        Self::new(TagCacheConfig::default())
    }
}

impl TagCache {
    /// Creates an empty tag cache.
    #[must_use]
    pub fn new(config: TagCacheConfig) -> Self {
        Self {
            config,
            generations: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            evicted_floor: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the current generation of `tag`.
    #[must_use]
    pub fn generation(&self, tag: &str) -> u64 {
        self.generations
            .read()
            .get(tag)
            .copied()
            .unwrap_or_else(|| self.evicted_floor.load(Ordering::Acquire))
    }

    /// Records the current generation of each tag.
    #[must_use]
    pub fn snapshot<S: AsRef<str>>(&self, tags: &[S]) -> TagSnapshot {
        TagSnapshot {
            generations: tags
                .iter()
                .map(|tag| (tag.as_ref().to_string(), self.generation(tag.as_ref())))
                .collect(),
        }
    }

    /// Returns `true` if no tag in `snapshot` was invalidated since it was taken.
    #[must_use]
    pub fn is_fresh(&self, snapshot: &TagSnapshot) -> bool {
        snapshot
            .generations
            .iter()
            .all(|(tag, generation)| self.generation(tag) == *generation)
    }

    /// Bumps the generation of `tag`.
    pub fn bump(&self, tag: &str) -> Result<u64, InvalidationError> {
        if tag.trim().is_empty() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(InvalidationError::InvalidTag(tag.to_string()));
        }

        let mut generations = self.generations.write();
        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel);

        if !generations.contains_key(tag) {
            while generations.len() >= self.config.max_tags.max(1) {
                let Some((oldest, gen)) = generations
                    .iter()
                    .min_by_key(|(_, gen)| **gen)
                    .map(|(t, g)| (t.clone(), *g))
                else {
                    break;
                };
                generations.remove(&oldest);
                self.evicted_floor.fetch_max(gen, Ordering::AcqRel);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        generations.insert(tag.to_string(), generation);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(generation)
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            invalidations: self.invalidations.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.generations.read().len(),
        }
    }
}

impl CacheInvalidator for TagCache {
    fn invalidate<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Result<(), InvalidationError>> {
        Box::pin(async move { self.bump(tag).map(|_| ()) })
    }
}
