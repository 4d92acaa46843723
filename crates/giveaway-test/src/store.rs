use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use giveaway_core::BoxFuture;
use giveaway_store::{
    Entry, Membership, MemoryStore, Profile, Store, StoreResult, Sweepstakes, Team, TxWork,
};

/// Wraps a store and counts every call made through it.
pub struct CountingStore {
    inner: Arc<dyn Store>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl std::fmt::Debug for CountingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingStore")
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish_non_exhaustive()
    }
}

impl Default for CountingStore {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl CountingStore {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of read calls.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls, transactions included.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Total number of calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.reads() + self.writes()
    }

    fn read(&self) -> &dyn Store {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.as_ref()
    }

    fn write(&self) -> &dyn Store {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.as_ref()
    }
}

impl Store for CountingStore {
    fn team<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Team>>> {
        self.read().team(id)
    }

    fn is_member<'a>(
        &'a self,
        team_id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.read().is_member(team_id, user_id)
    }

    fn sweepstakes<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Sweepstakes>>> {
        self.read().sweepstakes(id)
    }

    fn list_sweepstakes_for_team<'a>(
        &'a self,
        team_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Sweepstakes>>> {
        self.read().list_sweepstakes_for_team(team_id)
    }

    fn profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<Profile>>> {
        self.read().profile(user_id)
    }

    fn entries<'a>(&'a self, sweepstakes_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Entry>>> {
        self.read().entries(sweepstakes_id)
    }

    fn insert_team(&self, team: Team) -> BoxFuture<'_, StoreResult<()>> {
        self.write().insert_team(team)
    }

    fn add_member(&self, membership: Membership) -> BoxFuture<'_, StoreResult<()>> {
        self.write().add_member(membership)
    }

    fn insert_sweepstakes(&self, sweepstakes: Sweepstakes) -> BoxFuture<'_, StoreResult<()>> {
        self.write().insert_sweepstakes(sweepstakes)
    }

    fn update_sweepstakes(&self, sweepstakes: Sweepstakes) -> BoxFuture<'_, StoreResult<()>> {
        self.write().update_sweepstakes(sweepstakes)
    }

    fn delete_sweepstakes_owned_by<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.write().delete_sweepstakes_owned_by(id, user_id)
    }

    fn insert_profile(&self, profile: Profile) -> BoxFuture<'_, StoreResult<()>> {
        self.write().insert_profile(profile)
    }

    fn insert_entry(&self, entry: Entry) -> BoxFuture<'_, StoreResult<()>> {
        self.write().insert_entry(entry)
    }

    fn transaction<'a>(&'a self, work: TxWork<'a>) -> BoxFuture<'a, StoreResult<()>> {
        self.write().transaction(work)
    }
}
