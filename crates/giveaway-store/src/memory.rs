//! In-memory [`Store`] implementation.

use std::collections::{BTreeMap, HashMap};

use giveaway_core::BoxFuture;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::model::{Entry, Membership, Profile, Sweepstakes, Team};
use crate::store::{Store, StoreTx, TxWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    teams: HashMap<String, Team>,
    memberships: Vec<Membership>,
    sweepstakes: BTreeMap<String, Sweepstakes>,
    profiles: HashMap<String, Profile>,
    entries: Vec<Entry>,
}

impl StoreTx for Tables {
    fn team(&self, id: &str) -> Option<Team> {
        self.teams.get(id).cloned()
    }

    fn is_member(&self, team_id: &str, user_id: &str) -> bool {
        self.memberships
            .iter()
            .any(|m| m.team_id == team_id && m.user_id == user_id)
    }

    fn sweepstakes(&self, id: &str) -> Option<Sweepstakes> {
        self.sweepstakes.get(id).cloned()
    }

    fn entries(&self, sweepstakes_id: &str) -> Vec<Entry> {
        self.entries
            .iter()
            .filter(|e| e.sweepstakes_id == sweepstakes_id)
            .cloned()
            .collect()
    }

    fn insert_team(&mut self, team: Team) -> StoreResult<()> {
        if self.teams.contains_key(&team.id) {
            return Err(StoreError::conflict(format!("Team '{}' already exists", team.id)));
        }
        self.teams.insert(team.id.clone(), team);
        Ok(())
    }

    fn add_member(&mut self, membership: Membership) -> StoreResult<()> {
        if !self.teams.contains_key(&membership.team_id) {
            return Err(StoreError::not_found("Team", membership.team_id));
        }
        if self.is_member(&membership.team_id, &membership.user_id) {
            return Err(StoreError::conflict("Already a member of this team"));
        }
        self.memberships.push(membership);
        Ok(())
    }

    fn insert_sweepstakes(&mut self, sweepstakes: Sweepstakes) -> StoreResult<()> {
        if !self.teams.contains_key(&sweepstakes.team_id) {
            return Err(StoreError::not_found("Team", sweepstakes.team_id));
        }
        if self.sweepstakes.contains_key(&sweepstakes.id) {
            return Err(StoreError::conflict(format!(
                "Sweepstakes '{}' already exists",
                sweepstakes.id
            )));
        }
        self.sweepstakes.insert(sweepstakes.id.clone(), sweepstakes);
        Ok(())
    }

    fn update_sweepstakes(&mut self, sweepstakes: Sweepstakes) -> StoreResult<()> {
        match self.sweepstakes.get_mut(&sweepstakes.id) {
            Some(existing) => {
                *existing = sweepstakes;
                Ok(())
            }
            None => Err(StoreError::not_found("Sweepstakes", sweepstakes.id)),
        }
    }
}

impl Tables {
    fn insert_profile(&mut self, profile: Profile) -> StoreResult<()> {
        if self.profiles.contains_key(&profile.user_id) {
            return Err(StoreError::conflict("Profile already exists"));
        }
        self.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    fn insert_entry(&mut self, entry: Entry) -> StoreResult<()> {
        if !self.sweepstakes.contains_key(&entry.sweepstakes_id) {
            return Err(StoreError::not_found("Sweepstakes", entry.sweepstakes_id));
        }
        let duplicate = self.entries.iter().any(|e| {
            e.sweepstakes_id == entry.sweepstakes_id && e.email.eq_ignore_ascii_case(&entry.email)
        });
        if duplicate {
            return Err(StoreError::conflict("This email has already entered"));
        }
        self.entries.push(entry);
        Ok(())
    }

    fn delete_sweepstakes_owned_by(&mut self, id: &str, user_id: &str) -> bool {
        let owned = self
            .sweepstakes
            .get(id)
            .is_some_and(|s| self.is_member(&s.team_id, user_id));
        if owned {
            self.sweepstakes.remove(id);
            self.entries.retain(|e| e.sweepstakes_id != id);
        }
        owned
    }
}

/// A [`Store`] backed by in-process tables.
///
/// Reads take a shared lock; writes and transactions take the exclusive lock.
/// A transaction runs against a copy of the tables that replaces the
/// originals only when the unit of work succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&*self.tables.read())
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        f(&mut *self.tables.write())
    }
}

fn ready<'a, T: Send + 'a>(value: T) -> BoxFuture<'a, T> {
    Box::pin(std::future::ready(value))
}

impl Store for MemoryStore {
    fn team<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Team>>> {
        ready(Ok(self.read(|t| t.team(id))))
    }

    fn is_member<'a>(
        &'a self,
        team_id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        ready(Ok(self.read(|t| t.is_member(team_id, user_id))))
    }

    fn sweepstakes<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Sweepstakes>>> {
        ready(Ok(self.read(|t| StoreTx::sweepstakes(t, id))))
    }

    fn list_sweepstakes_for_team<'a>(
        &'a self,
        team_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Sweepstakes>>> {
        let mut list: Vec<Sweepstakes> = self.read(|t| {
            t.sweepstakes
                .values()
                .filter(|s| s.team_id == team_id)
                .cloned()
                .collect()
        });
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        ready(Ok(list))
    }

    fn profile<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Option<Profile>>> {
        ready(Ok(self.read(|t| t.profiles.get(user_id).cloned())))
    }

    fn entries<'a>(&'a self, sweepstakes_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Entry>>> {
        ready(Ok(self.read(|t| StoreTx::entries(t, sweepstakes_id))))
    }

    fn insert_team(&self, team: Team) -> BoxFuture<'_, StoreResult<()>> {
        ready(self.write(|t| StoreTx::insert_team(t, team)))
    }

    fn add_member(&self, membership: Membership) -> BoxFuture<'_, StoreResult<()>> {
        ready(self.write(|t| StoreTx::add_member(t, membership)))
    }

    fn insert_sweepstakes(&self, sweepstakes: Sweepstakes) -> BoxFuture<'_, StoreResult<()>> {
        ready(self.write(|t| StoreTx::insert_sweepstakes(t, sweepstakes)))
    }

    fn update_sweepstakes(&self, sweepstakes: Sweepstakes) -> BoxFuture<'_, StoreResult<()>> {
        ready(self.write(|t| StoreTx::update_sweepstakes(t, sweepstakes)))
    }

    fn delete_sweepstakes_owned_by<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        ready(Ok(self.write(|t| t.delete_sweepstakes_owned_by(id, user_id))))
    }

    fn insert_profile(&self, profile: Profile) -> BoxFuture<'_, StoreResult<()>> {
        ready(self.write(|t| t.insert_profile(profile)))
    }

    fn insert_entry(&self, entry: Entry) -> BoxFuture<'_, StoreResult<()>> {
        ready(self.write(|t| t.insert_entry(entry)))
    }

    fn transaction<'a>(&'a self, work: TxWork<'a>) -> BoxFuture<'a, StoreResult<()>> {
        let result = self.write(|tables| {
            let mut staged = tables.clone();
            work(&mut staged)?;
            *tables = staged;
            Ok(())
        });
        if let Err(err) = &result {
            tracing::debug!(error = %err, "transaction rolled back");
        }
        ready(result)
    }
}
