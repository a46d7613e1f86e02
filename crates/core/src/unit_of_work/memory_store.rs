//! In-memory store.
//!
//! Each session reads a private copy of the committed rows and keeps its own
//! write set. Commit replays only that write set, so sessions that touch
//! different rows never lose each other's work; the same row is last
//! committer wins. Used by tests and by embedders that do not need durable
//! storage.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Store, StoreSession};
use crate::changes::{ChangeOperation, PendingChange};
use crate::entities::{Entity, EntityKey, EntityKind, Owner};
use crate::errors::{DatabaseError, Error, Result};

#[derive(Debug, Default)]
struct StoreState {
    rows: BTreeMap<EntityKey, Entity>,
    commits: usize,
    rollbacks: usize,
    fail_next_commit: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts rows directly, bypassing change capture.
    pub fn seed<I, E>(&self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entity>,
    {
        let mut state = lock(&self.state)?;
        for row in rows {
            let entity = row.into();
            state.rows.insert(entity.key(), entity);
        }
        Ok(())
    }

    /// Committed state of one row.
    pub fn get(&self, key: EntityKey) -> Option<Entity> {
        lock(&self.state).ok()?.rows.get(&key).cloned()
    }

    /// Number of committed rows of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        lock(&self.state)
            .map(|state| state.rows.keys().filter(|key| key.kind == kind).count())
            .unwrap_or_default()
    }

    pub fn commit_count(&self) -> usize {
        lock(&self.state).map(|s| s.commits).unwrap_or_default()
    }

    pub fn rollback_count(&self) -> usize {
        lock(&self.state).map(|s| s.rollbacks).unwrap_or_default()
    }

    /// Makes the next session commit fail.
    pub fn fail_next_commit(&self) {
        if let Ok(mut state) = lock(&self.state) {
            state.fail_next_commit = true;
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreSession>> {
        let rows = lock(&self.state)?.rows.clone();
        Ok(Box::new(InMemorySession {
            state: self.state.clone(),
            rows,
            writes: BTreeMap::new(),
        }))
    }
}

struct InMemorySession {
    state: Arc<Mutex<StoreState>>,
    rows: BTreeMap<EntityKey, Entity>,
    /// Latest write per row; `None` marks a deletion.
    writes: BTreeMap<EntityKey, Option<Entity>>,
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn find(&mut self, key: EntityKey) -> Result<Option<Entity>> {
        Ok(self.rows.get(&key).cloned())
    }

    async fn list_owned(&mut self, kind: EntityKind, owner: Owner) -> Result<Vec<Entity>> {
        Ok(self
            .rows
            .values()
            .filter(|row| row.kind() == kind && row.belongs_to(owner))
            .cloned()
            .collect())
    }

    async fn apply(&mut self, change: &PendingChange) -> Result<()> {
        let key = change.key();
        match change.operation {
            ChangeOperation::Created => {
                if self.rows.contains_key(&key) {
                    return Err(DatabaseError::UniqueViolation(key.to_string()).into());
                }
                self.rows.insert(key, change.entity.clone());
                self.writes.insert(key, Some(change.entity.clone()));
            }
            ChangeOperation::Updated => {
                let row = self
                    .rows
                    .get_mut(&key)
                    .ok_or_else(|| DatabaseError::NotFound(key.to_string()))?;
                *row = change.entity.clone();
                self.writes.insert(key, Some(change.entity.clone()));
            }
            ChangeOperation::Deleted => {
                self.rows
                    .remove(&key)
                    .ok_or_else(|| DatabaseError::NotFound(key.to_string()))?;
                self.writes.insert(key, None);
            }
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = lock(&self.state)?;
        if state.fail_next_commit {
            state.fail_next_commit = false;
            state.rollbacks += 1;
            return Err(DatabaseError::TransactionFailed("injected commit failure".into()).into());
        }
        for (key, write) in std::mem::take(&mut self.writes) {
            match write {
                Some(entity) => state.rows.insert(key, entity),
                None => state.rows.remove(&key),
            };
        }
        self.rows.clear();
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.rows.clear();
        self.writes.clear();
        lock(&self.state)?.rollbacks += 1;
        Ok(())
    }
}

fn lock(state: &Mutex<StoreState>) -> Result<MutexGuard<'_, StoreState>> {
    state
        .lock()
        .map_err(|_| Error::Unexpected("in-memory store lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{Scenario, ScenarioStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn scenario(name: &str) -> Scenario {
        Scenario {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            status: ScenarioStatus::Draft,
            on_demand: false,
            scenario_template_id: None,
            view_id: None,
            score: 0,
            score_earned: 0,
            update_scores: false,
            created_by: None,
            date_created: Utc::now(),
            date_modified: None,
        }
    }

    #[tokio::test]
    async fn test_interleaved_sessions_keep_each_others_rows() {
        let store = InMemoryStore::new();
        let kept = scenario("kept");
        let removed = scenario("removed");
        store
            .seed([Entity::Scenario(kept.clone()), Entity::Scenario(removed.clone())])
            .unwrap();
        let first = scenario("first");
        let second = scenario("second");

        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        a.apply(&PendingChange::created(Entity::Scenario(first.clone())))
            .await
            .unwrap();
        b.apply(&PendingChange::created(Entity::Scenario(second.clone())))
            .await
            .unwrap();
        b.apply(&PendingChange::deleted(Entity::Scenario(removed.clone())))
            .await
            .unwrap();
        b.commit().await.unwrap();
        a.commit().await.unwrap();

        assert!(store.get(EntityKey::scenario(first.id)).is_some());
        assert!(store.get(EntityKey::scenario(second.id)).is_some());
        assert!(store.get(EntityKey::scenario(kept.id)).is_some());
        assert!(store.get(EntityKey::scenario(removed.id)).is_none());
        assert_eq!(store.commit_count(), 2);
    }
}
