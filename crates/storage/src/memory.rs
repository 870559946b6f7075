//! In-memory backend implementing both collaborator seams.
//!
//! Backs the filter worker and the test suites. Tables are `RwLock`-guarded
//! maps; a transaction stages rule-config writes and applies them under the
//! write lock at commit time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use mapwatch_core::{GeoObject, ObjectId, Observer, ObserverId, RuleConfig};

use crate::error::{Result, StorageError};
use crate::query::{ObjectQuery, QueryBackend};
use crate::store::{ObserverStore, StoreTransaction};

/// In-memory object and observer tables.
#[derive(Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<ObjectId, GeoObject>>,
    observers: RwLock<HashMap<ObserverId, Observer>>,
    /// Test hook: when set, the next commit fails and clears the flag.
    fail_next_commit: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_object(&self, object: GeoObject) {
        self.objects
            .write()
            .expect("objects lock poisoned")
            .insert(object.id, object);
    }

    pub fn insert_observer(&self, observer: Observer) {
        self.observers
            .write()
            .expect("observers lock poisoned")
            .insert(observer.id, observer);
    }

    /// Make the next `commit` fail with a synthetic error. Test hook for
    /// exercising the persistence-failure path.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl QueryBackend for MemoryBackend {
    fn execute(&self, query: &ObjectQuery) -> Result<Vec<GeoObject>> {
        let now = Utc::now();
        let objects = self.objects.read().expect("objects lock poisoned");
        let mut hits: Vec<GeoObject> = Vec::new();
        for object in objects.values() {
            if query.matches(object, now)? {
                hits.push(object.clone());
            }
        }
        // Map tables have no intrinsic order; return by id for stable output.
        hits.sort_by_key(|o| o.id);
        debug!(total = objects.len(), hits = hits.len(), "executed object query");
        Ok(hits)
    }
}

impl ObserverStore for MemoryBackend {
    fn get(&self, id: ObserverId) -> Result<Observer> {
        self.observers
            .read()
            .expect("observers lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(StorageError::ObserverNotFound(id))
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            backend: self,
            staged: Vec::new(),
        }))
    }
}

/// Staged writes against a [`MemoryBackend`].
struct MemoryTransaction<'a> {
    backend: &'a MemoryBackend,
    staged: Vec<(ObserverId, RuleConfig)>,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn refresh(&mut self, observer: &mut Observer) -> Result<()> {
        *observer = self.backend.get(observer.id)?;
        Ok(())
    }

    fn set_rules(&mut self, id: ObserverId, rules: RuleConfig) -> Result<()> {
        if !self
            .backend
            .observers
            .read()
            .expect("observers lock poisoned")
            .contains_key(&id)
        {
            return Err(StorageError::ObserverNotFound(id));
        }
        self.staged.push((id, rules));
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if self.backend.fail_next_commit.swap(false, Ordering::SeqCst) {
            // Staged writes are dropped with the transaction.
            return Err(StorageError::Commit("injected commit failure".to_string()));
        }
        let mut observers = self
            .backend
            .observers
            .write()
            .expect("observers lock poisoned");
        for (id, rules) in self.staged {
            match observers.get_mut(&id) {
                Some(observer) => observer.rules = rules,
                None => return Err(StorageError::ObserverNotFound(id)),
            }
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        debug!(staged = self.staged.len(), "rolled back observer transaction");
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
