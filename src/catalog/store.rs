//! Concurrency-safe keyed session store
//!
//! The map is owned by `CatalogStore` and only reachable through its
//! operations. Reads take a shared lock, writes an exclusive one; no lock is
//! held across anything other than the map operation itself.

use crate::catalog::Session;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct CatalogStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the session stored under `id`
    pub fn put(&self, id: impl Into<String>, session: Session) {
        self.write().insert(id.into(), session);
    }

    /// Inserts every session under its own identifier in a single write
    ///
    /// Returns the number of entries in the store afterwards.
    pub fn put_all<I>(&self, sessions: I) -> usize
    where
        I: IntoIterator<Item = Session>,
    {
        let mut map = self.write();
        for session in sessions {
            map.insert(session.id.clone(), session);
        }
        map.len()
    }

    /// Returns a copy of the session stored under `id`
    pub fn get(&self, id: &str) -> Option<Session> {
        self.read().get(id).cloned()
    }

    /// Returns a copy of every stored session, in no particular order
    pub fn list(&self) -> Vec<Session> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every write is a single insert, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
