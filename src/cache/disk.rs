//! Persistent cache backend.
//!
//! With a workspace directory, the three cache maps live in one
//! memory-mapped `redb` file as the named tables `pom.disk`,
//! `metadata.disk`, and `repository.urls`. Values round-trip through
//! `serde_json` as `Option<T>`: `null` is a cached `Unavailable`, a
//! missing key means the lookup never happened. The workspace is guarded
//! by an exclusive [`CacheLock`] acquired with a bounded wait.
//!
//! Without a workspace the backend degrades to a bounded in-memory mode
//! that evicts least-recently-used entries once the serialized payload
//! total exceeds `max_store_size`. A `None` bound disables eviction;
//! `Some(0)` keeps nothing but the entry just written.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use redb::{Database, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{builtin_unresolvable, CacheLock, CacheResult, PomCache, Producer};
use crate::constants::DEFAULT_LOCK_WAIT;
use crate::core::{RegraftError, Result};
use crate::maven::{Coordinate, GroupArtifact, Repository};
use crate::maven::{MavenMetadata, RawPom};

const POM_TABLE: &str = "pom.disk";
const METADATA_TABLE: &str = "metadata.disk";
const REPOSITORY_TABLE: &str = "repository.urls";

fn table_of(name: &'static str) -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

const DB_FILE: &str = "regraft-cache.redb";

fn store_err(err: impl std::fmt::Display) -> RegraftError {
    RegraftError::CacheStorage {
        reason: err.to_string(),
    }
}

/// Persistent [`PomCache`] over a memory-mapped key/value store.
#[derive(Debug)]
pub struct DiskPomCache {
    store: Store,
    /// Per-key producer serialization, same discipline as the in-memory
    /// backend.
    slots: DashMap<String, Arc<Mutex<()>>>,
    unresolvable: HashSet<String>,
}

#[derive(Debug)]
enum Store {
    Disk { db: Database, _lock: CacheLock },
    Memory(LruStore),
}

impl DiskPomCache {
    /// Open the cache. `workspace == None` selects the bounded in-memory
    /// mode.
    pub fn open(workspace: Option<&Path>, max_store_size: Option<u64>) -> Result<Self> {
        Self::open_with_lock_wait(workspace, max_store_size, DEFAULT_LOCK_WAIT)
    }

    /// [`DiskPomCache::open`] with an explicit lock wait instead of the
    /// 10 s default.
    pub fn open_with_lock_wait(
        workspace: Option<&Path>,
        max_store_size: Option<u64>,
        lock_wait: Duration,
    ) -> Result<Self> {
        let store = match workspace {
            Some(dir) => {
                let lock = CacheLock::acquire(dir, lock_wait)?;
                let db = Database::create(dir.join(DB_FILE)).map_err(store_err)?;
                let txn = db.begin_write().map_err(store_err)?;
                {
                    txn.open_table(table_of(POM_TABLE)).map_err(store_err)?;
                    txn.open_table(table_of(METADATA_TABLE)).map_err(store_err)?;
                    txn.open_table(table_of(REPOSITORY_TABLE)).map_err(store_err)?;
                }
                txn.commit().map_err(store_err)?;
                Store::Disk { db, _lock: lock }
            }
            None => Store::Memory(LruStore::new(max_store_size)),
        };
        Ok(DiskPomCache {
            store,
            slots: DashMap::new(),
            unresolvable: builtin_unresolvable(),
        })
    }

    fn compute<T>(
        &self,
        table: &'static str,
        key: String,
        or_else: Producer<'_, T>,
    ) -> Result<CacheResult<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let slot_key = format!("{table}|{key}");
        let slot = self.slots.entry(slot_key).or_default().value().clone();
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(bytes) = self.store.get(table, &key)? {
            let stored: Option<T> = serde_json::from_slice(&bytes)?;
            return Ok(match stored {
                Some(value) => CacheResult::Cached(value),
                None => CacheResult::Unavailable,
            });
        }

        match or_else()? {
            Some(value) => {
                self.store
                    .put(table, &key, &serde_json::to_vec(&Some(&value))?)?;
                Ok(CacheResult::Updated(value))
            }
            None => {
                self.store
                    .put(table, &key, &serde_json::to_vec(&Option::<T>::None)?)?;
                Ok(CacheResult::Unavailable)
            }
        }
    }

    fn repository_key(repository: &Repository) -> String {
        format!(
            "{}|{}|{}|{}",
            repository.id, repository.uri, repository.releases, repository.snapshots
        )
    }
}

impl PomCache for DiskPomCache {
    fn compute_metadata(
        &self,
        repository: &Repository,
        group_artifact: &GroupArtifact,
        or_else: Producer<'_, MavenMetadata>,
    ) -> Result<CacheResult<MavenMetadata>> {
        let key = format!("{}|{group_artifact}", repository.uri);
        self.compute(METADATA_TABLE, key, or_else)
    }

    fn compute_pom(
        &self,
        repository: &Repository,
        coordinate: &Coordinate,
        or_else: Producer<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>> {
        if self.unresolvable.contains(&coordinate.to_string()) {
            return Ok(CacheResult::Unavailable);
        }
        let key = format!("{}|{coordinate}", repository.uri);
        self.compute(POM_TABLE, key, or_else)
    }

    fn compute_repository(
        &self,
        repository: &Repository,
        or_else: Producer<'_, Repository>,
    ) -> Result<CacheResult<Repository>> {
        self.compute(REPOSITORY_TABLE, Self::repository_key(repository), or_else)
    }
}

impl Store {
    fn get(&self, table: &'static str, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Store::Disk { db, .. } => {
                let txn = db.begin_read().map_err(store_err)?;
                let opened = txn.open_table(table_of(table)).map_err(store_err)?;
                let value = opened
                    .get(key)
                    .map_err(store_err)?
                    .map(|guard| guard.value().to_vec());
                Ok(value)
            }
            Store::Memory(store) => Ok(store.get(table, key)),
        }
    }

    fn put(&self, table: &'static str, key: &str, value: &[u8]) -> Result<()> {
        match self {
            Store::Disk { db, .. } => {
                let txn = db.begin_write().map_err(store_err)?;
                {
                    let mut opened = txn.open_table(table_of(table)).map_err(store_err)?;
                    opened.insert(key, value).map_err(store_err)?;
                }
                txn.commit().map_err(store_err)?;
                Ok(())
            }
            Store::Memory(store) => {
                store.put(table, key, value);
                Ok(())
            }
        }
    }
}

/// The in-memory fallback store: bytes keyed by `table|key`, evicted
/// least-recently-used by total payload size.
#[derive(Debug)]
struct LruStore {
    max: Option<u64>,
    inner: Mutex<LruInner>,
}

#[derive(Debug, Default)]
struct LruInner {
    entries: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
    total: u64,
}

impl LruStore {
    fn new(max: Option<u64>) -> Self {
        Self {
            max,
            inner: Mutex::new(LruInner::default()),
        }
    }

    fn get(&self, table: &str, key: &str) -> Option<Vec<u8>> {
        let composite = format!("{table}|{key}");
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let value = inner.entries.get(&composite).cloned()?;
        inner.touch(&composite);
        Some(value)
    }

    fn put(&self, table: &str, key: &str, value: &[u8]) {
        let composite = format!("{table}|{key}");
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = inner.entries.insert(composite.clone(), value.to_vec()) {
            inner.total -= old.len() as u64;
            inner.order.retain(|k| k != &composite);
        }
        inner.total += value.len() as u64;
        inner.order.push_back(composite.clone());

        if let Some(max) = self.max {
            while inner.total > max {
                let Some(victim) = inner.order.front().cloned() else {
                    break;
                };
                if victim == composite {
                    // Never evict the entry just written.
                    break;
                }
                inner.order.pop_front();
                if let Some(evicted) = inner.entries.remove(&victim) {
                    inner.total -= evicted.len() as u64;
                }
            }
        }
    }
}

impl LruInner {
    fn touch(&mut self, composite: &str) {
        self.order.retain(|k| k != composite);
        self.order.push_back(composite.to_string());
    }
}
