//! In-memory cache backend.
//!
//! Three concurrent maps, one per lookup kind. Each key owns a slot of
//! type `Option<Option<T>>`: no slot means the key was never looked up,
//! `Some(None)` is a cached `Unavailable`, `Some(Some(v))` a cached value.
//! The slot's mutex serializes producers so concurrent callers for one key
//! block on a single producer invocation; the map itself only guards slot
//! insertion.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::cache::{builtin_unresolvable, CacheResult, PomCache, Producer};
use crate::core::Result;
use crate::maven::{Coordinate, GroupArtifact, GroupArtifactRepository, Repository};
use crate::maven::{MavenMetadata, RawPom};

type Slot<T> = Arc<Mutex<Option<Option<T>>>>;

fn compute_slot<K, T>(map: &DashMap<K, Slot<T>>, key: K, or_else: Producer<'_, T>) -> Result<CacheResult<T>>
where
    K: Eq + Hash,
    T: Clone,
{
    // Clone the slot out so the shard lock is not held while the producer
    // performs I/O.
    let slot = map.entry(key).or_default().value().clone();
    let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);
    match &*state {
        Some(Some(value)) => Ok(CacheResult::Cached(value.clone())),
        Some(None) => Ok(CacheResult::Unavailable),
        None => match or_else()? {
            Some(value) => {
                *state = Some(Some(value.clone()));
                Ok(CacheResult::Updated(value))
            }
            None => {
                *state = Some(None);
                Ok(CacheResult::Unavailable)
            }
        },
    }
}

/// Concurrent in-memory [`PomCache`].
pub struct InMemoryPomCache {
    poms: DashMap<String, Slot<RawPom>>,
    metadata: DashMap<GroupArtifactRepository, Slot<MavenMetadata>>,
    repositories: DashMap<Repository, Slot<Repository>>,
    unresolvable: HashSet<String>,
}

impl InMemoryPomCache {
    pub fn new() -> Self {
        Self {
            poms: DashMap::new(),
            metadata: DashMap::new(),
            repositories: DashMap::new(),
            unresolvable: builtin_unresolvable(),
        }
    }

    fn pom_key(repository: &Repository, coordinate: &Coordinate) -> String {
        format!("{}:{}", repository.uri, coordinate)
    }
}

impl Default for InMemoryPomCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PomCache for InMemoryPomCache {
    fn compute_metadata(
        &self,
        repository: &Repository,
        group_artifact: &GroupArtifact,
        or_else: Producer<'_, MavenMetadata>,
    ) -> Result<CacheResult<MavenMetadata>> {
        let key = GroupArtifactRepository::new(repository, group_artifact.clone());
        compute_slot(&self.metadata, key, or_else)
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
        compute_slot(&self.poms, Self::pom_key(repository, coordinate), or_else)
    }

    fn compute_repository(
        &self,
        repository: &Repository,
        or_else: Producer<'_, Repository>,
    ) -> Result<CacheResult<Repository>> {
        compute_slot(&self.repositories, repository.clone(), or_else)
    }
}
