//! The layered POM cache.
//!
//! [`PomCache`] memoizes the three kinds of remote lookups the downloader
//! performs: raw POMs, group metadata listings, and normalized repository
//! descriptors. Each operation takes a deferred producer that is only run
//! on a miss, and answers with a [`CacheResult`] distinguishing a hit
//! (`Cached`), a miss that just ran the producer (`Updated`), and a
//! definitive upstream absence (`Unavailable`).
//!
//! Producer contract: `Ok(Some(v))` is a positive answer, `Ok(None)` means
//! the upstream definitively does not have the resource (an HTTP 404) and
//! is cached as `Unavailable`, and `Err` is a failed lookup that propagates
//! without being cached, so a later call with a working producer succeeds.
//!
//! Caches compose with [`PomCache::or_else`]: the primary layer is
//! consulted first, and on a miss the fallback's answer (which the fallback
//! caches itself) is written into the primary. An in-memory cache over a
//! persistent one is the intended stacking.

mod artifact;
mod disk;
mod lock;
mod memory;

use std::collections::HashSet;

use crate::core::Result;
use crate::maven::{Coordinate, GroupArtifact, Repository};
use crate::maven::{MavenMetadata, RawPom};

pub use artifact::{ArtifactCache, DiskArtifactCache, LayeredArtifactCache, NoopArtifactCache};
pub use disk::DiskPomCache;
pub use lock::CacheLock;
pub use memory::InMemoryPomCache;

/// Outcome of one cache compute operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<T> {
    /// Hit: the value was already cached; the producer did not run.
    Cached(T),
    /// Miss: the producer ran and its answer was cached.
    Updated(T),
    /// The upstream definitively does not have the resource. Carries no
    /// payload; cached and sticky.
    Unavailable,
}

impl<T> CacheResult<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheResult::Cached(value) | CacheResult::Updated(value) => Some(value),
            CacheResult::Unavailable => None,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            CacheResult::Cached(value) | CacheResult::Updated(value) => Some(value),
            CacheResult::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheResult::Unavailable)
    }
}

/// Deferred producer invoked on a cache miss.
pub type Producer<'a, T> = &'a mut dyn FnMut() -> Result<Option<T>>;

/// Three-method cache of raw POMs, metadata listings, and normalized
/// repository descriptors.
pub trait PomCache: Send + Sync {
    fn compute_metadata(
        &self,
        repository: &Repository,
        group_artifact: &GroupArtifact,
        or_else: Producer<'_, MavenMetadata>,
    ) -> Result<CacheResult<MavenMetadata>>;

    fn compute_pom(
        &self,
        repository: &Repository,
        coordinate: &Coordinate,
        or_else: Producer<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>>;

    /// Store a normalized repository for an input repository. Normalization
    /// takes, for example, an `http://` URL for a repository that now
    /// requires https and changes the scheme.
    fn compute_repository(
        &self,
        repository: &Repository,
        or_else: Producer<'_, Repository>,
    ) -> Result<CacheResult<Repository>>;

    /// Layer `self` over `fallback`: check `self` first, fall through on a
    /// miss, and write the fallback's answer into `self`.
    fn or_else<F>(self, fallback: F) -> LayeredPomCache<Self, F>
    where
        Self: Sized,
        F: PomCache,
    {
        LayeredPomCache {
            primary: self,
            fallback,
        }
    }
}

/// Pass-through cache: every call runs the producer and nothing is stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPomCache;

impl PomCache for NoopPomCache {
    fn compute_metadata(
        &self,
        _repository: &Repository,
        _group_artifact: &GroupArtifact,
        or_else: Producer<'_, MavenMetadata>,
    ) -> Result<CacheResult<MavenMetadata>> {
        Ok(match or_else()? {
            Some(metadata) => CacheResult::Updated(metadata),
            None => CacheResult::Unavailable,
        })
    }

    fn compute_pom(
        &self,
        _repository: &Repository,
        _coordinate: &Coordinate,
        or_else: Producer<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>> {
        Ok(match or_else()? {
            Some(pom) => CacheResult::Updated(pom),
            None => CacheResult::Unavailable,
        })
    }

    fn compute_repository(
        &self,
        _repository: &Repository,
        or_else: Producer<'_, Repository>,
    ) -> Result<CacheResult<Repository>> {
        Ok(match or_else()? {
            Some(repository) => CacheResult::Updated(repository),
            None => CacheResult::Unavailable,
        })
    }
}

/// Two caches stacked by [`PomCache::or_else`].
pub struct LayeredPomCache<P, F> {
    primary: P,
    fallback: F,
}

impl<P: PomCache, F: PomCache> PomCache for LayeredPomCache<P, F> {
    fn compute_metadata(
        &self,
        repository: &Repository,
        group_artifact: &GroupArtifact,
        or_else: Producer<'_, MavenMetadata>,
    ) -> Result<CacheResult<MavenMetadata>> {
        self.primary
            .compute_metadata(repository, group_artifact, &mut || {
                Ok(self
                    .fallback
                    .compute_metadata(repository, group_artifact, &mut *or_else)?
                    .into_option())
            })
    }

    fn compute_pom(
        &self,
        repository: &Repository,
        coordinate: &Coordinate,
        or_else: Producer<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>> {
        self.primary.compute_pom(repository, coordinate, &mut || {
            Ok(self
                .fallback
                .compute_pom(repository, coordinate, &mut *or_else)?
                .into_option())
        })
    }

    fn compute_repository(
        &self,
        repository: &Repository,
        or_else: Producer<'_, Repository>,
    ) -> Result<CacheResult<Repository>> {
        self.primary.compute_repository(repository, &mut || {
            Ok(self
                .fallback
                .compute_repository(repository, &mut *or_else)?
                .into_option())
        })
    }
}

/// Coordinates known to be permanently unresolvable, consulted before any
/// POM producer runs. Loaded once at cache construction from the embedded
/// `unresolvable.txt` (newline-delimited `g:a:v`, blank lines ignored).
pub(crate) fn builtin_unresolvable() -> HashSet<String> {
    include_str!("unresolvable.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_result_payload_iff_not_unavailable() {
        assert_eq!(CacheResult::Cached(1).into_option(), Some(1));
        assert_eq!(CacheResult::Updated(2).into_option(), Some(2));
        assert_eq!(CacheResult::<i32>::Unavailable.into_option(), None);
        assert!(CacheResult::<i32>::Unavailable.is_unavailable());
    }

    #[test]
    fn builtin_unresolvable_skips_blank_lines() {
        let set = builtin_unresolvable();
        assert!(set.contains("jdk.tools:jdk.tools:1.6"));
        assert!(!set.contains(""));
    }

    #[test]
    fn noop_cache_always_runs_the_producer() {
        let cache = NoopPomCache;
        let repo = Repository::new("central", "https://repo.maven.apache.org/maven2");
        let mut calls = 0;
        for _ in 0..2 {
            let result = cache
                .compute_repository(&repo, &mut || {
                    calls += 1;
                    Ok(Some(repo.normalize()))
                })
                .unwrap();
            assert!(matches!(result, CacheResult::Updated(_)));
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn noop_cache_maps_none_to_unavailable() {
        let cache = NoopPomCache;
        let repo = Repository::new("central", "https://repo.maven.apache.org/maven2");
        let coordinate = Coordinate::new("g", "a", "1");
        let result = cache.compute_pom(&repo, &coordinate, &mut || Ok(None)).unwrap();
        assert!(result.is_unavailable());
    }
}
