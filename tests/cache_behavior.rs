//! Cache contract suites: determinism, negative caching, error
//! transparency, composition, and the unresolvable short-circuit.

mod common;

use std::sync::Arc;

use anyhow::Result;
use regraft::cache::{CacheResult, DiskPomCache, InMemoryPomCache, PomCache};
use regraft::core::RegraftError;
use regraft::maven::Coordinate;
use tempfile::TempDir;

use common::{central, parse_pom, project_xml, CountingPomCache};

fn fixture() -> regraft::maven::RawPom {
    parse_pom(&project_xml("com.example", "lib", "1.0", ""))
}

#[test]
fn cache_determinism_producer_runs_at_most_once() -> Result<()> {
    let cache = InMemoryPomCache::new();
    let coordinate = Coordinate::new("com.example", "lib", "1.0");
    let mut calls = 0;

    let first = cache.compute_pom(&central(), &coordinate, &mut || {
        calls += 1;
        Ok(Some(fixture()))
    })?;
    let second = cache.compute_pom(&central(), &coordinate, &mut || {
        calls += 1;
        Ok(Some(fixture()))
    })?;

    assert!(matches!(first, CacheResult::Updated(_)));
    assert!(matches!(second, CacheResult::Cached(_)));
    assert_eq!(calls, 1);
    Ok(())
}

#[test]
fn unavailable_sticks_without_reinvoking_the_producer() -> Result<()> {
    let cache = InMemoryPomCache::new();
    let coordinate = Coordinate::new("com.example", "gone", "1.0");
    let mut calls = 0;

    assert!(cache
        .compute_pom(&central(), &coordinate, &mut || {
            calls += 1;
            Ok(None)
        })?
        .is_unavailable());
    assert!(cache
        .compute_pom(&central(), &coordinate, &mut || {
            calls += 1;
            Ok(Some(fixture()))
        })?
        .is_unavailable());
    assert_eq!(calls, 1);
    Ok(())
}

#[test]
fn producer_errors_do_not_stick() -> Result<()> {
    let cache = InMemoryPomCache::new();
    let coordinate = Coordinate::new("com.example", "flaky", "1.0");

    let failed = cache.compute_pom(&central(), &coordinate, &mut || {
        Err(RegraftError::TransportFailure {
            url: "https://repo.maven.apache.org".to_string(),
            reason: "timeout".to_string(),
        })
    });
    assert!(failed.is_err());

    let recovered = cache.compute_pom(&central(), &coordinate, &mut || Ok(Some(fixture())))?;
    assert!(matches!(recovered, CacheResult::Updated(_)));
    Ok(())
}

#[test]
fn layered_cache_writes_through_then_serves_from_the_top() -> Result<()> {
    // In-memory over (counted) persistent: the first request produces and
    // both layers answer Updated; the second is Cached from the top layer
    // and never reaches the persistent one.
    let persistent = CountingPomCache::new(DiskPomCache::open(None, None)?);
    let layered = InMemoryPomCache::new().or_else(persistent);
    let coordinate = Coordinate::new("com.example", "lib", "1.0");
    let mut produced = 0;

    let first = layered.compute_pom(&central(), &coordinate, &mut || {
        produced += 1;
        Ok(Some(fixture()))
    })?;
    assert!(matches!(first, CacheResult::Updated(_)));

    let second = layered.compute_pom(&central(), &coordinate, &mut || {
        produced += 1;
        Ok(Some(fixture()))
    })?;
    assert!(matches!(second, CacheResult::Cached(_)));
    assert_eq!(produced, 1);
    Ok(())
}

#[test]
fn layered_second_request_does_not_touch_the_fallback() -> Result<()> {
    let counted = Arc::new(CountingPomCache::new(InMemoryPomCache::new()));
    let layered = InMemoryPomCache::new().or_else(SharedCache(Arc::clone(&counted)));
    let coordinate = Coordinate::new("com.example", "lib", "1.0");

    layered.compute_pom(&central(), &coordinate, &mut || Ok(Some(fixture())))?;
    assert_eq!(counted.pom_calls(), 1);

    layered.compute_pom(&central(), &coordinate, &mut || Ok(Some(fixture())))?;
    assert_eq!(counted.pom_calls(), 1);
    Ok(())
}

/// Delegates to a shared counted cache so the test can inspect it while
/// the layered cache owns "it".
struct SharedCache(Arc<CountingPomCache<InMemoryPomCache>>);

impl PomCache for SharedCache {
    fn compute_metadata(
        &self,
        repository: &regraft::maven::Repository,
        group_artifact: &regraft::maven::GroupArtifact,
        or_else: regraft::cache::Producer<'_, regraft::maven::MavenMetadata>,
    ) -> regraft::core::Result<CacheResult<regraft::maven::MavenMetadata>> {
        self.0.compute_metadata(repository, group_artifact, or_else)
    }

    fn compute_pom(
        &self,
        repository: &regraft::maven::Repository,
        coordinate: &Coordinate,
        or_else: regraft::cache::Producer<'_, regraft::maven::RawPom>,
    ) -> regraft::core::Result<CacheResult<regraft::maven::RawPom>> {
        self.0.compute_pom(repository, coordinate, or_else)
    }

    fn compute_repository(
        &self,
        repository: &regraft::maven::Repository,
        or_else: regraft::cache::Producer<'_, regraft::maven::Repository>,
    ) -> regraft::core::Result<CacheResult<regraft::maven::Repository>> {
        self.0.compute_repository(repository, or_else)
    }
}

#[test]
fn layered_over_disk_persists_across_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let coordinate = Coordinate::new("com.example", "lib", "1.0");

    {
        let layered =
            InMemoryPomCache::new().or_else(DiskPomCache::open(Some(dir.path()), None)?);
        layered.compute_pom(&central(), &coordinate, &mut || Ok(Some(fixture())))?;
    }

    // A fresh process would see the persistent layer already warm.
    let reopened = DiskPomCache::open(Some(dir.path()), None)?;
    let result = reopened.compute_pom(&central(), &coordinate, &mut || {
        panic!("persisted entry must not re-produce")
    })?;
    assert!(matches!(result, CacheResult::Cached(_)));
    Ok(())
}

#[test]
fn unresolvable_coordinates_short_circuit_with_zero_producer_calls() -> Result<()> {
    for cache in [
        Box::new(InMemoryPomCache::new()) as Box<dyn PomCache>,
        Box::new(DiskPomCache::open(None, None)?) as Box<dyn PomCache>,
    ] {
        let coordinate = Coordinate::parse("jdk.tools:jdk.tools:1.6")?;
        let mut calls = 0;
        let result = cache.compute_pom(&central(), &coordinate, &mut || {
            calls += 1;
            Ok(Some(fixture()))
        })?;
        assert!(result.is_unavailable());
        assert_eq!(calls, 0);
    }
    Ok(())
}

#[test]
fn composition_answers_match_layer_order() -> Result<()> {
    // Seed only the fallback; the layered cache must surface its value.
    let fallback = InMemoryPomCache::new();
    let coordinate = Coordinate::new("com.example", "seeded", "2.0");
    fallback.compute_pom(&central(), &coordinate, &mut || Ok(Some(fixture())))?;

    let layered = InMemoryPomCache::new().or_else(fallback);
    let result = layered.compute_pom(&central(), &coordinate, &mut || {
        panic!("fallback already has the value")
    })?;
    // The fallback hit is an update from the primary's point of view.
    assert!(matches!(result, CacheResult::Updated(_)));
    Ok(())
}
