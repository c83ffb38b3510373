//! POM and metadata downloading through the cache.
//!
//! The downloader owns no HTTP stack; callers supply a [`Transport`] and
//! the downloader turns its answers into cache writes. A transport answer
//! of [`Fetched::NotFound`] is a definitive absence (cached as
//! `Unavailable`); a transport error propagates uncached and may be
//! retried. Producers check cancellation before issuing I/O, so a
//! cancelled key stays in the never-looked-up state.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheResult, PomCache};
use crate::constants::{MAVEN_CENTRAL_ID, MAVEN_CENTRAL_URI};
use crate::core::{ExecutionContext, RegraftError, Result};
use crate::maven::{Coordinate, GroupArtifact, MavenMetadata, RawPom, Repository};

/// Transport answer for one GET.
pub enum Fetched {
    Found(Vec<u8>),
    /// The server definitively does not have the resource (HTTP 404).
    NotFound,
}

/// The HTTP seam. Implementations block; failures are
/// [`RegraftError::TransportFailure`].
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Fetched>;
}

/// Downloads raw POMs and metadata listings for coordinates, walking an
/// ordered repository list and consulting the cache before the transport.
pub struct PomDownloader {
    cache: Arc<dyn PomCache>,
    transport: Arc<dyn Transport>,
}

impl PomDownloader {
    pub fn new(cache: Arc<dyn PomCache>, transport: Arc<dyn Transport>) -> Self {
        Self { cache, transport }
    }

    /// Fetch the raw POM for `coordinate` from the first repository that
    /// has it. All repositories answering `Unavailable` records the
    /// coordinate as unresolved and fails with
    /// [`RegraftError::PomNotFound`].
    pub fn download_pom(
        &self,
        coordinate: &Coordinate,
        repositories: &[Repository],
        ctx: &ExecutionContext,
    ) -> Result<(RawPom, Repository)> {
        let snapshot = coordinate.version.ends_with("-SNAPSHOT");
        for repository in self.candidate_repositories(repositories) {
            let repository = self.normalize(&repository)?;
            if (snapshot && !repository.snapshots) || (!snapshot && !repository.releases) {
                debug!(%coordinate, repository = %repository.uri, "skipping repository by policy");
                continue;
            }

            let url = pom_url(&repository, coordinate);
            let result = self.cache.compute_pom(&repository, coordinate, &mut || {
                ctx.check_cancelled()?;
                debug!(%coordinate, %url, "downloading POM");
                match self.transport.get(&url)? {
                    Fetched::Found(bytes) => {
                        let text = text_of(&bytes, &url)?;
                        Ok(Some(RawPom::parse(text, &url)?))
                    }
                    Fetched::NotFound => Ok(None),
                }
            })?;

            if let Some(pom) = result.into_option() {
                return Ok((pom, repository));
            }
        }

        ctx.record_unresolved(coordinate.to_string());
        Err(RegraftError::PomNotFound {
            coordinate: coordinate.to_string(),
        })
    }

    /// Fetch and merge `maven-metadata.xml` across all repositories:
    /// version lists union. Fails with [`RegraftError::MetadataNotFound`]
    /// only when every repository answers `Unavailable`.
    pub fn download_metadata(
        &self,
        group_artifact: &GroupArtifact,
        repositories: &[Repository],
        ctx: &ExecutionContext,
    ) -> Result<MavenMetadata> {
        let mut merged: Option<MavenMetadata> = None;
        for repository in self.candidate_repositories(repositories) {
            let repository = self.normalize(&repository)?;
            let url = metadata_url(&repository, group_artifact);
            let result = self
                .cache
                .compute_metadata(&repository, group_artifact, &mut || {
                    ctx.check_cancelled()?;
                    debug!(group_artifact = %group_artifact, %url, "downloading metadata");
                    match self.transport.get(&url)? {
                        Fetched::Found(bytes) => {
                            let text = text_of(&bytes, &url)?;
                            Ok(Some(MavenMetadata::parse(text, &url)?))
                        }
                        Fetched::NotFound => Ok(None),
                    }
                })?;

            if let Some(metadata) = result.into_option() {
                match &mut merged {
                    Some(existing) => existing.merge(metadata),
                    None => merged = Some(metadata),
                }
            }
        }

        merged.ok_or_else(|| RegraftError::MetadataNotFound {
            group_artifact: group_artifact.to_string(),
        })
    }

    /// Normalize a repository through the cache so the (possibly
    /// rewriting) normalization runs once per descriptor.
    pub fn normalize(&self, repository: &Repository) -> Result<Repository> {
        let result = self
            .cache
            .compute_repository(repository, &mut || Ok(Some(repository.normalize())))?;
        match result {
            CacheResult::Cached(normalized) | CacheResult::Updated(normalized) => Ok(normalized),
            // Normalization itself never answers "absent"; an unavailable
            // entry can only come from an older cache. Fall back to the
            // direct rewrite.
            CacheResult::Unavailable => Ok(repository.normalize()),
        }
    }

    /// The caller's repositories in order, with Maven Central appended as
    /// the implicit terminal entry when not already present.
    fn candidate_repositories(&self, repositories: &[Repository]) -> Vec<Repository> {
        let mut candidates = repositories.to_vec();
        if !candidates
            .iter()
            .any(|repo| repo.uri.trim_end_matches('/') == MAVEN_CENTRAL_URI)
        {
            candidates.push(Repository::new(MAVEN_CENTRAL_ID, MAVEN_CENTRAL_URI));
        }
        candidates
    }
}

fn group_path(group_id: &str) -> String {
    group_id.replace('.', "/")
}

fn pom_url(repository: &Repository, coordinate: &Coordinate) -> String {
    format!(
        "{}/{}/{}/{}/{}-{}.pom",
        repository.uri,
        group_path(coordinate.group_id()),
        coordinate.artifact_id(),
        coordinate.version,
        coordinate.artifact_id(),
        coordinate.version,
    )
}

fn metadata_url(repository: &Repository, group_artifact: &GroupArtifact) -> String {
    format!(
        "{}/{}/{}/maven-metadata.xml",
        repository.uri,
        group_path(&group_artifact.group_id),
        group_artifact.artifact_id,
    )
}

fn text_of<'a>(bytes: &'a [u8], url: &str) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|err| RegraftError::XmlParse {
        resource: url.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryPomCache;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport stub answering from a URL map; everything else is 404.
    pub(crate) struct MapTransport {
        responses: Mutex<HashMap<String, Vec<u8>>>,
        pub(crate) hits: AtomicUsize,
    }

    impl MapTransport {
        pub(crate) fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                hits: AtomicUsize::new(0),
            }
        }

        pub(crate) fn put(&self, url: &str, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), body.as_bytes().to_vec());
        }
    }

    impl Transport for MapTransport {
        fn get(&self, url: &str) -> Result<Fetched> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().get(url) {
                Some(body) => Ok(Fetched::Found(body.clone())),
                None => Ok(Fetched::NotFound),
            }
        }
    }

    fn downloader(transport: Arc<MapTransport>) -> PomDownloader {
        PomDownloader::new(Arc::new(InMemoryPomCache::new()), transport)
    }

    const SIMPLE_POM: &str = "<project><groupId>com.example</groupId>\
        <artifactId>lib</artifactId><version>1.0</version></project>";

    #[test]
    fn first_repository_with_the_pom_wins() {
        let transport = Arc::new(MapTransport::new());
        transport.put(
            "https://second.example.com/com/example/lib/1.0/lib-1.0.pom",
            SIMPLE_POM,
        );
        let downloader = downloader(Arc::clone(&transport));

        let repositories = vec![
            Repository::new("first", "https://first.example.com"),
            Repository::new("second", "https://second.example.com"),
        ];
        let coordinate = Coordinate::new("com.example", "lib", "1.0");
        let ctx = ExecutionContext::new();

        let (pom, repository) = downloader
            .download_pom(&coordinate, &repositories, &ctx)
            .unwrap();
        assert_eq!(pom.artifact_id.as_deref(), Some("lib"));
        assert_eq!(repository.id, "second");
        // first (miss), second (hit); central never queried.
        assert_eq!(transport.hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn all_unavailable_is_pom_not_found_and_recorded() {
        let transport = Arc::new(MapTransport::new());
        let downloader = downloader(transport);
        let coordinate = Coordinate::new("com.example", "missing", "1.0");
        let ctx = ExecutionContext::new();

        let err = downloader
            .download_pom(&coordinate, &[], &ctx)
            .unwrap_err();
        assert!(matches!(err, RegraftError::PomNotFound { .. }));
        assert_eq!(
            ctx.unresolved_coordinates(),
            vec!["com.example:missing:1.0"]
        );
    }

    #[test]
    fn snapshot_versions_skip_release_only_repositories() {
        let transport = Arc::new(MapTransport::new());
        let downloader = downloader(Arc::clone(&transport));
        let repositories = vec![Repository::new("releases", "https://releases.example.com")];
        let coordinate = Coordinate::new("com.example", "lib", "1.0-SNAPSHOT");
        let ctx = ExecutionContext::new();

        // Only central is consulted, and central is release-only too for
        // the snapshot, so nothing is fetched.
        let err = downloader
            .download_pom(&coordinate, &repositories, &ctx)
            .unwrap_err();
        assert!(matches!(err, RegraftError::PomNotFound { .. }));
        assert_eq!(transport.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn metadata_merges_across_repositories() {
        let transport = Arc::new(MapTransport::new());
        transport.put(
            "https://first.example.com/com/example/lib/maven-metadata.xml",
            "<metadata><versioning><versions>\
             <version>1.0</version><version>1.1</version>\
             </versions></versioning></metadata>",
        );
        transport.put(
            "https://second.example.com/com/example/lib/maven-metadata.xml",
            "<metadata><versioning><versions>\
             <version>1.1</version><version>2.0</version>\
             </versions></versioning></metadata>",
        );
        let downloader = downloader(transport);

        let repositories = vec![
            Repository::new("first", "https://first.example.com"),
            Repository::new("second", "https://second.example.com"),
        ];
        let metadata = downloader
            .download_metadata(
                &GroupArtifact::new("com.example", "lib"),
                &repositories,
                &ExecutionContext::new(),
            )
            .unwrap();
        assert_eq!(metadata.versions, vec!["1.0", "1.1", "2.0"]);
    }

    #[test]
    fn metadata_missing_everywhere_is_an_error() {
        let transport = Arc::new(MapTransport::new());
        let downloader = downloader(transport);
        let err = downloader
            .download_metadata(
                &GroupArtifact::new("com.example", "nothing"),
                &[],
                &ExecutionContext::new(),
            )
            .unwrap_err();
        assert!(matches!(err, RegraftError::MetadataNotFound { .. }));
    }

    #[test]
    fn cancelled_context_leaves_key_untouched() {
        let transport = Arc::new(MapTransport::new());
        transport.put(
            "https://repo.maven.apache.org/maven2/com/example/lib/1.0/lib-1.0.pom",
            SIMPLE_POM,
        );
        let downloader = downloader(Arc::clone(&transport));
        let coordinate = Coordinate::new("com.example", "lib", "1.0");

        let ctx = ExecutionContext::new();
        ctx.cancel_handle().cancel();
        let err = downloader.download_pom(&coordinate, &[], &ctx).unwrap_err();
        assert!(matches!(err, RegraftError::Cancelled));
        assert_eq!(transport.hits.load(Ordering::SeqCst), 0);

        // A fresh context succeeds: cancellation cached nothing.
        let ctx = ExecutionContext::new();
        let (pom, _) = downloader.download_pom(&coordinate, &[], &ctx).unwrap();
        assert_eq!(pom.artifact_id.as_deref(), Some("lib"));
    }

    #[test]
    fn http_repositories_are_normalized_before_fetch() {
        let transport = Arc::new(MapTransport::new());
        transport.put(
            "https://corp.example.com/com/example/lib/1.0/lib-1.0.pom",
            SIMPLE_POM,
        );
        let downloader = downloader(transport);
        let repositories = vec![Repository::new("corp", "http://corp.example.com/")];
        let coordinate = Coordinate::new("com.example", "lib", "1.0");

        let (_, repository) = downloader
            .download_pom(&coordinate, &repositories, &ExecutionContext::new())
            .unwrap();
        assert_eq!(repository.uri, "https://corp.example.com");
    }
}
