//! Shared helpers for the integration suites: an in-memory transport, a
//! call-counting cache wrapper, and POM/metadata fixture builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use regraft::cache::{CacheResult, PomCache, Producer};
use regraft::core::Result;
use regraft::maven::{
    Coordinate, Fetched, GroupArtifact, MavenMetadata, RawPom, Repository, Transport,
};

pub const CENTRAL: &str = "https://repo.maven.apache.org/maven2";

/// Transport stub answering from a URL map; anything unmapped is a 404.
pub struct FakeTransport {
    responses: Mutex<HashMap<String, String>>,
    hits: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, url: impl Into<String>, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), body.into());
    }

    /// Serve a POM from Maven Central's layout.
    pub fn put_central_pom(&self, group: &str, artifact: &str, version: &str, body: &str) {
        self.put(
            format!(
                "{CENTRAL}/{}/{artifact}/{version}/{artifact}-{version}.pom",
                group.replace('.', "/")
            ),
            body,
        );
    }

    /// Serve a metadata listing from Maven Central's layout.
    pub fn put_central_metadata(&self, group: &str, artifact: &str, versions: &[&str]) {
        self.put(
            format!(
                "{CENTRAL}/{}/{artifact}/maven-metadata.xml",
                group.replace('.', "/")
            ),
            metadata_xml(versions),
        );
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<Fetched> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().get(url) {
            Some(body) => Ok(Fetched::Found(body.clone().into_bytes())),
            None => Ok(Fetched::NotFound),
        }
    }
}

/// Counts compute calls that reach the wrapped cache.
pub struct CountingPomCache<C> {
    inner: C,
    pom_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
    repository_calls: AtomicUsize,
}

impl<C> CountingPomCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            pom_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            repository_calls: AtomicUsize::new(0),
        }
    }

    pub fn pom_calls(&self) -> usize {
        self.pom_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn repository_calls(&self) -> usize {
        self.repository_calls.load(Ordering::SeqCst)
    }
}

impl<C: PomCache> PomCache for CountingPomCache<C> {
    fn compute_metadata(
        &self,
        repository: &Repository,
        group_artifact: &GroupArtifact,
        or_else: Producer<'_, MavenMetadata>,
    ) -> Result<CacheResult<MavenMetadata>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_metadata(repository, group_artifact, or_else)
    }

    fn compute_pom(
        &self,
        repository: &Repository,
        coordinate: &Coordinate,
        or_else: Producer<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>> {
        self.pom_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_pom(repository, coordinate, or_else)
    }

    fn compute_repository(
        &self,
        repository: &Repository,
        or_else: Producer<'_, Repository>,
    ) -> Result<CacheResult<Repository>> {
        self.repository_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_repository(repository, or_else)
    }
}

pub fn central() -> Repository {
    Repository::new("central", CENTRAL)
}

/// A `<project>` document with the given coordinate and extra body.
pub fn project_xml(group: &str, artifact: &str, version: &str, body: &str) -> String {
    format!(
        "<project>\
         <groupId>{group}</groupId>\
         <artifactId>{artifact}</artifactId>\
         <version>{version}</version>\
         {body}\
         </project>"
    )
}

/// One `<dependency>` entry.
pub fn dependency_xml(
    group: &str,
    artifact: &str,
    version: Option<&str>,
    scope: Option<&str>,
) -> String {
    let mut out = format!(
        "<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId>"
    );
    if let Some(version) = version {
        out.push_str(&format!("<version>{version}</version>"));
    }
    if let Some(scope) = scope {
        out.push_str(&format!("<scope>{scope}</scope>"));
    }
    out.push_str("</dependency>");
    out
}

pub fn dependencies_xml(entries: &[String]) -> String {
    format!("<dependencies>{}</dependencies>", entries.concat())
}

pub fn metadata_xml(versions: &[&str]) -> String {
    let listed: String = versions
        .iter()
        .map(|version| format!("<version>{version}</version>"))
        .collect();
    format!(
        "<metadata><versioning><versions>{listed}</versions></versioning></metadata>"
    )
}

pub fn parse_pom(xml: &str) -> RawPom {
    RawPom::parse(xml, "test fixture").expect("fixture POM parses")
}
