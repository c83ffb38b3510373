//! Second-level cache for fetched artifact bytes.
//!
//! Keyed by resolved [`Dependency`], valued by an on-disk path. Unlike the
//! POM cache this one reports failures through a callback instead of a
//! `Result`: a missing artifact is an expected condition for most callers,
//! and a failed write must not abort the resolution that triggered it.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::core::{RegraftError, Result};
use crate::maven::Dependency;

/// Producer handing the artifact bytes as a stream, or `None` when the
/// upstream has no artifact for the dependency.
pub type ArtifactProducer<'a> = &'a mut dyn FnMut() -> Result<Option<Box<dyn Read>>>;

/// Error callback invoked for I/O failures during a put.
pub type OnArtifactError<'a> = &'a mut dyn FnMut(RegraftError);

/// Cache of fetched artifact bytes on disk.
pub trait ArtifactCache: Send + Sync {
    /// The cached path for a dependency, if present.
    fn get_artifact(&self, dependency: &Dependency) -> Option<PathBuf>;

    /// Store the stream's bytes for a dependency. Returns the written path,
    /// or `None` when the stream was empty or the write failed (failures
    /// are reported through `on_error`).
    fn put_artifact(
        &self,
        dependency: &Dependency,
        stream: &mut dyn Read,
        on_error: OnArtifactError<'_>,
    ) -> Option<PathBuf>;

    /// `get` falling back to producing and `put`ting the bytes.
    fn compute_artifact(
        &self,
        dependency: &Dependency,
        or_else: ArtifactProducer<'_>,
        on_error: OnArtifactError<'_>,
    ) -> Option<PathBuf> {
        if let Some(path) = self.get_artifact(dependency) {
            return Some(path);
        }
        match or_else() {
            Ok(Some(mut stream)) => self.put_artifact(dependency, &mut stream, on_error),
            Ok(None) => None,
            Err(err) => {
                on_error(err);
                None
            }
        }
    }

    /// Layer `self` over `fallback`, same shape as the POM cache.
    fn or_else<F>(self, fallback: F) -> LayeredArtifactCache<Self, F>
    where
        Self: Sized,
        F: ArtifactCache,
    {
        LayeredArtifactCache {
            primary: self,
            fallback,
        }
    }
}

/// Pass-through artifact cache: stores nothing, drains put streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopArtifactCache;

impl ArtifactCache for NoopArtifactCache {
    fn get_artifact(&self, _dependency: &Dependency) -> Option<PathBuf> {
        None
    }

    fn put_artifact(
        &self,
        _dependency: &Dependency,
        stream: &mut dyn Read,
        on_error: OnArtifactError<'_>,
    ) -> Option<PathBuf> {
        if let Err(err) = io::copy(stream, &mut io::sink()) {
            on_error(err.into());
        }
        None
    }
}

/// Artifact cache laid out like a local repository:
/// `group/path/artifact/version/artifact-version[-classifier].type`.
pub struct DiskArtifactCache {
    root: PathBuf,
}

impl DiskArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_path(&self, dependency: &Dependency) -> PathBuf {
        let coordinate = &dependency.coordinate;
        let mut file_name = format!(
            "{}-{}",
            coordinate.artifact_id(),
            coordinate.version
        );
        if let Some(classifier) = &dependency.classifier {
            file_name.push('-');
            file_name.push_str(classifier);
        }
        file_name.push('.');
        file_name.push_str(dependency.type_.as_deref().unwrap_or("jar"));

        self.root
            .join(coordinate.group_id().replace('.', "/"))
            .join(coordinate.artifact_id())
            .join(&coordinate.version)
            .join(file_name)
    }

    fn write_atomic(&self, path: &Path, stream: &mut dyn Read) -> Result<Option<PathBuf>> {
        let parent = path
            .parent()
            .ok_or_else(|| RegraftError::Io(io::Error::other("artifact path has no parent")))?;
        std::fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        let written = io::copy(stream, &mut temp)?;
        if written == 0 {
            return Ok(None);
        }
        temp.persist(path)
            .map_err(|err| RegraftError::Io(err.error))?;
        Ok(Some(path.to_path_buf()))
    }
}

impl ArtifactCache for DiskArtifactCache {
    fn get_artifact(&self, dependency: &Dependency) -> Option<PathBuf> {
        let path = self.artifact_path(dependency);
        path.is_file().then_some(path)
    }

    fn put_artifact(
        &self,
        dependency: &Dependency,
        stream: &mut dyn Read,
        on_error: OnArtifactError<'_>,
    ) -> Option<PathBuf> {
        let path = self.artifact_path(dependency);
        match self.write_atomic(&path, stream) {
            Ok(written) => written,
            Err(err) => {
                on_error(err);
                None
            }
        }
    }
}

/// Two artifact caches stacked by [`ArtifactCache::or_else`].
pub struct LayeredArtifactCache<P, F> {
    primary: P,
    fallback: F,
}

impl<P: ArtifactCache, F: ArtifactCache> ArtifactCache for LayeredArtifactCache<P, F> {
    fn get_artifact(&self, dependency: &Dependency) -> Option<PathBuf> {
        self.primary
            .get_artifact(dependency)
            .or_else(|| self.fallback.get_artifact(dependency))
    }

    fn put_artifact(
        &self,
        dependency: &Dependency,
        stream: &mut dyn Read,
        on_error: OnArtifactError<'_>,
    ) -> Option<PathBuf> {
        match self.primary.put_artifact(dependency, stream, on_error) {
            Some(path) => Some(path),
            None => self.fallback.put_artifact(dependency, stream, on_error),
        }
    }
}
