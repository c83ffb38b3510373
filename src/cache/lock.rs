//! Exclusive file lock guarding a persistent cache workspace.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

use crate::core::{RegraftError, Result};

/// An exclusive lock on a cache workspace, held for the lifetime of the
/// value. Acquisition retries until the configured wait elapses, then
/// fails with [`RegraftError::CacheLocked`].
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

impl CacheLock {
    /// Acquire the lock for `workspace`, waiting up to `wait` for another
    /// holder to release it. The lock file lives inside the workspace and
    /// is left in place on release.
    pub fn acquire(workspace: &Path, wait: Duration) -> Result<Self> {
        std::fs::create_dir_all(workspace)?;
        let path = workspace.join("cache.lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let deadline = Instant::now() + wait;
        loop {
            if file.try_lock_exclusive()? {
                return Ok(CacheLock { file, path });
            }
            if Instant::now() >= deadline {
                return Err(RegraftError::CacheLocked {
                    path: workspace.display().to_string(),
                });
            }
            std::thread::sleep(RETRY_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), "failed to unlock cache workspace: {err}");
        }
    }
}
