//! Per-path mutual exclusion.
//!
//! Every read-modify-write of a tracked document goes through a [`PathLocks`]
//! registry so that two writers on the same path never interleave. Writers on
//! different paths never block each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Registry of one async mutex per document path.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Guard held for the duration of a critical section on one path.
#[derive(Debug)]
pub struct PathGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl PathGuard {
    /// The path this guard protects.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `path`, waiting for any current holder.
    pub async fn acquire(&self, path: impl AsRef<Path>) -> PathGuard {
        let path = path.as_ref().to_path_buf();
        let mutex = self.mutex_for(&path).await;
        debug!(path = %path.display(), "Waiting for path lock");
        let guard = mutex.lock_owned().await;
        PathGuard {
            path,
            _guard: guard,
        }
    }

    /// Acquire the lock for `path` only if nobody holds it.
    pub async fn try_acquire(&self, path: impl AsRef<Path>) -> Option<PathGuard> {
        let path = path.as_ref().to_path_buf();
        let mutex = self.mutex_for(&path).await;
        let guard = mutex.try_lock_owned().ok()?;
        Some(PathGuard {
            path,
            _guard: guard,
        })
    }

    /// Number of paths that have been locked at least once.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }

    async fn mutex_for(&self, path: &Path) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.read().await.get(path) {
            return existing.clone();
        }
        let mut locks = self.locks.write().await;
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
