//! The snapshot store abstraction.

use crate::{CommitLogEntry, SnapshotResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Read access to the recorded history of tracked files.
///
/// Paths are relative to the store's root.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// All commits that touched `path`, newest first.
    ///
    /// Fails with [`SnapshotError::NoHistory`](crate::SnapshotError::NoHistory)
    /// when no commit touched the path.
    async fn commit_log(&self, path: &Path) -> SnapshotResult<Vec<CommitLogEntry>>;

    /// Raw content of `path` as of `commit`.
    ///
    /// Fails with [`SnapshotError::FileNotFound`](crate::SnapshotError::FileNotFound)
    /// when the path did not exist at that commit.
    async fn content_at(&self, commit: &str, path: &Path) -> SnapshotResult<Vec<u8>>;

    /// Whether `path` existed in the (first) parent of `commit`.
    ///
    /// Root commits have no parent and report `false`.
    async fn existed_at_parent(&self, commit: &str, path: &Path) -> SnapshotResult<bool>;
}

/// Configuration for store access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Upper bound for a single store call.
    pub timeout: Duration,
    /// Signature used when recording commits.
    pub author_name: String,
    pub author_email: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            author_name: "yamltrail".to_string(),
            author_email: "yamltrail@localhost".to_string(),
        }
    }
}
