//! In-memory snapshot store for testing.

use crate::{CommitLogEntry, SnapshotError, SnapshotResult, SnapshotStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory snapshot store.
///
/// Commits are linear; each one records the full set of files as of that
/// commit. Hashes and dates are deterministic so tests can assert on them.
pub struct MemorySnapshotStore {
    commits: RwLock<Vec<MemoryCommit>>,
    author: String,
}

struct MemoryCommit {
    entry: CommitLogEntry,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            commits: RwLock::new(Vec::new()),
            author: "Test User".to_string(),
        }
    }

    /// Commit new content for `path`.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        message: &str,
    ) -> CommitLogEntry {
        self.commit(
            message,
            vec![(path.as_ref().to_path_buf(), Some(content.as_ref().to_vec()))],
        )
    }

    /// Commit the removal of `path`.
    pub fn delete(&self, path: impl AsRef<Path>, message: &str) -> CommitLogEntry {
        self.commit(message, vec![(path.as_ref().to_path_buf(), None)])
    }

    /// Commit several changes at once; `None` removes the file.
    pub fn commit(&self, message: &str, changes: Vec<(PathBuf, Option<Vec<u8>>)>) -> CommitLogEntry {
        let mut commits = self
            .commits
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut files = commits.last().map(|c| c.files.clone()).unwrap_or_default();
        for (path, content) in changes {
            match content {
                Some(bytes) => {
                    files.insert(path, bytes);
                }
                None => {
                    files.remove(&path);
                }
            }
        }

        let seq = commits.len() + 1;
        let entry = CommitLogEntry {
            hash: format!("{:040x}", seq),
            date: commit_date(seq),
            author: self.author.clone(),
            email: "test@example.com".to_string(),
            message: message.to_string(),
        };
        commits.push(MemoryCommit {
            entry: entry.clone(),
            files,
        });
        entry
    }

    /// Number of recorded commits.
    pub fn len(&self) -> usize {
        self.commits.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(commits: &[MemoryCommit], reference: &str) -> SnapshotResult<usize> {
        if reference.is_empty() {
            return Err(SnapshotError::UnknownCommit(reference.to_string()));
        }
        commits
            .iter()
            .position(|c| c.entry.hash.starts_with(reference))
            .ok_or_else(|| SnapshotError::UnknownCommit(reference.to_string()))
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

fn commit_date(seq: usize) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    base + Duration::minutes(seq as i64)
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn commit_log(&self, path: &Path) -> SnapshotResult<Vec<CommitLogEntry>> {
        let commits = self
            .commits
            .read()
            .map_err(|e| SnapshotError::unavailable(e.to_string()))?;

        let mut log = Vec::new();
        let mut previous: Option<&Vec<u8>> = None;
        for commit in commits.iter() {
            let current = commit.files.get(path);
            if current != previous {
                log.push(commit.entry.clone());
            }
            previous = current;
        }

        if log.is_empty() {
            return Err(SnapshotError::NoHistory(path.display().to_string()));
        }
        log.reverse();
        Ok(log)
    }

    async fn content_at(&self, commit: &str, path: &Path) -> SnapshotResult<Vec<u8>> {
        let commits = self
            .commits
            .read()
            .map_err(|e| SnapshotError::unavailable(e.to_string()))?;
        let index = Self::find(&commits, commit)?;
        commits[index]
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| SnapshotError::file_not_found(commit, path.display().to_string()))
    }

    async fn existed_at_parent(&self, commit: &str, path: &Path) -> SnapshotResult<bool> {
        let commits = self
            .commits
            .read()
            .map_err(|e| SnapshotError::unavailable(e.to_string()))?;
        let index = Self::find(&commits, commit)?;
        Ok(index > 0 && commits[index - 1].files.contains_key(path))
    }
}
