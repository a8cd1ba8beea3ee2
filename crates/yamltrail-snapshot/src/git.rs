//! Git-backed snapshot store.
//!
//! Every call opens the repository on a blocking worker thread and is bounded
//! by [`StoreConfig::timeout`]. `git2::Repository` is not `Sync`, so nothing is
//! shared between calls except the repository path.

use crate::{CommitLogEntry, SnapshotError, SnapshotResult, SnapshotStore, StoreConfig};
use async_trait::async_trait;
use git2::{ErrorCode, Oid, Repository, Signature, Sort, Tree};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use yamltrail_util::path::to_git_path;

/// Snapshot store reading a git working repository.
#[derive(Debug, Clone)]
pub struct GitSnapshotStore {
    root: PathBuf,
    config: StoreConfig,
}

impl GitSnapshotStore {
    /// Open the repository whose working directory is `root`.
    pub fn open(root: impl Into<PathBuf>, config: StoreConfig) -> SnapshotResult<Self> {
        let root = root.into();
        open_repo(&root)?;
        Ok(Self { root, config })
    }

    /// Working directory of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Stage `path` (or its deletion) and commit it on HEAD.
    pub async fn record(&self, path: &Path, message: &str) -> SnapshotResult<CommitLogEntry> {
        let git_path = to_git_path(path);
        let message = message.to_string();
        let name = self.config.author_name.clone();
        let email = self.config.author_email.clone();
        let root = self.root.clone();

        let entry = self
            .run("record", move |repo| {
                let mut index = repo.index()?;
                if root.join(&git_path).exists() {
                    index.add_path(Path::new(&git_path))?;
                } else {
                    index.remove_path(Path::new(&git_path))?;
                }
                index.write()?;

                let tree_id = index.write_tree()?;
                let tree = repo.find_tree(tree_id)?;
                let sig = Signature::now(&name, &email)?;

                let parents = match repo.head() {
                    Ok(head) => vec![head.peel_to_commit()?],
                    Err(_) => vec![],
                };
                let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

                let id = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parent_refs)?;
                Ok(CommitLogEntry::from_commit(&repo.find_commit(id)?))
            })
            .await?;

        info!(
            path = %path.display(),
            commit = entry.short_hash(),
            "Recorded snapshot"
        );
        Ok(entry)
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> SnapshotResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> SnapshotResult<T> + Send + 'static,
    {
        let root = self.root.clone();
        let task = tokio::task::spawn_blocking(move || {
            let repo = open_repo(&root)?;
            f(&repo)
        });

        match tokio::time::timeout(self.config.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(SnapshotError::unavailable(format!(
                "{operation} worker failed: {join_err}"
            ))),
            Err(_) => Err(SnapshotError::Timeout {
                operation,
                after: self.config.timeout,
            }),
        }
    }
}

#[async_trait]
impl SnapshotStore for GitSnapshotStore {
    async fn commit_log(&self, path: &Path) -> SnapshotResult<Vec<CommitLogEntry>> {
        let git_path = to_git_path(path);
        let entries = self
            .run("commit_log", move |repo| commit_log(repo, &git_path))
            .await?;
        debug!(path = %path.display(), commits = entries.len(), "Loaded commit log");
        Ok(entries)
    }

    async fn content_at(&self, commit: &str, path: &Path) -> SnapshotResult<Vec<u8>> {
        let git_path = to_git_path(path);
        let commit = commit.to_string();
        self.run("content_at", move |repo| {
            let tree = resolve_commit(repo, &commit)?.tree()?;
            let blob_id = blob_id_at(&tree, &git_path)?
                .ok_or_else(|| SnapshotError::file_not_found(&commit, &git_path))?;
            let blob = repo.find_blob(blob_id)?;
            Ok(blob.content().to_vec())
        })
        .await
    }

    async fn existed_at_parent(&self, commit: &str, path: &Path) -> SnapshotResult<bool> {
        let git_path = to_git_path(path);
        let commit = commit.to_string();
        self.run("existed_at_parent", move |repo| {
            let commit = resolve_commit(repo, &commit)?;
            if commit.parent_count() == 0 {
                return Ok(false);
            }
            let parent_tree = commit.parent(0)?.tree()?;
            Ok(blob_id_at(&parent_tree, &git_path)?.is_some())
        })
        .await
    }
}

fn open_repo(root: &Path) -> SnapshotResult<Repository> {
    Repository::open(root).map_err(|e| {
        SnapshotError::unavailable(format!(
            "cannot open repository at {}: {}",
            root.display(),
            e.message()
        ))
    })
}

fn resolve_commit<'r>(repo: &'r Repository, reference: &str) -> SnapshotResult<git2::Commit<'r>> {
    let object = repo
        .revparse_single(reference)
        .map_err(|_| SnapshotError::UnknownCommit(reference.to_string()))?;
    object
        .peel_to_commit()
        .map_err(|_| SnapshotError::UnknownCommit(reference.to_string()))
}

fn blob_id_at(tree: &Tree, git_path: &str) -> SnapshotResult<Option<Oid>> {
    match tree.get_path(Path::new(git_path)) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Commits reachable from HEAD whose blob at `git_path` differs from their
/// first parent's, newest first. Deletions and the introducing commit count.
fn commit_log(repo: &Repository, git_path: &str) -> SnapshotResult<Vec<CommitLogEntry>> {
    if repo.head().is_err() {
        return Err(SnapshotError::NoHistory(git_path.to_string()));
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut entries = Vec::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        let current = blob_id_at(&commit.tree()?, git_path)?;
        let parent = if commit.parent_count() > 0 {
            blob_id_at(&commit.parent(0)?.tree()?, git_path)?
        } else {
            None
        };

        if current != parent {
            entries.push(CommitLogEntry::from_commit(&commit));
        }
    }

    if entries.is_empty() {
        return Err(SnapshotError::NoHistory(git_path.to_string()));
    }
    Ok(entries)
}
