//! Test fixtures for creating reproducible git-backed document histories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use yamltrail_snapshot::{CommitLogEntry, GitSnapshotStore, StoreConfig};

/// A temporary git repository whose documents are committed through a
/// [`GitSnapshotStore`].
///
/// The directory is removed when the `TestRepo` is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let repo = TestRepo::new();
/// let first = repo.commit("scripts.yaml", "morning:\n  sequence: []\n", "add").await;
/// repo.remove("scripts.yaml", "delete").await;
/// assert!(!repo.path().join("scripts.yaml").exists());
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
    store: GitSnapshotStore,
}

impl TestRepo {
    /// Initialize an empty repository with a test identity.
    pub fn new() -> Self {
        Self::with_config(StoreConfig {
            author_name: "Test User".to_string(),
            author_email: "test@example.com".to_string(),
            ..StoreConfig::default()
        })
    }

    /// Initialize an empty repository whose store uses `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let repo = git2::Repository::init(temp_dir.path()).expect("Failed to init repository");
        {
            let mut git_config = repo.config().expect("Failed to open repository config");
            git_config
                .set_str("user.name", &config.author_name)
                .expect("Failed to set user.name");
            git_config
                .set_str("user.email", &config.author_email)
                .expect("Failed to set user.email");
        }

        let store = GitSnapshotStore::open(temp_dir.path(), config).expect("Failed to open store");
        Self { temp_dir, store }
    }

    /// Root of the working tree.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a document in the working tree.
    pub fn file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path().join(relative)
    }

    pub fn store(&self) -> &GitSnapshotStore {
        &self.store
    }

    /// A shareable handle on the same repository.
    pub fn shared_store(&self) -> Arc<GitSnapshotStore> {
        Arc::new(self.store.clone())
    }

    /// Write a document without committing it.
    pub fn write(&self, relative: impl AsRef<Path>, content: &str) {
        let full_path = self.file(relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create directory {}: {}", parent.display(), e)
            });
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
    }

    /// Read a document from the working tree.
    pub fn read(&self, relative: impl AsRef<Path>) -> String {
        let full_path = self.file(relative);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", full_path.display(), e))
    }

    /// Write a document and commit it.
    pub async fn commit(
        &self,
        relative: impl AsRef<Path>,
        content: &str,
        message: &str,
    ) -> CommitLogEntry {
        let relative = relative.as_ref();
        self.write(relative, content);
        self.record(relative, message).await
    }

    /// Delete a document and commit the deletion.
    pub async fn remove(&self, relative: impl AsRef<Path>, message: &str) -> CommitLogEntry {
        let relative = relative.as_ref();
        let full_path = self.file(relative);
        fs::remove_file(&full_path)
            .unwrap_or_else(|e| panic!("Failed to remove file {}: {}", full_path.display(), e));
        self.record(relative, message).await
    }

    /// Commit the current working-tree state of a document.
    pub async fn record(&self, relative: impl AsRef<Path>, message: &str) -> CommitLogEntry {
        let relative = relative.as_ref();
        self.store
            .record(relative, message)
            .await
            .unwrap_or_else(|e| panic!("Failed to commit {}: {}", relative.display(), e))
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
