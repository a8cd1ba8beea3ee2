//! The entity history service.

use crate::config::Config;
use crate::document::{ContainerShape, Document};
use crate::error::{HistoryError, HistoryResult};
use crate::extract::{locate, EntityEntry};
use crate::history::{HistoryScan, HistoryWalker, LogicalVersion};
use crate::identity::{EntityIdentity, EntityKind};
use crate::restore::{merge_entity, read_live, write_atomic, RestoreOutcome};
use crate::value::EntityValue;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use yamltrail_snapshot::{SnapshotError, SnapshotStore};
use yamltrail_util::path::repo_relative;
use yamltrail_util::PathLocks;

/// Reconstructs and restores entity history for documents under one root.
///
/// Document paths may be given relative to the root or as absolute paths
/// inside it. Restores on the same path are serialized through a
/// [`PathLocks`] registry, which can be shared with other writers of the
/// same files via [`EntityHistory::with_locks`].
pub struct EntityHistory {
    store: Arc<dyn SnapshotStore>,
    root: PathBuf,
    config: Config,
    locks: Arc<PathLocks>,
}

impl EntityHistory {
    pub fn new(store: Arc<dyn SnapshotStore>, root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            store,
            root: root.into(),
            config,
            locks: Arc::new(PathLocks::new()),
        }
    }

    pub fn with_locks(mut self, locks: Arc<PathLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn locks(&self) -> &Arc<PathLocks> {
        &self.locks
    }

    /// Start a streaming history scan for `identity`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn scan(&self, identity: &EntityIdentity) -> HistoryResult<HistoryScan> {
        let (identity, _) = self.resolve(identity)?;
        let walker = HistoryWalker::new(self.store.clone(), identity)
            .with_max_commits(self.config.max_commits());
        Ok(walker.spawn(self.config.channel_capacity()))
    }

    /// Distinct versions of the entity, newest first.
    pub async fn reconstruct_history(
        &self,
        identity: &EntityIdentity,
    ) -> HistoryResult<Vec<LogicalVersion>> {
        let (versions, _) = self.scan(identity)?.collect().await?;
        Ok(versions)
    }

    /// The entity's value as of `commit`.
    pub async fn entity_at(
        &self,
        identity: &EntityIdentity,
        commit: &str,
    ) -> HistoryResult<EntityValue> {
        let (identity, _) = self.resolve(identity)?;
        let (value, _) = self.fetch_entity(&identity, commit).await?;
        Ok(value)
    }

    /// The entity's value in the live document.
    pub async fn current_entity(&self, identity: &EntityIdentity) -> HistoryResult<EntityValue> {
        let (identity, absolute) = self.resolve(identity)?;
        read_live(&absolute, identity.kind, false)
            .await?
            .and_then(|document| {
                locate(&document, identity.kind, &identity.identifier)
                    .map(|located| EntityValue::new(located.value.clone()))
            })
            .ok_or_else(|| HistoryError::EntityNotFound {
                identity: identity.to_string(),
                commit: "working tree".to_string(),
            })
    }

    /// Entities of `kind` in the document, at `commit` or in the live file.
    pub async fn list_entities(
        &self,
        path: &Path,
        kind: EntityKind,
        commit: Option<&str>,
    ) -> HistoryResult<Vec<EntityEntry>> {
        let (relative, absolute) = self.paths(path)?;
        let document = match commit {
            Some(commit) => self.snapshot(&relative, commit).await?,
            None => match read_live(&absolute, kind, false).await? {
                Some(document) => document,
                None => return Ok(Vec::new()),
            },
        };
        Ok(document.entities(kind))
    }

    /// Write the entity's value at `target_commit` back into the live document.
    pub async fn restore_entity(
        &self,
        identity: &EntityIdentity,
        target_commit: &str,
    ) -> HistoryResult<RestoreOutcome> {
        let (identity, absolute) = self.resolve(identity)?;
        let _guard = self.locks.acquire(&absolute).await;

        let (restored, target_shape) = self.fetch_entity(&identity, target_commit).await?;
        let live = read_live(&absolute, identity.kind, self.config.replace_unreadable()).await?;
        let merged = merge_entity(live, &identity, &restored, &target_shape)?;

        let text = merged.document.to_yaml().map_err(|e| HistoryError::Write {
            path: absolute.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        })?;
        write_atomic(&absolute, text.as_bytes()).await?;

        info!(
            entity = %identity,
            commit = target_commit,
            action = merged.action.as_str(),
            "Restored entity"
        );
        Ok(RestoreOutcome {
            identity,
            commit: target_commit.to_string(),
            shape: merged.shape,
            action: merged.action,
            path: absolute,
        })
    }

    async fn fetch_entity(
        &self,
        identity: &EntityIdentity,
        commit: &str,
    ) -> HistoryResult<(EntityValue, ContainerShape)> {
        let not_found = || HistoryError::EntityNotFound {
            identity: identity.to_string(),
            commit: commit.to_string(),
        };

        let document = match self.snapshot(identity.path(), commit).await {
            Err(HistoryError::FileNotFound { .. }) => return Err(not_found()),
            other => other?,
        };
        let located = locate(&document, identity.kind, &identity.identifier).ok_or_else(not_found)?;
        Ok((EntityValue::new(located.value.clone()), located.shape))
    }

    async fn snapshot(&self, relative: &Path, commit: &str) -> HistoryResult<Document> {
        let bytes = self
            .store
            .content_at(commit, relative)
            .await
            .map_err(|e| match e {
                SnapshotError::FileNotFound { commit, path } => {
                    HistoryError::FileNotFound { path, commit }
                }
                other => other.into(),
            })?;
        Document::from_bytes(&bytes).map_err(|source| HistoryError::Parse {
            path: relative.display().to_string(),
            source,
        })
    }

    /// The identity re-keyed on the repository-relative path, plus the file
    /// it lives in.
    fn resolve(&self, identity: &EntityIdentity) -> HistoryResult<(EntityIdentity, PathBuf)> {
        let (relative, absolute) = self.paths(identity.path())?;
        let identity = EntityIdentity {
            document_path: relative,
            ..identity.clone()
        };
        Ok((identity, absolute))
    }

    fn paths(&self, path: &Path) -> HistoryResult<(PathBuf, PathBuf)> {
        let relative = repo_relative(path, &self.root)
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| HistoryError::InvalidPath(path.display().to_string()))?;
        let absolute = self.root.join(&relative);
        Ok((relative, absolute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identifier;
    use crate::restore::MergeAction;
    use tempfile::TempDir;
    use yamltrail_snapshot::MemorySnapshotStore;

    const PATH: &str = "automations.yaml";

    fn service(store: MemorySnapshotStore) -> (TempDir, EntityHistory) {
        let dir = TempDir::new().unwrap();
        let history = EntityHistory::new(Arc::new(store), dir.path(), Config::default());
        (dir, history)
    }

    fn identity(id: &str) -> EntityIdentity {
        EntityIdentity::new(PATH, EntityKind::Automation, Identifier::parse(id))
    }

    #[tokio::test]
    async fn test_entity_at_and_missing_entity() {
        let store = MemorySnapshotStore::new();
        let c1 = store.write(PATH, "- {id: a, alias: A}\n", "one");
        let (_dir, history) = service(store);

        let value = history.entity_at(&identity("a"), &c1.hash).await.unwrap();
        assert_eq!(value.alias(), Some("A"));

        let err = history.entity_at(&identity("b"), &c1.hash).await.unwrap_err();
        assert!(matches!(err, HistoryError::EntityNotFound { .. }));
    }

    #[tokio::test]
    async fn test_current_entity_reads_working_tree() {
        let (dir, history) = service(MemorySnapshotStore::new());
        assert!(history.current_entity(&identity("a")).await.is_err());

        std::fs::write(dir.path().join(PATH), "- {id: a, alias: Live}\n").unwrap();
        let value = history.current_entity(&identity("a")).await.unwrap();
        assert_eq!(value.alias(), Some("Live"));
    }

    #[tokio::test]
    async fn test_restore_into_missing_file() {
        let store = MemorySnapshotStore::new();
        let c1 = store.write(PATH, "automation:\n- id: a\n  alias: A\n", "one");
        store.delete(PATH, "gone");
        let (dir, history) = service(store);

        let outcome = history.restore_entity(&identity("a"), &c1.hash).await.unwrap();
        assert_eq!(outcome.action, MergeAction::Appended);
        assert_eq!(outcome.path, dir.path().join(PATH));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(PATH)).unwrap(),
            "automation:\n- id: a\n  alias: A\n"
        );
    }

    #[tokio::test]
    async fn test_restore_absent_at_target_fails() {
        let store = MemorySnapshotStore::new();
        let c1 = store.write(PATH, "- {id: a}\n", "one");
        let (dir, history) = service(store);
        std::fs::write(dir.path().join(PATH), "- {id: b}\n").unwrap();

        let err = history.restore_entity(&identity("z"), &c1.hash).await.unwrap_err();
        assert!(matches!(err, HistoryError::EntityNotFound { .. }));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(PATH)).unwrap(),
            "- {id: b}\n"
        );
    }

    #[tokio::test]
    async fn test_restore_unreadable_live_document() {
        let store = MemorySnapshotStore::new();
        let c1 = store.write(PATH, "- {id: a, alias: A}\n", "one");
        let (dir, history) = service(store);
        std::fs::write(dir.path().join(PATH), "- {id: [oops\n").unwrap();

        let err = history.restore_entity(&identity("a"), &c1.hash).await.unwrap_err();
        assert!(matches!(err, HistoryError::DocumentUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_paths_outside_root_are_rejected() {
        let (_dir, history) = service(MemorySnapshotStore::new());
        let outside = EntityIdentity::new(
            "../elsewhere.yaml",
            EntityKind::Script,
            Identifier::parse("x"),
        );
        assert!(matches!(
            history.reconstruct_history(&outside).await,
            Err(HistoryError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_absolute_path_is_made_relative() {
        let store = MemorySnapshotStore::new();
        store.write(PATH, "- {id: a, alias: A}\n", "one");
        let (dir, history) = service(store);

        let absolute = EntityIdentity::new(
            dir.path().join(PATH),
            EntityKind::Automation,
            Identifier::parse("a"),
        );
        let versions = history.reconstruct_history(&absolute).await.unwrap();
        assert_eq!(versions.len(), 1);
    }

    #[tokio::test]
    async fn test_list_entities_live_and_historical() {
        let store = MemorySnapshotStore::new();
        let c1 = store.write(PATH, "- {id: a}\n- {id: b}\n", "one");
        let (dir, history) = service(store);

        assert!(history
            .list_entities(Path::new(PATH), EntityKind::Automation, None)
            .await
            .unwrap()
            .is_empty());

        std::fs::write(dir.path().join(PATH), "- {id: c}\n").unwrap();
        let live = history
            .list_entities(Path::new(PATH), EntityKind::Automation, None)
            .await
            .unwrap();
        assert_eq!(live.len(), 1);

        let past = history
            .list_entities(Path::new(PATH), EntityKind::Automation, Some(&c1.hash))
            .await
            .unwrap();
        assert_eq!(past.len(), 2);
    }
}
