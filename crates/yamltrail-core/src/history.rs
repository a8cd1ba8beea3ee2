//! Entity history reconstruction.
//!
//! The commit log of a document is walked newest to oldest. Each commit is
//! reduced to an [`Observation`] of the entity, and a [`RunTracker`]
//! run-length encodes those observations into [`LogicalVersion`]s. Every
//! version is attributed to the *oldest* commit of its run, i.e. the point
//! since which the entity has looked that way.
//!
//! Scans stream: versions are sent over a bounded channel as soon as their
//! run closes, followed by exactly one terminal event.

use crate::error::{HistoryError, HistoryResult};
use crate::document::Document;
use crate::extract::extract;
use crate::identity::EntityIdentity;
use crate::value::EntityValue;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use yamltrail_snapshot::{CommitLogEntry, SnapshotStore};

/// Why a logical version begins where it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrigin {
    /// The next older commit held a different value.
    Modified,
    /// The next older commit did not contain the entity.
    Created,
    /// The run reaches back to the commit that introduced the document.
    FileCreated,
    /// Continuity past this point cannot be verified.
    Unknown,
}

impl VersionOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Created => "created",
            Self::FileCreated => "file created",
            Self::Unknown => "unknown",
        }
    }
}

/// A maximal run of commits during which an entity's value did not change.
#[derive(Debug, Clone, Serialize)]
pub struct LogicalVersion {
    /// Oldest commit of the run.
    pub commit: CommitLogEntry,
    pub value: EntityValue,
    pub origin: VersionOrigin,
}

/// What one commit says about the entity.
#[derive(Debug, Clone)]
pub enum Observation {
    Present(EntityValue),
    /// The document exists but does not contain the entity.
    Absent,
    /// The document does not exist at this commit.
    FileMissing,
    /// The document could not be parsed at this commit.
    Unreadable,
}

#[derive(Debug)]
struct Candidate {
    commit: CommitLogEntry,
    value: EntityValue,
}

/// Run-length state machine over observations, fed newest first.
#[derive(Debug, Default)]
pub struct RunTracker {
    candidate: Option<Candidate>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the observation for the next older commit.
    ///
    /// Returns the version whose run this observation closed, if any.
    pub fn observe(
        &mut self,
        commit: &CommitLogEntry,
        observation: Observation,
    ) -> Option<LogicalVersion> {
        match observation {
            Observation::Present(value) => {
                if let Some(candidate) = self.candidate.as_mut() {
                    if candidate.value == value {
                        candidate.commit = commit.clone();
                        return None;
                    }
                }
                let closed = self.flush(VersionOrigin::Modified);
                self.open(commit, value);
                closed
            }
            Observation::Absent => self.flush(VersionOrigin::Created),
            Observation::FileMissing => self.flush(VersionOrigin::FileCreated),
            Observation::Unreadable => self.flush(VersionOrigin::Unknown),
        }
    }

    /// Oldest commit of the open run.
    pub fn pending(&self) -> Option<&CommitLogEntry> {
        self.candidate.as_ref().map(|c| &c.commit)
    }

    /// Close the run still open after the oldest commit.
    pub fn finish(mut self, origin: VersionOrigin) -> Option<LogicalVersion> {
        self.flush(origin)
    }

    fn open(&mut self, commit: &CommitLogEntry, value: EntityValue) {
        self.candidate = Some(Candidate {
            commit: commit.clone(),
            value,
        });
    }

    fn flush(&mut self, origin: VersionOrigin) -> Option<LogicalVersion> {
        self.candidate.take().map(|c| LogicalVersion {
            commit: c.commit,
            value: c.value,
            origin,
        })
    }
}

/// Totals reported when a scan completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub versions: usize,
    /// Commits examined.
    pub commits: usize,
    /// Whether the commit log was cut short by `history.max_commits`.
    pub truncated: bool,
}

/// Event produced by a streaming scan.
#[derive(Debug)]
pub enum ScanEvent {
    Version(LogicalVersion),
    Complete(ScanSummary),
    Failed(HistoryError),
}

/// Walks the history of one entity.
pub struct HistoryWalker {
    store: Arc<dyn SnapshotStore>,
    identity: EntityIdentity,
    max_commits: Option<usize>,
}

impl HistoryWalker {
    pub fn new(store: Arc<dyn SnapshotStore>, identity: EntityIdentity) -> Self {
        Self {
            store,
            identity,
            max_commits: None,
        }
    }

    pub fn with_max_commits(mut self, max_commits: Option<usize>) -> Self {
        self.max_commits = max_commits;
        self
    }

    /// Run the scan on a new task.
    pub fn spawn(self, capacity: usize) -> HistoryScan {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(tx));
        HistoryScan { rx, handle }
    }

    /// Run the scan, sending versions and then one terminal event.
    pub async fn run(self, tx: mpsc::Sender<ScanEvent>) {
        let terminal = match self.walk(&tx).await {
            Ok(summary) => {
                info!(
                    entity = %self.identity,
                    versions = summary.versions,
                    commits = summary.commits,
                    "History scan complete"
                );
                ScanEvent::Complete(summary)
            }
            Err(e) => {
                warn!(entity = %self.identity, error = %e, "History scan failed");
                ScanEvent::Failed(e)
            }
        };
        // The consumer may already be gone.
        let _ = tx.send(terminal).await;
    }

    async fn walk(&self, tx: &mpsc::Sender<ScanEvent>) -> HistoryResult<ScanSummary> {
        let path = self.identity.path();
        let mut log = self.store.commit_log(path).await?;

        let truncated = match self.max_commits {
            Some(max) if log.len() > max => {
                debug!(total = log.len(), max, "Truncating commit log");
                log.truncate(max);
                true
            }
            _ => false,
        };

        let mut summary = ScanSummary {
            versions: 0,
            commits: 0,
            truncated,
        };
        let mut tracker = RunTracker::new();

        for commit in &log {
            let observation = self.observe(commit).await;
            summary.commits += 1;
            if let Some(version) = tracker.observe(commit, observation) {
                if !emit(tx, version, &mut summary).await {
                    return Ok(summary);
                }
            }
        }

        if let Some(oldest) = tracker.pending().map(|c| c.hash.clone()) {
            // A run reaching the commit that introduced the file began with it.
            let origin = if truncated {
                VersionOrigin::Unknown
            } else {
                match self.store.existed_at_parent(&oldest, path).await {
                    Ok(false) => VersionOrigin::FileCreated,
                    Ok(true) => VersionOrigin::Unknown,
                    Err(e) => {
                        warn!(commit = %oldest, error = %e, "Parent lookup failed");
                        VersionOrigin::Unknown
                    }
                }
            };
            if let Some(version) = tracker.finish(origin) {
                emit(tx, version, &mut summary).await;
            }
        }

        Ok(summary)
    }

    /// Reduce one commit to an observation. Failures are local to the commit.
    async fn observe(&self, commit: &CommitLogEntry) -> Observation {
        let path = self.identity.path();
        let bytes = match self.store.content_at(&commit.hash, path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_content_local() => {
                debug!(commit = commit.short_hash(), "Document absent at commit");
                return Observation::FileMissing;
            }
            Err(e) => {
                warn!(
                    commit = commit.short_hash(),
                    path = %path.display(),
                    error = %e,
                    "Snapshot fetch failed, closing run"
                );
                return Observation::Unreadable;
            }
        };

        let document = match Document::from_bytes(&bytes) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    commit = commit.short_hash(),
                    path = %path.display(),
                    error = %e,
                    "Unparseable snapshot, closing run"
                );
                return Observation::Unreadable;
            }
        };

        let observation = match extract(&document, self.identity.kind, &self.identity.identifier) {
            Some(value) => Observation::Present(value),
            None => Observation::Absent,
        };
        debug!(
            commit = commit.short_hash(),
            present = matches!(observation, Observation::Present(_)),
            "Observed entity"
        );
        observation
    }
}

/// Send one version; false when the consumer has gone away.
async fn emit(
    tx: &mpsc::Sender<ScanEvent>,
    version: LogicalVersion,
    summary: &mut ScanSummary,
) -> bool {
    summary.versions += 1;
    if tx.send(ScanEvent::Version(version)).await.is_err() {
        debug!("History consumer dropped, stopping scan");
        return false;
    }
    true
}

/// Receiving side of a running scan.
pub struct HistoryScan {
    rx: mpsc::Receiver<ScanEvent>,
    handle: JoinHandle<()>,
}

impl HistoryScan {
    /// Next event; `None` after the terminal event has been received.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        self.rx.recv().await
    }

    /// Drain the scan into a newest-first list of versions.
    pub async fn collect(mut self) -> HistoryResult<(Vec<LogicalVersion>, ScanSummary)> {
        let mut versions = Vec::new();
        while let Some(event) = self.rx.recv().await {
            match event {
                ScanEvent::Version(version) => versions.push(version),
                ScanEvent::Complete(summary) => return Ok((versions, summary)),
                ScanEvent::Failed(e) => return Err(e),
            }
        }

        let reason = match self.handle.await {
            Err(e) if e.is_panic() => "scan task panicked".to_string(),
            Err(e) => e.to_string(),
            Ok(()) => "scan ended without completion".to_string(),
        };
        Err(HistoryError::ScanAborted(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{EntityKind, Identifier};
    use yamltrail_snapshot::MemorySnapshotStore;

    const PATH: &str = "automations.yaml";

    fn value(text: &str) -> EntityValue {
        EntityValue::new(serde_yaml::from_str(text).unwrap())
    }

    fn commit(n: u32) -> CommitLogEntry {
        CommitLogEntry::new(
            format!("{n:040}"),
            chrono::DateTime::from_timestamp(i64::from(n) * 60, 0).unwrap(),
            "Test User",
            format!("commit {n}"),
        )
    }

    fn identity(id: &str) -> EntityIdentity {
        EntityIdentity::new(PATH, EntityKind::Automation, Identifier::parse(id))
    }

    async fn history(store: MemorySnapshotStore, id: &str) -> HistoryResult<Vec<LogicalVersion>> {
        let walker = HistoryWalker::new(Arc::new(store), identity(id));
        walker.spawn(4).collect().await.map(|(versions, _)| versions)
    }

    #[test]
    fn test_tracker_extends_run_backward() {
        let mut tracker = RunTracker::new();
        let (c1, c2, c3) = (commit(1), commit(2), commit(3));
        assert!(tracker.observe(&c1, Observation::Present(value("a: 1"))).is_none());
        assert!(tracker.observe(&c2, Observation::Present(value("a: 1"))).is_none());
        assert!(tracker.observe(&c3, Observation::Present(value("{a: 1}"))).is_none());
        assert_eq!(tracker.pending(), Some(&c3));

        let version = tracker.finish(VersionOrigin::FileCreated).unwrap();
        assert_eq!(version.commit, c3);
        assert_eq!(version.origin, VersionOrigin::FileCreated);
    }

    #[test]
    fn test_tracker_flushes_on_change() {
        let mut tracker = RunTracker::new();
        tracker.observe(&commit(1), Observation::Present(value("a: 2")));
        let closed = tracker
            .observe(&commit(2), Observation::Present(value("a: 1")))
            .unwrap();
        assert_eq!(closed.commit, commit(1));
        assert_eq!(closed.origin, VersionOrigin::Modified);
        assert_eq!(tracker.pending(), Some(&commit(2)));
    }

    #[test]
    fn test_tracker_boundaries() {
        for (observation, origin) in [
            (Observation::Absent, VersionOrigin::Created),
            (Observation::FileMissing, VersionOrigin::FileCreated),
            (Observation::Unreadable, VersionOrigin::Unknown),
        ] {
            let mut tracker = RunTracker::new();
            tracker.observe(&commit(1), Observation::Present(value("a: 1")));
            let closed = tracker.observe(&commit(2), observation).unwrap();
            assert_eq!(closed.origin, origin);
            assert!(tracker.pending().is_none());
        }
    }

    #[test]
    fn test_tracker_ignores_absence_without_run() {
        let mut tracker = RunTracker::new();
        assert!(tracker.observe(&commit(1), Observation::Absent).is_none());
        assert!(tracker.finish(VersionOrigin::Unknown).is_none());
    }

    #[tokio::test]
    async fn test_walk_concrete_scenario() {
        let store = MemorySnapshotStore::new();
        let c2 = store.write(PATH, "- {id: 1, alias: A}\n- {id: 2, alias: X}\n", "c2");
        let c1 = store.write(PATH, "- {id: 1, alias: A2}\n- {id: 2, alias: X}\n", "c1");

        let versions = history(store, "1").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].commit, c1);
        assert_eq!(versions[0].value.alias(), Some("A2"));
        assert_eq!(versions[0].origin, VersionOrigin::Modified);
        assert_eq!(versions[1].commit, c2);
        assert_eq!(versions[1].value.alias(), Some("A"));
        assert_eq!(versions[1].origin, VersionOrigin::FileCreated);
    }

    #[tokio::test]
    async fn test_walk_finds_zero_padded_stable_id() {
        let store = MemorySnapshotStore::new();
        let c1 = store.write(PATH, "- {id: '007', alias: Bond, trigger: []}\n", "c1");

        let versions = history(store, "007").await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].commit, c1);
        assert_eq!(versions[0].value.alias(), Some("Bond"));
    }

    #[tokio::test]
    async fn test_walk_unparseable_commit_splits_runs() {
        let store = MemorySnapshotStore::new();
        let c3 = store.write(PATH, "- {id: a, alias: A}\n", "c3");
        store.write(PATH, "- {id: a, alias: [broken\n", "c2");
        let c1 = store.write(PATH, "- {id: a, alias: A}\n", "c1");

        let versions = history(store, "a").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].commit, c1);
        assert_eq!(versions[0].origin, VersionOrigin::Unknown);
        assert_eq!(versions[1].commit, c3);
    }

    #[tokio::test]
    async fn test_walk_file_deleted_and_recreated() {
        let store = MemorySnapshotStore::new();
        let c4 = store.write(PATH, "- {id: a, alias: A}\n", "c4");
        store.delete(PATH, "c3");
        let c2 = store.write(PATH, "- {id: a, alias: A}\n", "c2");

        let versions = history(store, "a").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].commit, c2);
        assert_eq!(versions[0].origin, VersionOrigin::FileCreated);
        assert_eq!(versions[1].commit, c4);
    }

    #[tokio::test]
    async fn test_walk_max_commits_marks_oldest_unknown() {
        let store = MemorySnapshotStore::new();
        store.write(PATH, "- {id: a, alias: A}\n", "c3");
        store.write(PATH, "- {id: a, alias: A}\n- {id: b}\n", "c2");
        let c1 = store.write(PATH, "- {id: a, alias: A}\n- {id: c}\n", "c1");

        let walker = HistoryWalker::new(Arc::new(store), identity("a")).with_max_commits(Some(2));
        let (versions, summary) = walker.spawn(4).collect().await.unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.commits, 2);
        assert_eq!(versions.len(), 1);
        assert_ne!(versions[0].commit, c1);
        assert_eq!(versions[0].origin, VersionOrigin::Unknown);
    }

    #[tokio::test]
    async fn test_walk_untracked_path_fails() {
        let store = MemorySnapshotStore::new();
        store.write("scripts.yaml", "{}\n", "other");
        let err = history(store, "a").await.unwrap_err();
        assert!(matches!(err, HistoryError::NoHistory(_)));
    }

    #[tokio::test]
    async fn test_stream_ends_with_complete() {
        let store = MemorySnapshotStore::new();
        store.write(PATH, "- {id: a, alias: A}\n", "one");
        store.write(PATH, "- {id: a, alias: B}\n", "two");

        let mut scan = HistoryWalker::new(Arc::new(store), identity("a")).spawn(1);
        let mut versions = 0;
        loop {
            match scan.recv().await {
                Some(ScanEvent::Version(_)) => versions += 1,
                Some(ScanEvent::Complete(summary)) => {
                    assert_eq!(summary.versions, versions);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(versions, 2);
        assert!(scan.recv().await.is_none());
    }
}
