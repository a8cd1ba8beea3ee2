//! Snapshot store error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for snapshot store operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while reading from a snapshot store.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The store has no commits touching the path.
    #[error("no history for {0}")]
    NoHistory(String),

    /// The path did not exist at the given commit.
    #[error("{path} not found at {commit}")]
    FileNotFound { commit: String, path: String },

    /// The commit reference could not be resolved.
    #[error("unknown commit: {0}")]
    UnknownCommit(String),

    /// A store call did not finish in time.
    #[error("snapshot store timed out during {operation} after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The store could not be reached (repository missing, worker died, ...).
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    /// Underlying git failure.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    pub fn file_not_found(commit: impl Into<String>, path: impl Into<String>) -> Self {
        Self::FileNotFound {
            commit: commit.into(),
            path: path.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Whether the failure says something about one commit's content rather
    /// than about the health of the store.
    pub fn is_content_local(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reports_operation_and_duration() {
        let err = SnapshotError::Timeout {
            operation: "commit_log",
            after: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "snapshot store timed out during commit_log after 250ms"
        );
    }

    #[test]
    fn only_missing_files_are_content_local() {
        assert!(SnapshotError::file_not_found("abc", "a.yaml").is_content_local());
        assert!(!SnapshotError::unavailable("gone").is_content_local());
        assert!(!SnapshotError::NoHistory("a.yaml".into()).is_content_local());
    }
}
