//! Error types for the core crate.

use std::time::Duration;
use thiserror::Error;
use yamltrail_snapshot::SnapshotError;

/// A document that is not valid YAML.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the failure, when known.
    pub line: Option<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        Self {
            line: err.location().map(|l| l.line()),
            message: err.to_string(),
        }
    }
}

/// Errors from history reconstruction and restore.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A document at some commit could not be parsed.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    /// The entity does not exist in the requested snapshot.
    #[error("{identity} not found at {commit}")]
    EntityNotFound { identity: String, commit: String },

    /// The store holds no commits for the path.
    #[error("no history for {0}")]
    NoHistory(String),

    /// The document did not exist at the requested commit.
    #[error("{path} did not exist at {commit}")]
    FileNotFound { path: String, commit: String },

    /// The commit reference could not be resolved.
    #[error("unknown commit: {0}")]
    UnknownCommit(String),

    /// A snapshot store call exceeded its deadline.
    #[error("snapshot store timed out during {operation} after {}ms", after.as_millis())]
    StoreTimeout {
        operation: &'static str,
        after: Duration,
    },

    /// The snapshot store could not serve the request.
    #[error("snapshot store unavailable: {0}")]
    StoreUnavailable(String),

    /// The live document cannot be parsed, so nothing can be merged into it.
    #[error("live document {path} is unreadable: {reason}")]
    DocumentUnreadable { path: String, reason: String },

    /// Writing the merged document failed. The previous content is intact.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A streaming scan ended without reporting completion.
    #[error("history scan aborted: {0}")]
    ScanAborted(String),

    /// The document path is not inside the tracked repository.
    #[error("path is outside the repository: {0}")]
    InvalidPath(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SnapshotError> for HistoryError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::NoHistory(path) => Self::NoHistory(path),
            SnapshotError::FileNotFound { commit, path } => Self::FileNotFound { path, commit },
            SnapshotError::UnknownCommit(commit) => Self::UnknownCommit(commit),
            SnapshotError::Timeout { operation, after } => Self::StoreTimeout { operation, after },
            SnapshotError::Unavailable(message) => Self::StoreUnavailable(message),
            SnapshotError::Git(e) => Self::StoreUnavailable(e.message().to_string()),
            SnapshotError::Io(e) => Self::StoreUnavailable(e.to_string()),
        }
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON syntax or shape.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// A field holds a value outside its allowed range.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type for core operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
