//! Commit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit in a file's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLogEntry {
    /// Full commit hash.
    pub hash: String,
    /// Commit time.
    pub date: DateTime<Utc>,
    /// Author name.
    pub author: String,
    /// Author email.
    #[serde(default)]
    pub email: String,
    /// Commit message (first line).
    pub message: String,
}

impl CommitLogEntry {
    pub fn new(
        hash: impl Into<String>,
        date: DateTime<Utc>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            date,
            author: author.into(),
            email: String::new(),
            message: message.into(),
        }
    }

    /// Abbreviated hash for display.
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.hash.len());
        &self.hash[..end]
    }

    pub(crate) fn from_commit(commit: &git2::Commit) -> Self {
        let author = commit.author();
        Self {
            hash: commit.id().to_string(),
            date: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
            author: author.name().unwrap_or("").to_string(),
            email: author.email().unwrap_or("").to_string(),
            message: commit.summary().unwrap_or("").to_string(),
        }
    }
}
