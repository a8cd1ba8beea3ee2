//! Snapshot store adapter for yamltrail.
//!
//! A snapshot store exposes the commit history of individual files and the raw
//! content of a file at any recorded commit. Two implementations are provided:
//!
//! - [`GitSnapshotStore`] reads a git repository through `git2`
//! - [`MemorySnapshotStore`] keeps an ordered list of commits in memory (for testing)
//!
//! # Example
//!
//! ```no_run
//! use yamltrail_snapshot::{GitSnapshotStore, SnapshotStore, StoreConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = GitSnapshotStore::open("/config", StoreConfig::default())?;
//!
//! let log = store.commit_log(Path::new("automations.yaml")).await?;
//! for entry in &log {
//!     let content = store.content_at(&entry.hash, Path::new("automations.yaml")).await;
//!     println!("{} {} ({} bytes)", entry.short_hash(), entry.message, content.map(|c| c.len()).unwrap_or(0));
//! }
//! # Ok(())
//! # }
//! ```

mod commit;
mod error;
mod git;
mod memory;
mod store;

pub use commit::CommitLogEntry;
pub use error::{SnapshotError, SnapshotResult};
pub use git::GitSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use store::{SnapshotStore, StoreConfig};
