//! Entity history reconstruction and merge-restore for yamltrail.
//!
//! A tracked YAML document holds many independent entities (automations or
//! scripts). This crate provides:
//! - The document model: parsing and container shape classification
//! - Entity extraction by stable id, position or key
//! - History reconstruction: distinct versions of one entity across the
//!   document's commit log, streamed as they are found
//! - Restore: merging a past value back into the live document without
//!   touching its siblings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yamltrail_core::{Config, EntityHistory, EntityIdentity, EntityKind, Identifier};
//! use yamltrail_snapshot::{GitSnapshotStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = GitSnapshotStore::open("/config", StoreConfig::default())?;
//! let history = EntityHistory::new(Arc::new(store), "/config", Config::default());
//!
//! let identity = EntityIdentity::new(
//!     "automations.yaml",
//!     EntityKind::Automation,
//!     Identifier::parse("1700000000000"),
//! );
//! let versions = history.reconstruct_history(&identity).await?;
//! if let Some(oldest) = versions.last() {
//!     history.restore_entity(&identity, &oldest.commit.hash).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod history;
pub mod identity;
pub mod restore;
pub mod service;
pub mod value;

pub use config::Config;
pub use document::{ContainerShape, Document};
pub use error::{ConfigError, HistoryError, HistoryResult, ParseError};
pub use extract::{extract, locate, EntityEntry, Located, Slot};
pub use history::{
    HistoryScan, HistoryWalker, LogicalVersion, Observation, RunTracker, ScanEvent, ScanSummary,
    VersionOrigin,
};
pub use identity::{EntityIdentity, EntityKind, Identifier};
pub use restore::{MergeAction, RestoreOutcome};
pub use service::EntityHistory;
pub use value::EntityValue;
