//! Command handlers for the yamltrail CLI.

pub mod config;
pub mod history;
pub mod list;
pub mod logging;
pub mod restore;

pub use config::*;
pub use history::*;
pub use list::*;
pub use logging::*;
pub use restore::*;

use anyhow::Context as _;
use std::path::PathBuf;
use std::sync::Arc;
use yamltrail_core::{Config, EntityHistory, EntityIdentity, EntityKind, Identifier};
use yamltrail_snapshot::GitSnapshotStore;

/// State shared by every command.
pub struct Context {
    /// Repository working directory.
    pub root: PathBuf,
    pub config: Config,
    /// Config files that were merged into `config`.
    pub sources: Vec<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn open_store(&self) -> anyhow::Result<GitSnapshotStore> {
        GitSnapshotStore::open(&self.root, self.config.store_config())
            .with_context(|| format!("opening repository at {}", self.root.display()))
    }

    /// The history service and the store behind it.
    pub fn service(&self) -> anyhow::Result<(EntityHistory, GitSnapshotStore)> {
        let store = self.open_store()?;
        let service = EntityHistory::new(
            Arc::new(store.clone()),
            self.root.clone(),
            self.config.clone(),
        );
        Ok((service, store))
    }
}

/// Build an identity from command-line arguments.
pub fn identity(file: PathBuf, kind: EntityKind, id: &str, keyed: bool) -> EntityIdentity {
    let identifier = if keyed {
        Identifier::Keyed(id.to_string())
    } else {
        Identifier::parse(id)
    };
    EntityIdentity::new(file, kind, identifier)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
