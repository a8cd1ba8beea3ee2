//! Merging a historical entity value into the live document.

use crate::document::{ContainerShape, Document};
use crate::error::{HistoryError, HistoryResult};
use crate::identity::{scalar_text, stable_id_of, EntityIdentity, EntityKind};
use crate::value::EntityValue;
use serde::Serialize;
use serde_yaml::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// How the restored value entered the live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    /// An existing entry was overwritten in place.
    Replaced,
    /// A new key was added to a map container.
    Inserted,
    /// The entity was appended to an array container.
    Appended,
}

impl MergeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Inserted => "inserted",
            Self::Appended => "appended",
        }
    }
}

/// Result of a successful restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub identity: EntityIdentity,
    /// Commit the value was taken from.
    pub commit: String,
    /// Container shape of the written document.
    pub shape: ContainerShape,
    pub action: MergeAction,
    /// File that was written.
    pub path: PathBuf,
}

/// A live document with the restored value merged in.
#[derive(Debug)]
pub struct Merged {
    pub document: Document,
    pub shape: ContainerShape,
    pub action: MergeAction,
}

/// Merge `restored` into `live`, leaving every other entry untouched.
///
/// `live` is `None` when there is no usable live content, in which case the
/// document is rebuilt from an empty container of `target_shape`.
pub fn merge_entity(
    live: Option<Document>,
    identity: &EntityIdentity,
    restored: &EntityValue,
    target_shape: &ContainerShape,
) -> HistoryResult<Merged> {
    let mut document = live.unwrap_or_else(|| Document::empty(target_shape));
    let shape = merge_shape(&document, identity.kind, target_shape);

    let container = document.container_mut(&shape).ok_or_else(|| {
        HistoryError::DocumentUnreadable {
            path: identity.path().display().to_string(),
            reason: format!("no {} container", identity.kind),
        }
    })?;

    let action = match container {
        Value::Sequence(items) => merge_into_array(items, identity, restored),
        Value::Mapping(map) => {
            merge_into_map(map, identity, restored, shape == ContainerShape::RootMap)
        }
        _ => {
            return Err(HistoryError::DocumentUnreadable {
                path: identity.path().display().to_string(),
                reason: format!("{shape} is not a container"),
            })
        }
    };

    Ok(Merged {
        document,
        shape,
        action,
    })
}

/// The live document's shape, except that a root map holding no entities of
/// this kind takes the wrapped shape of the snapshot.
fn merge_shape(document: &Document, kind: EntityKind, target: &ContainerShape) -> ContainerShape {
    match document.container(kind) {
        Some(ContainerShape::RootMap)
            if target.key().is_some() && document.entities(kind).is_empty() =>
        {
            target.clone()
        }
        Some(shape) => shape,
        None => target.clone(),
    }
}

fn merge_into_array(
    items: &mut Vec<Value>,
    identity: &EntityIdentity,
    restored: &EntityValue,
) -> MergeAction {
    let position = find_by_id(items.iter(), restored.stable_id())
        .or_else(|| find_by_id(items.iter(), Some(identity.identifier.text())))
        .or_else(|| {
            identity
                .identifier
                .index()
                .filter(|&i| items.get(i).is_some_and(|v| stable_id_of(v).is_none()))
        });

    match position {
        Some(index) => {
            items[index] = restored.value().clone();
            MergeAction::Replaced
        }
        None => {
            items.push(restored.value().clone());
            MergeAction::Appended
        }
    }
}

/// `mixed` is set for root maps, where entities share the top level with
/// other kinds and settings.
fn merge_into_map(
    map: &mut serde_yaml::Mapping,
    identity: &EntityIdentity,
    restored: &EntityValue,
    mixed: bool,
) -> MergeAction {
    let restored_id = restored.stable_id();
    let kind = identity.kind;

    // An entry that already carries the restored id keeps its key.
    let existing = restored_id.as_deref().and_then(|id| {
        map.iter()
            .filter(|(_, v)| !mixed || kind.belongs(v))
            .find(|(_, v)| stable_id_of(v).as_deref() == Some(id))
            .map(|(k, _)| k.clone())
    });

    let (key, action) = match existing {
        Some(key) => (key, MergeAction::Replaced),
        None => {
            let text = restored_id.unwrap_or_else(|| identity.identifier.text());
            match map.keys().find(|k| scalar_text(k).as_deref() == Some(text.as_str())) {
                Some(key) => (key.clone(), MergeAction::Replaced),
                None => (Value::String(text), MergeAction::Inserted),
            }
        }
    };

    map.insert(key, restored.value().clone());
    action
}

fn find_by_id<'a>(items: impl Iterator<Item = &'a Value>, id: Option<String>) -> Option<usize> {
    let id = id?;
    items
        .enumerate()
        .find(|(_, v)| stable_id_of(v).as_deref() == Some(id.as_str()))
        .map(|(i, _)| i)
}

/// Read and classify the live document.
///
/// Missing, empty and comment-only files yield `None`. Content that cannot
/// be parsed, or whose root is not a container, is an error unless
/// `replace_unreadable` is set.
pub async fn read_live(
    path: &Path,
    kind: EntityKind,
    replace_unreadable: bool,
) -> HistoryResult<Option<Document>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Live document missing, starting empty");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let reason = match Document::from_bytes(&bytes) {
        Ok(document) if document.is_empty() => return Ok(None),
        Ok(document) if document.container(kind).is_some() => return Ok(Some(document)),
        Ok(_) => "document root is not a list or map".to_string(),
        Err(e) => e.to_string(),
    };

    if replace_unreadable {
        warn!(path = %path.display(), reason = %reason, "Replacing unreadable live document");
        return Ok(None);
    }
    Err(HistoryError::DocumentUnreadable {
        path: path.display().to_string(),
        reason,
    })
}

/// Replace the content of `path` atomically.
///
/// The content goes to a uniquely named sibling temp file that is synced and
/// then renamed over `path`. On failure the temp file is removed and `path`
/// keeps its previous content.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> HistoryResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| HistoryError::InvalidPath(path.display().to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let temp_path = dir.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result: io::Result<()> = async {
        fs::create_dir_all(&dir).await?;
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        if let Ok(metadata) = fs::metadata(path).await {
            fs::set_permissions(&temp_path, metadata.permissions()).await?;
        }
        fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(source) = result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(HistoryError::Write {
            path: path.display().to_string(),
            source,
        });
    }

    debug!(path = %path.display(), bytes = contents.len(), "Wrote document");
    Ok(())
}
