//! Parsed documents and their entity container shapes.

use crate::error::ParseError;
use crate::extract::{self, EntityEntry, Slot};
use crate::identity::EntityKind;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Where the entities of one kind live inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ContainerShape {
    /// `key:` holding a list of entities.
    WrappedArray { key: String },
    /// `key:` holding a map of name to entity.
    WrappedMap { key: String },
    /// A bare top-level list.
    RootArray,
    /// A bare top-level map.
    RootMap,
}

impl ContainerShape {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::WrappedArray { .. } | Self::RootArray)
    }

    /// The wrapping key, for wrapped shapes.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::WrappedArray { key } | Self::WrappedMap { key } => Some(key),
            Self::RootArray | Self::RootMap => None,
        }
    }

    /// An empty container of this shape.
    fn empty_container(&self) -> Value {
        if self.is_array() {
            Value::Sequence(Vec::new())
        } else {
            Value::Mapping(Mapping::new())
        }
    }
}

impl fmt::Display for ContainerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrappedArray { key } => write!(f, "list under '{key}'"),
            Self::WrappedMap { key } => write!(f, "map under '{key}'"),
            Self::RootArray => f.write_str("root list"),
            Self::RootMap => f.write_str("root map"),
        }
    }
}

/// An immutable parsed document.
///
/// Changes are made by producing a new tree and serializing it, never by
/// patching the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Parse document text. Blank or comment-only text is an empty document.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if is_blank(text) {
            return Ok(Self { root: Value::Null });
        }
        let root: Value = serde_yaml::from_str(text)?;
        Ok(Self { root })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ParseError::new(format!("document is not valid UTF-8: {e}")))?;
        Self::parse(text)
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// A document holding nothing but an empty container of `shape`.
    pub fn empty(shape: &ContainerShape) -> Self {
        let root = match shape.key() {
            Some(key) => {
                let mut map = Mapping::new();
                map.insert(Value::String(key.to_string()), shape.empty_container());
                Value::Mapping(map)
            }
            None => shape.empty_container(),
        };
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_root(self) -> Value {
        self.root
    }

    /// Whether the document holds no content at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    /// Classify where entities of `kind` live.
    ///
    /// A top-level key for the kind wins; otherwise the root itself is the
    /// container. Scalar roots have no container.
    pub fn container(&self, kind: EntityKind) -> Option<ContainerShape> {
        self.container_value(kind).map(|(shape, _)| shape)
    }

    pub(crate) fn container_value(&self, kind: EntityKind) -> Option<(ContainerShape, &Value)> {
        if let Value::Mapping(map) = &self.root {
            for key in kind.container_keys() {
                let Some(value) = map.get(*key) else {
                    continue;
                };
                let key = key.to_string();
                let shape = match value {
                    Value::Sequence(_) | Value::Null => ContainerShape::WrappedArray { key },
                    Value::Mapping(_) => ContainerShape::WrappedMap { key },
                    _ => continue,
                };
                return Some((shape, value));
            }
        }

        match &self.root {
            Value::Sequence(_) => Some((ContainerShape::RootArray, &self.root)),
            Value::Mapping(_) => Some((ContainerShape::RootMap, &self.root)),
            _ => None,
        }
    }

    /// Mutable access to the container for `shape`, creating it when the
    /// wrapping key is missing or null.
    pub(crate) fn container_mut(&mut self, shape: &ContainerShape) -> Option<&mut Value> {
        match shape.key() {
            None => Some(&mut self.root),
            Some(key) => {
                if self.root.is_null() {
                    self.root = Value::Mapping(Mapping::new());
                }
                let map = self.root.as_mapping_mut()?;
                let entry = map
                    .entry(Value::String(key.to_string()))
                    .or_insert_with(|| shape.empty_container());
                if entry.is_null() {
                    *entry = shape.empty_container();
                }
                Some(entry)
            }
        }
    }

    /// Every entity of `kind`, with the identifier extraction would assign.
    pub fn entities(&self, kind: EntityKind) -> Vec<EntityEntry> {
        let Some((shape, container)) = self.container_value(kind) else {
            return Vec::new();
        };
        extract::members(container, &shape, kind)
            .into_iter()
            .filter_map(|(slot, value)| EntityEntry::from_member(slot, value))
            .collect()
    }

    /// Serialize in block style with two-space indentation and no aliases.
    pub fn to_yaml(&self) -> Result<String, ParseError> {
        if self.root.is_null() {
            return Ok(String::new());
        }
        Ok(serde_yaml::to_string(&self.root)?)
    }

    pub(crate) fn slot_value(&self, shape: &ContainerShape, slot: &Slot) -> Option<&Value> {
        let container = match shape.key() {
            Some(key) => self.root.as_mapping()?.get(key)?,
            None => &self.root,
        };
        match slot {
            Slot::Index(i) => container.as_sequence()?.get(*i),
            Slot::Key(k) => container.as_mapping()?.get(k),
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}
