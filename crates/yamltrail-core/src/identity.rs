//! Entity kinds and identities.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Field holding an entity's stable id.
pub const STABLE_ID_FIELD: &str = "id";

/// The kind of entity stored in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Automation,
    Script,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automation => "automation",
            Self::Script => "script",
        }
    }

    /// Top-level keys under which a document may wrap entities of this kind.
    pub fn container_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Automation => &["automation", "automations"],
            Self::Script => &["script", "scripts"],
        }
    }

    /// Whether `value` carries the fields that identify this kind.
    ///
    /// Only consulted for root-level maps, where two kinds may share a document.
    pub fn belongs(&self, value: &Value) -> bool {
        let Some(map) = value.as_mapping() else {
            return false;
        };
        let has_trigger = map.contains_key("trigger") || map.contains_key("triggers");
        match self {
            Self::Automation => has_trigger,
            Self::Script => map.contains_key("sequence") && !has_trigger,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "automation" | "automations" => Ok(Self::Automation),
            "script" | "scripts" => Ok(Self::Script),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// How an entity is addressed inside its document.
///
/// A stable id is carried by the entity itself. Positional and keyed
/// identifiers are structural and drift when siblings are reordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Identifier {
    Stable(String),
    Positional(usize),
    Keyed(String),
}

impl Identifier {
    /// Parse user input: a canonical non-negative integer is a position,
    /// anything else (including `007`) a stable id compared verbatim.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = text.parse::<usize>() {
                if index.to_string() == text {
                    return Self::Positional(index);
                }
            }
        }
        Self::Stable(text.to_string())
    }

    /// The identifier as compared against stable ids and map keys.
    pub fn text(&self) -> String {
        match self {
            Self::Stable(id) | Self::Keyed(id) => id.clone(),
            Self::Positional(index) => index.to_string(),
        }
    }

    /// Array index this identifier may fall back to.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Positional(index) => Some(*index),
            Self::Stable(text) | Self::Keyed(text) => text.parse().ok(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable(id) => write!(f, "{id}"),
            Self::Positional(index) => write!(f, "#{index}"),
            Self::Keyed(key) => write!(f, "[{key}]"),
        }
    }
}

/// The key used to correlate one entity across snapshots of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub document_path: PathBuf,
    pub kind: EntityKind,
    pub identifier: Identifier,
}

impl EntityIdentity {
    pub fn new(document_path: impl Into<PathBuf>, kind: EntityKind, identifier: Identifier) -> Self {
        Self {
            document_path: document_path.into(),
            kind,
            identifier,
        }
    }

    pub fn path(&self) -> &Path {
        &self.document_path
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {}",
            self.kind,
            self.identifier,
            self.document_path.display()
        )
    }
}

/// Render a scalar stable id (string, number or bool) as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The stable id carried by an entity value, if any.
pub fn stable_id_of(value: &Value) -> Option<String> {
    value
        .as_mapping()?
        .get(STABLE_ID_FIELD)
        .and_then(scalar_text)
        .filter(|id| !id.is_empty())
}
