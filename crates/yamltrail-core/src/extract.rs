//! Resolving an identity to an entity value inside a document.

use crate::document::{ContainerShape, Document};
use crate::identity::{scalar_text, stable_id_of, EntityKind, Identifier};
use crate::value::EntityValue;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

/// Structural position of an entity within its container.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Index(usize),
    Key(Value),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Key(k) => match scalar_text(k) {
                Some(text) => f.write_str(&text),
                None => write!(f, "{k:?}"),
            },
        }
    }
}

/// An entity found in a document.
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub shape: ContainerShape,
    pub slot: Slot,
    pub value: &'a Value,
}

/// One entity as listed by [`Document::entities`].
#[derive(Debug, Clone, Serialize)]
pub struct EntityEntry {
    pub identifier: Identifier,
    #[serde(skip)]
    pub slot: Slot,
    pub value: EntityValue,
}

impl EntityEntry {
    pub(crate) fn from_member(slot: Slot, value: &Value) -> Option<Self> {
        let identifier = match (stable_id_of(value), &slot) {
            (Some(id), _) => Identifier::Stable(id),
            (None, Slot::Index(i)) => Identifier::Positional(*i),
            (None, Slot::Key(k)) => Identifier::Keyed(scalar_text(k)?),
        };
        Some(Self {
            identifier,
            slot,
            value: EntityValue::new(value.clone()),
        })
    }
}

/// Entries of a container that may hold entities of `kind`.
///
/// In a root map only entries carrying the kind's discriminating fields
/// qualify. Array members keep their real index.
pub(crate) fn members<'a>(
    container: &'a Value,
    shape: &ContainerShape,
    kind: EntityKind,
) -> Vec<(Slot, &'a Value)> {
    match container {
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (Slot::Index(i), v))
            .collect(),
        Value::Mapping(map) => map
            .iter()
            .filter(|(_, v)| *shape != ContainerShape::RootMap || kind.belongs(v))
            .map(|(k, v)| (Slot::Key(k.clone()), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Find the entity addressed by `identifier`.
///
/// Resolution order: an entry whose stable id equals the identifier text,
/// then the array index (only entries without a stable id of their own),
/// then the map key.
pub fn locate<'a>(
    document: &'a Document,
    kind: EntityKind,
    identifier: &Identifier,
) -> Option<Located<'a>> {
    let (shape, container) = document.container_value(kind)?;
    let members = members(container, &shape, kind);
    let text = identifier.text();

    let found = members
        .iter()
        .find(|(_, v)| stable_id_of(v).as_deref() == Some(text.as_str()))
        .or_else(|| {
            if shape.is_array() {
                let index = identifier.index()?;
                members
                    .get(index)
                    .filter(|(_, v)| stable_id_of(v).is_none())
            } else {
                members.iter().find(|(slot, _)| match slot {
                    Slot::Key(k) => scalar_text(k).as_deref() == Some(text.as_str()),
                    Slot::Index(_) => false,
                })
            }
        })?;

    let (slot, value) = found.clone();
    Some(Located { shape, slot, value })
}

/// The value of the entity addressed by `identifier`, or `None` if absent.
pub fn extract(document: &Document, kind: EntityKind, identifier: &Identifier) -> Option<EntityValue> {
    locate(document, kind, identifier).map(|located| EntityValue::new(located.value.clone()))
}
