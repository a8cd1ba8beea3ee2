//! Builders for test entities and documents.

use serde_yaml::{Mapping, Value};

/// An automation with a stable id, an alias and empty trigger/action lists.
pub fn automation(id: &str, alias: &str) -> Value {
    let mut map = Mapping::new();
    map.insert("id".into(), id.into());
    map.insert("alias".into(), alias.into());
    map.insert("triggers".into(), Value::Sequence(Vec::new()));
    map.insert("actions".into(), Value::Sequence(Vec::new()));
    Value::Mapping(map)
}

/// A script with an alias and an empty sequence.
pub fn script(alias: &str) -> Value {
    let mut map = Mapping::new();
    map.insert("alias".into(), alias.into());
    map.insert("sequence".into(), Value::Sequence(Vec::new()));
    Value::Mapping(map)
}

/// Set `field` on an entity, keeping its position if it already exists.
pub fn with_field(mut entity: Value, field: &str, value: impl Into<Value>) -> Value {
    if let Value::Mapping(map) = &mut entity {
        map.insert(field.into(), value.into());
    }
    entity
}

#[derive(Debug, Clone)]
enum Layout {
    List(Option<String>),
    Map(Option<String>),
}

/// Builds a document in one of the four container shapes.
///
/// # Example
///
/// ```rust
/// use yamltrail_test_utils::builders::{automation, DocumentBuilder};
///
/// let text = DocumentBuilder::wrapped_list("automation")
///     .entity(automation("1", "Lights"))
///     .build();
/// assert!(text.starts_with("automation:\n- id: '1'"));
/// ```
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    layout: Layout,
    entries: Vec<(String, Value)>,
    extra: Mapping,
}

impl DocumentBuilder {
    pub fn root_list() -> Self {
        Self::new(Layout::List(None))
    }

    pub fn root_map() -> Self {
        Self::new(Layout::Map(None))
    }

    pub fn wrapped_list(key: &str) -> Self {
        Self::new(Layout::List(Some(key.to_string())))
    }

    pub fn wrapped_map(key: &str) -> Self {
        Self::new(Layout::Map(Some(key.to_string())))
    }

    fn new(layout: Layout) -> Self {
        Self {
            layout,
            entries: Vec::new(),
            extra: Mapping::new(),
        }
    }

    /// Add an entity; list layouts ignore the key, map layouts number it.
    pub fn entity(self, value: Value) -> Self {
        let key = format!("entity_{}", self.entries.len());
        self.keyed(&key, value)
    }

    /// Add an entity under `key` (map layouts only use the key).
    pub fn keyed(mut self, key: &str, value: Value) -> Self {
        self.entries.push((key.to_string(), value));
        self
    }

    /// Add an unrelated top-level entry next to a wrapped container.
    pub fn top_level(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn to_value(&self) -> Value {
        let (container, key) = match &self.layout {
            Layout::List(key) => (
                Value::Sequence(self.entries.iter().map(|(_, v)| v.clone()).collect()),
                key,
            ),
            Layout::Map(key) => (
                Value::Mapping(
                    self.entries
                        .iter()
                        .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                        .collect(),
                ),
                key,
            ),
        };

        match key {
            Some(key) => {
                let mut root = self.extra.clone();
                root.insert(key.as_str().into(), container);
                Value::Mapping(root)
            }
            None => container,
        }
    }

    /// Serialize the document as YAML text.
    pub fn build(&self) -> String {
        serde_yaml::to_string(&self.to_value()).expect("Failed to serialize document")
    }
}
