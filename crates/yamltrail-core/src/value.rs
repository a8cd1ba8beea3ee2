//! Entity values and their normalized comparison.

use crate::identity::stable_id_of;
use serde::{Serialize, Serializer};
use serde_yaml::Value;

/// The value of one entity at one point in time.
///
/// Two values are equal when their normalized serializations are equal.
/// Normalization absorbs formatting differences in the source text
/// (quoting, flow vs block style, indentation, line wrapping) but keeps key
/// order, so reordered keys compare unequal.
#[derive(Debug, Clone)]
pub struct EntityValue {
    value: Value,
    normalized: String,
}

impl EntityValue {
    pub fn new(value: Value) -> Self {
        let normalized = normalize(&value);
        Self { value, normalized }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Canonical YAML text of the value.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn stable_id(&self) -> Option<String> {
        stable_id_of(&self.value)
    }

    /// The `alias` field, if the entity has one.
    pub fn alias(&self) -> Option<&str> {
        self.value
            .as_mapping()
            .and_then(|m| m.get("alias"))
            .and_then(Value::as_str)
    }
}

impl PartialEq for EntityValue {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for EntityValue {}

impl Serialize for EntityValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl From<Value> for EntityValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Serialize a value in block style without aliases.
///
/// Tagged values and NaN floats are rendered through their debug form if
/// the emitter refuses them, which keeps comparison total.
pub(crate) fn normalize(value: &Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
