//! Front-matter property types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status values accepted in the `status` property.
pub const STATUS_VALUES: [&str; 4] = ["draft", "in-progress", "review", "complete"];

/// Parsed front matter of a note.
///
/// Keys map to arbitrary JSON values. A `Value::Null` entry stands for an
/// undefined value and is dropped on serialization and ignored on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets a property value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether the property is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of entries, including undefined ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the string entries of `tags`.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        match self.0.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the `modified` timestamp, if present.
    #[must_use]
    pub fn modified(&self) -> Option<&str> {
        self.0.get("modified").and_then(Value::as_str)
    }

    /// Borrows the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes into the underlying map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns a copy with undefined entries removed.
    #[must_use]
    pub fn defined(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for Properties {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Properties {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::Error::InvalidInput(format!(
                "properties must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

/// Outcome of a property operation.
///
/// Property operations report failure in the result instead of returning an
/// error, so a batch caller is never aborted by one bad note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Resulting properties on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    /// Every problem found on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl PropertyResult {
    /// Successful result carrying properties.
    #[must_use]
    pub fn ok(message: impl Into<String>, properties: Properties) -> Self {
        Self {
            success: true,
            message: message.into(),
            properties: Some(properties),
            errors: None,
        }
    }

    /// Failed result carrying every error found.
    #[must_use]
    pub fn failed(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            properties: None,
            errors: Some(errors),
        }
    }
}

/// Returns the JSON type name used in validation messages.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
