//! The JSON manifest embedded in every package.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::module::ModuleMetadata;

/// Keys whose values legitimately differ between variants of one module.
pub const PLATFORM_KEYS: &[&str] = &["main"];

/// Keys copied from module metadata into a package manifest.
pub const PATCHED_KEYS: &[&str] = &[
    "name",
    "version",
    "description",
    "author",
    "type",
    "category",
    "dependencies",
];

/// Errors raised when a JSON document cannot be used as a manifest.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The document parsed, but its root is not a JSON object.
    #[error("manifest root must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The document is not valid JSON.
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A package manifest: a JSON object of string keys.
///
/// Unknown keys are preserved untouched through every operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse a manifest from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] if the bytes are not JSON and
    /// [`ManifestError::NotAnObject`] if the root is not an object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Self::try_from(serde_json::from_slice::<Value>(bytes)?)
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures (not expected for in-memory maps).
    pub fn to_pretty_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a string value; non-strings read as `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Projection used for cross-variant comparison: the manifest with every
    /// [`PLATFORM_KEYS`] entry removed.
    pub fn platform_neutral(&self) -> Value {
        let projected: Map<String, Value> = self
            .0
            .iter()
            .filter(|(k, _)| !PLATFORM_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(projected)
    }

    /// Overwrite [`PATCHED_KEYS`] from `meta`, but only where `meta` carries a
    /// truthy value. Empty canonical values leave the existing entry alone.
    pub fn apply_metadata(&mut self, meta: &ModuleMetadata) {
        let candidates = [
            ("name", Value::from(meta.name.as_str())),
            ("version", Value::from(meta.version.as_str())),
            ("description", Value::from(meta.description.as_str())),
            ("author", Value::from(meta.author.as_str())),
            ("type", Value::from(meta.type_.as_str())),
            ("category", Value::from(meta.category.as_str())),
            ("dependencies", Value::from(meta.dependencies.clone())),
        ];
        for (key, value) in candidates {
            if is_truthy(&value) {
                self.0.insert(key.to_string(), value);
            }
        }
    }

    /// Normalize this manifest into module metadata.
    pub fn to_metadata(&self) -> ModuleMetadata {
        ModuleMetadata::from_value(&Value::Object(self.0.clone()))
    }
}

impl TryFrom<Value> for Manifest {
    type Error = ManifestError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(ManifestError::NotAnObject("null")),
            Value::Bool(_) => Err(ManifestError::NotAnObject("a boolean")),
            Value::Number(_) => Err(ManifestError::NotAnObject("a number")),
            Value::String(_) => Err(ManifestError::NotAnObject("a string")),
            Value::Array(_) => Err(ManifestError::NotAnObject("an array")),
        }
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// JavaScript-style truthiness: `null`, `false`, `0`, `""`, `[]` and `{}`
/// are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_normal() || f.is_subnormal()),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
