use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;

/// Version assumed when a module does not declare one.
pub const DEFAULT_VERSION: &str = "0.0.1";

/// Identifier of a module as produced by the module source (usually its
/// path relative to the modules root, e.g. `modules/wallet`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a module identifier. Trailing slashes are dropped so that
    /// `wallet/` and `wallet` name the same module.
    pub fn new(id: &str) -> Self {
        Self(id.trim_end_matches('/').to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component (`modules/wallet` -> `wallet`).
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for ModuleId {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModuleId {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// Declared metadata of a module, normalized.
///
/// Every field is always populated: absent or ill-typed values collapse to
/// the empty string / empty list, and `version` to [`DEFAULT_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Module kind (free-form, e.g. `plugin`).
    #[serde(rename = "type")]
    pub type_: String,
    /// Canonical name; determines the package filename.
    pub name: String,
    /// Short human-readable summary.
    pub description: String,
    /// Names of modules this one depends on.
    pub dependencies: Vec<String>,
    /// Catalogue category.
    pub category: String,
    /// Author or maintainer.
    pub author: String,
    /// Release version.
    pub version: String,
    /// Basename of the entry-point library, without platform extension.
    pub main: String,
}

impl Default for ModuleMetadata {
    fn default() -> Self {
        Self {
            type_: String::new(),
            name: String::new(),
            description: String::new(),
            dependencies: Vec::new(),
            category: String::new(),
            author: String::new(),
            version: DEFAULT_VERSION.to_string(),
            main: String::new(),
        }
    }
}

impl ModuleMetadata {
    /// Normalize an arbitrary JSON document into metadata.
    ///
    /// Non-object input yields the all-defaults record. Fields of the wrong
    /// type are treated as missing; non-string items in `dependencies` are
    /// dropped.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let dependencies = obj
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let version = match text("version") {
            v if v.is_empty() => DEFAULT_VERSION.to_string(),
            v => v,
        };

        Self {
            type_: text("type"),
            name: text("name"),
            description: text("description"),
            dependencies,
            category: text("category"),
            author: text("author"),
            version,
            main: text("main"),
        }
    }
}
