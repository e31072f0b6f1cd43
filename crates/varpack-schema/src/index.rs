//! Rows of the published package index (`list.json`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manifest::{Manifest, is_truthy};
use crate::module::ModuleId;
use crate::variant::Variant;

/// One module's row in the package index.
///
/// Manifest-derived fields are sparse: a field the manifest does not carry
/// (or carries as an empty value) is omitted from the serialized entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Module identifier; the index is keyed and sorted by this.
    pub name: ModuleId,
    /// File name of the assembled package.
    pub package: String,
    /// Copied from manifest `type`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<Value>,
    /// Copied from manifest `name`.
    #[serde(rename = "moduleName", default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<Value>,
    /// Copied from manifest `description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    /// Copied from manifest `dependencies`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Value>,
    /// Copied from manifest `category`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Value>,
    /// Copied from manifest `author`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Value>,
    /// Copied from manifest `version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    /// Variants packaged for this module, in canonical order.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl IndexEntry {
    /// Build an entry from an assembled package's canonical manifest.
    pub fn from_manifest(
        module: &ModuleId,
        manifest: &Manifest,
        package: impl Into<String>,
        variants: &[Variant],
    ) -> Self {
        let field = |key: &str| manifest.get(key).filter(|v| is_truthy(v)).cloned();

        let mut variants = variants.to_vec();
        variants.sort();
        variants.dedup();

        Self {
            name: module.clone(),
            package: package.into(),
            type_: field("type"),
            module_name: field("name"),
            description: field("description"),
            dependencies: field("dependencies"),
            category: field("category"),
            author: field("author"),
            version: field("version"),
            variants,
        }
    }
}
