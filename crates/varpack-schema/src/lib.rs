//! Shared types for varpack: the fixed variant set, module metadata, the
//! package manifest, and index entries.

pub mod index;
pub mod manifest;
/// Module identifiers and declared metadata.
pub mod module;
/// Target platform variants.
pub mod variant;

// Re-exports
pub use index::IndexEntry;
pub use manifest::{Manifest, ManifestError, is_truthy};
pub use module::{DEFAULT_VERSION, ModuleId, ModuleMetadata};
pub use variant::{Os, Variant};

/// Fixed path of the manifest inside every package archive.
pub const MANIFEST_PATH: &str = "manifest.json";

/// Name of the per-module metadata file at the module root.
pub const METADATA_FILE: &str = "metadata.json";

/// Default file name of the package index.
pub const INDEX_FILE: &str = "list.json";
