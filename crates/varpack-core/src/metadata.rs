//! Module metadata loading.

use std::path::Path;

use tracing::warn;
use varpack_schema::{METADATA_FILE, ModuleMetadata};

/// Read and normalize the metadata file at `path`.
///
/// Never fails: a missing, unreadable, or malformed file yields
/// [`ModuleMetadata::default`]. Whether an empty `name` is acceptable is the
/// caller's decision.
pub fn read_metadata(path: &Path) -> ModuleMetadata {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "metadata unreadable, using defaults");
            return ModuleMetadata::default();
        }
    };

    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => ModuleMetadata::from_value(&value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "metadata is not valid JSON, using defaults");
            ModuleMetadata::default()
        }
    }
}

/// Read `metadata.json` at the root of a module directory.
pub fn read_module_metadata(module_dir: &Path) -> ModuleMetadata {
    read_metadata(&module_dir.join(METADATA_FILE))
}
