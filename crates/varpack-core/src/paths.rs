//! Artifact tree layout.
//!
//! ```text
//! <artifacts>/
//! ├── linux-amd64/
//! │   ├── modules/wallet/      # fresh build output (library directory)
//! │   └── wallet.vpk           # single-variant package
//! └── darwin-arm64/
//!     └── ...
//! ```

use std::path::{Path, PathBuf};

use varpack_schema::{ModuleId, Variant};

/// Directory holding every artifact built for `variant`.
pub fn variant_dir(artifacts_dir: &Path, variant: Variant) -> PathBuf {
    artifacts_dir.join(variant.as_str())
}

/// Staged library output of `module` for `variant`.
pub fn library_artifact_dir(artifacts_dir: &Path, variant: Variant, module: &ModuleId) -> PathBuf {
    variant_dir(artifacts_dir, variant).join(module)
}

/// Package file name for a canonical module name.
pub fn package_file_name(name: &str, extension: &str) -> String {
    format!("{name}.{extension}")
}

/// Generate a build log path for a module and variant.
pub fn build_log_path(log_dir: &Path, module: &ModuleId, variant: Variant) -> PathBuf {
    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let stem = module.as_str().replace('/', "-");
    log_dir.join(format!("build-{stem}-{variant}-{timestamp}.log"))
}
