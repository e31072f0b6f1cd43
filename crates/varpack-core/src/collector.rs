//! Discovery of a module's per-variant artifacts.

use std::path::{Path, PathBuf};

use tracing::debug;
use varpack_schema::{Manifest, ModuleId, Variant};

use crate::archive::{self, ArchiveError};
use crate::paths::{library_artifact_dir, package_file_name, variant_dir};

/// What a build pipeline left behind for one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// A single-variant package, with its embedded manifest.
    Package {
        /// Package file.
        path: PathBuf,
        /// Manifest read from the package.
        manifest: Manifest,
    },
    /// A directory of built library files.
    Library {
        /// Library output directory.
        dir: PathBuf,
    },
}

/// The single artifact found for one variant of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantArtifact {
    /// Variant the artifact was built for.
    pub variant: Variant,
    /// The artifact itself.
    pub artifact: Artifact,
}

impl VariantArtifact {
    /// Path of the package file or library directory.
    pub fn path(&self) -> &Path {
        match &self.artifact {
            Artifact::Package { path, .. } => path,
            Artifact::Library { dir } => dir,
        }
    }

    /// Embedded manifest, for package artifacts.
    pub fn manifest(&self) -> Option<&Manifest> {
        match &self.artifact {
            Artifact::Package { manifest, .. } => Some(manifest),
            Artifact::Library { .. } => None,
        }
    }
}

/// Locates per-variant artifacts under the artifact tree.
///
/// Results always follow the configured variant order, never discovery order.
/// An empty result means the module has nothing to package and is skipped.
#[derive(Debug, Clone, Copy)]
pub struct VariantCollector<'a> {
    artifacts_dir: &'a Path,
    variants: &'a [Variant],
    extension: &'a str,
}

impl<'a> VariantCollector<'a> {
    /// Collect from `artifacts_dir`, considering `variants` in order.
    pub fn new(artifacts_dir: &'a Path, variants: &'a [Variant], extension: &'a str) -> Self {
        Self {
            artifacts_dir,
            variants,
            extension,
        }
    }

    /// Fresh build output: `<artifacts>/<variant>/<module>/` directories.
    pub fn collect_libraries(&self, module: &ModuleId) -> Vec<VariantArtifact> {
        self.variants
            .iter()
            .filter_map(|&variant| {
                let dir = library_artifact_dir(self.artifacts_dir, variant, module);
                dir.is_dir().then(|| VariantArtifact {
                    variant,
                    artifact: Artifact::Library { dir },
                })
            })
            .inspect(|a| debug!(module = %module, variant = %a.variant, "library output found"))
            .collect()
    }

    /// Single-variant packages: the first `<leaf>.<ext>` file found under
    /// `<artifacts>/<variant>/` (sorted walk), with its manifest loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if a located package cannot be read.
    pub fn collect_packages(
        &self,
        module: &ModuleId,
    ) -> Result<Vec<VariantArtifact>, ArchiveError> {
        let file_name = package_file_name(module.leaf(), self.extension);
        let mut found = Vec::new();

        for &variant in self.variants {
            let root = variant_dir(self.artifacts_dir, variant);
            let Some(path) = find_first(&root, &file_name) else {
                continue;
            };
            debug!(
                module = %module,
                variant = %variant,
                package = %path.display(),
                "package found"
            );
            let manifest = archive::read_manifest(&path)?;
            found.push(VariantArtifact {
                variant,
                artifact: Artifact::Package { path, manifest },
            });
        }
        Ok(found)
    }
}

fn find_first(root: &Path, file_name: &str) -> Option<PathBuf> {
    if !root.is_dir() {
        return None;
    }
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name() == file_name)
        .map(walkdir::DirEntry::into_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_package;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_libraries_follow_enumeration_order() {
        let tmp = tempdir().unwrap();
        let module = ModuleId::new("modules/wallet");
        for variant in [Variant::DarwinAmd64, Variant::LinuxAmd64] {
            std::fs::create_dir_all(library_artifact_dir(tmp.path(), variant, &module)).unwrap();
        }

        let collector = VariantCollector::new(tmp.path(), &Variant::ALL, "vpk");
        let found: Vec<Variant> = collector
            .collect_libraries(&module)
            .iter()
            .map(|a| a.variant)
            .collect();
        assert_eq!(found, vec![Variant::LinuxAmd64, Variant::DarwinAmd64]);
    }

    #[test]
    fn test_no_artifacts_is_empty_not_error() {
        let tmp = tempdir().unwrap();
        let collector = VariantCollector::new(tmp.path(), &Variant::ALL, "vpk");
        let module = ModuleId::new("ghost");
        assert!(collector.collect_libraries(&module).is_empty());
        assert!(collector.collect_packages(&module).unwrap().is_empty());
    }

    #[test]
    fn test_packages_first_found_wins() {
        let tmp = tempdir().unwrap();
        let linux = variant_dir(tmp.path(), Variant::LinuxAmd64);
        std::fs::create_dir_all(linux.join("a-run")).unwrap();
        std::fs::create_dir_all(linux.join("b-run")).unwrap();
        write_package(
            &linux.join("a-run/wallet.vpk"),
            &json!({"name": "wallet", "version": "1.0.0"}),
            &[(Variant::LinuxAmd64, "libwallet.so", "new")],
        );
        write_package(
            &linux.join("b-run/wallet.vpk"),
            &json!({"name": "wallet", "version": "0.9.0"}),
            &[(Variant::LinuxAmd64, "libwallet.so", "old")],
        );

        let collector = VariantCollector::new(tmp.path(), &Variant::ALL, "vpk");
        let found = collector
            .collect_packages(&ModuleId::new("modules/wallet"))
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path(), linux.join("a-run/wallet.vpk"));
        assert_eq!(
            found[0].manifest().unwrap().get_str("version"),
            Some("1.0.0")
        );
    }

    #[test]
    fn test_respects_configured_variant_subset() {
        let tmp = tempdir().unwrap();
        let module = ModuleId::new("wallet");
        for variant in Variant::ALL {
            std::fs::create_dir_all(library_artifact_dir(tmp.path(), variant, &module)).unwrap();
        }
        let only = [Variant::DarwinArm64];
        let collector = VariantCollector::new(tmp.path(), &only, "vpk");
        assert_eq!(collector.collect_libraries(&module).len(), 1);
    }
}
