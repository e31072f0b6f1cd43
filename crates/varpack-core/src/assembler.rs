//! Multi-variant package assembly.
//!
//! Assembly of one module:
//!
//! 1. Pick the package name from canonical metadata.
//! 2. Create a fresh package (any stale file of that name is removed first).
//! 3. Patch its manifest with the truthy canonical fields.
//! 4. Add every variant in collector order with a resolved entry point.
//!
//! Two modes share this flow. [`AssemblyMode::Fresh`] packages library
//! directories straight from a build and treats a missing entry point as
//! fatal. [`AssemblyMode::Merge`] re-packages single-variant packages, which
//! were already verified once, and skips a variant whose entry point is
//! missing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use varpack_schema::{Manifest, ModuleId, ModuleMetadata, Variant};

use crate::archive;
use crate::collector::{Artifact, VariantArtifact};
use crate::error::AssembleError;
use crate::metadata::read_module_metadata;
use crate::packager::Packager;
use crate::paths::package_file_name;
use crate::reporter::Reporter;

/// Library extensions stripped from a declared `main` before the target
/// platform's extension is appended.
const KNOWN_LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib"];

/// Which pipeline produced the variant artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// Library directories from a fresh build; strict.
    Fresh,
    /// Existing single-variant packages; lenient per variant.
    Merge,
}

/// Outcome of assembling one module.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPackage {
    /// Module the package was built for.
    pub module: ModuleId,
    /// Package file on disk.
    pub path: PathBuf,
    /// Package file name, as recorded in the index.
    pub file_name: String,
    /// Manifest written into the package.
    pub manifest: Manifest,
    /// Variants added, in collector order.
    pub variants: Vec<Variant>,
    /// Variants left out because their entry point was missing.
    pub skipped: Vec<Variant>,
}

/// Builds one multi-variant package per module through a [`Packager`].
pub struct Assembler<'a> {
    packager: &'a dyn Packager,
    output_dir: &'a Path,
    extension: &'a str,
    mode: AssemblyMode,
    reporter: &'a dyn Reporter,
    staging_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Assembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("output_dir", &self.output_dir)
            .field("extension", &self.extension)
            .field("mode", &self.mode)
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> Assembler<'a> {
    /// Create an assembler writing `<name>.<extension>` into `output_dir`.
    pub fn new(
        packager: &'a dyn Packager,
        output_dir: &'a Path,
        extension: &'a str,
        mode: AssemblyMode,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            packager,
            output_dir,
            extension,
            mode,
            reporter,
            staging_dir: None,
        }
    }

    /// Extract single-variant packages under `dir` instead of the system
    /// temporary directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Assembly mode in effect.
    pub fn mode(&self) -> AssemblyMode {
        self.mode
    }

    /// Canonical metadata for a module.
    ///
    /// Fresh mode reads `metadata.json` from `module_dir`. Merge mode derives
    /// it from the first variant's embedded manifest.
    pub fn canonical_metadata(
        &self,
        module_dir: &Path,
        variants: &[VariantArtifact],
    ) -> ModuleMetadata {
        match self.mode {
            AssemblyMode::Fresh => read_module_metadata(module_dir),
            AssemblyMode::Merge => variants
                .first()
                .and_then(VariantArtifact::manifest)
                .map(Manifest::to_metadata)
                .unwrap_or_default(),
        }
    }

    /// Assemble `module` from `variants` (already in collector order).
    ///
    /// Returns `None` when every variant was skipped. The empty package is
    /// removed in that case, so nothing is published for the module.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] if no package name can be chosen, the
    /// packager fails, the package cannot be patched, or (fresh mode) a
    /// variant's entry point is missing.
    pub fn assemble(
        &self,
        module: &ModuleId,
        canonical: &ModuleMetadata,
        variants: &[VariantArtifact],
    ) -> Result<Option<AssembledPackage>, AssembleError> {
        let name = self.package_name(module, canonical, variants)?;
        let file_name = package_file_name(&name, self.extension);

        fs::create_dir_all(self.output_dir)?;
        let stale = self.output_dir.join(&file_name);
        if stale.exists() {
            fs::remove_file(&stale)?;
        }

        let package = self.packager.create(&name, self.output_dir)?;

        let mut manifest = archive::read_manifest(&package)?;
        manifest.apply_metadata(canonical);
        archive::write_manifest(&package, &manifest)?;

        let mut added = Vec::new();
        let mut skipped = Vec::new();
        for artifact in variants {
            match self.add_variant(module, &package, canonical, artifact)? {
                VariantOutcome::Added(entry) => {
                    self.reporter.variant_added(module, artifact.variant, &entry);
                    added.push(artifact.variant);
                }
                VariantOutcome::MissingEntry(entry) => {
                    let variant = artifact.variant;
                    let reason = format!("entry point {} not found", entry.display());
                    warn!(module = %module, variant = %variant, "{reason}, skipping variant");
                    self.reporter.variant_skipped(module, variant, &reason);
                    skipped.push(variant);
                }
            }
        }

        if added.is_empty() {
            fs::remove_file(&package)?;
            warn!(module = %module, package = %file_name, "no variant added, package removed");
            return Ok(None);
        }

        info!(
            module = %module,
            package = %file_name,
            variants = added.len(),
            "package assembled"
        );
        Ok(Some(AssembledPackage {
            module: module.clone(),
            path: package,
            file_name,
            manifest,
            variants: added,
            skipped,
        }))
    }

    fn package_name(
        &self,
        module: &ModuleId,
        canonical: &ModuleMetadata,
        variants: &[VariantArtifact],
    ) -> Result<String, AssembleError> {
        if !canonical.name.is_empty() {
            return Ok(canonical.name.clone());
        }

        if self.mode == AssemblyMode::Merge {
            let fallback = variants
                .first()
                .and_then(|a| a.path().file_stem())
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty());
            if let Some(stem) = fallback {
                self.reporter.warning(&format!(
                    "{module}: manifest has no name, using source file name '{stem}'"
                ));
                return Ok(stem.to_string());
            }
        }

        Err(AssembleError::MissingName(module.clone()))
    }

    fn add_variant(
        &self,
        module: &ModuleId,
        package: &Path,
        canonical: &ModuleMetadata,
        artifact: &VariantArtifact,
    ) -> Result<VariantOutcome, AssembleError> {
        let variant = artifact.variant;

        // The extraction directory is dropped, and removed, on every return path.
        let (files, _staging) = match &artifact.artifact {
            Artifact::Library { dir } => (dir.clone(), None),
            Artifact::Package { path, .. } => {
                let prefix = format!("varpack-{variant}-");
                let mut builder = tempfile::Builder::new();
                builder.prefix(&prefix);
                let tmp = match &self.staging_dir {
                    Some(root) => {
                        fs::create_dir_all(root)?;
                        builder.tempdir_in(root)?
                    }
                    None => builder.tempdir()?,
                };
                archive::extract_variant(path, variant, tmp.path())?;
                (tmp.path().to_path_buf(), Some(tmp))
            }
        };

        let candidate = entry_point_candidate(&canonical.main, variant, &files)?;
        let entry = match candidate {
            Some(entry) if files.join(&entry).is_file() => entry,
            missing => {
                let entry = missing.unwrap_or_default();
                return match self.mode {
                    AssemblyMode::Merge => Ok(VariantOutcome::MissingEntry(entry)),
                    AssemblyMode::Fresh => Err(AssembleError::MissingEntryPoint {
                        module: module.clone(),
                        variant,
                        entry,
                    }),
                };
            }
        };

        self.packager.add(package, variant, &files, &entry)?;
        Ok(VariantOutcome::Added(entry))
    }
}

enum VariantOutcome {
    Added(PathBuf),
    MissingEntry(PathBuf),
}

/// Entry point for `variant`, relative to its file set.
///
/// A declared `main` basename gets the platform library extension appended
/// (replacing a `.so`/`.dylib` suffix it may already carry). Without one, the
/// first file of the sorted top-level listing of `files` is used. The result
/// is not checked for existence.
///
/// # Errors
///
/// Returns an error if `files` cannot be listed.
pub fn entry_point_candidate(
    main: &str,
    variant: Variant,
    files: &Path,
) -> io::Result<Option<PathBuf>> {
    if !main.is_empty() {
        let base = match main.rsplit_once('.') {
            Some((stem, ext)) if KNOWN_LIBRARY_EXTENSIONS.contains(&ext) => stem,
            _ => main,
        };
        return Ok(Some(PathBuf::from(format!(
            "{base}.{}",
            variant.library_extension()
        ))));
    }

    if !files.is_dir() {
        return Ok(None);
    }
    let mut names: Vec<_> = fs::read_dir(files)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| e.file_name())
        .collect();
    names.sort();
    Ok(names.into_iter().next().map(PathBuf::from))
}
