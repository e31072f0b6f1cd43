//! Domain errors for module enumeration and package assembly.

use std::path::PathBuf;

use thiserror::Error;
use varpack_schema::{ModuleId, Variant};

use crate::archive::ArchiveError;
use crate::packager::PackagerError;

/// Conditions that abort a run before any module is processed.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The module enumeration source (e.g. `.gitmodules`) does not exist.
    #[error("module source not found: {0}")]
    MissingSource(PathBuf),

    /// The module enumeration source exists but lists nothing.
    #[error("no modules declared in {0}")]
    NoModules(String),

    /// `--filter` did not match any enumerated module.
    #[error("filter '{0}' matched no module")]
    FilterMatchedNothing(String),

    /// The packager binary could not be located.
    #[error("packager '{program}' not found: {source}")]
    PackagerNotFound {
        /// Program name or path as configured.
        program: String,
        /// Lookup failure.
        source: which::Error,
    },

    /// The host platform is not one of the supported variants.
    #[error("host platform is not a supported variant; pass --variant explicitly")]
    UnsupportedHost,

    /// The configured variant list is empty.
    #[error("no variants configured")]
    NoVariants,
}

/// Per-variant manifests of one module disagree outside platform-specific keys.
///
/// Both projections are rendered with sorted keys so the diff is stable.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "manifest mismatch in {module}: {} differs from {} in [{}]\n--- {}\n{reference_projection}\n+++ {}\n{conflicting_projection}",
    .conflicting.display(),
    .reference.display(),
    .differing_keys.join(", "),
    .reference.display(),
    .conflicting.display()
)]
pub struct ManifestMismatchError {
    /// Module whose variants disagree.
    pub module: ModuleId,
    /// Artifact whose manifest served as the reference (first variant).
    pub reference: PathBuf,
    /// Artifact whose manifest disagreed with the reference.
    pub conflicting: PathBuf,
    /// Keys whose values differ (present on one side only counts).
    pub differing_keys: Vec<String>,
    /// Reference manifest without platform keys, pretty JSON.
    pub reference_projection: String,
    /// Conflicting manifest without platform keys, pretty JSON.
    pub conflicting_projection: String,
}

/// Failures while assembling one module's package. All are fatal for the run.
#[derive(Error, Debug)]
pub enum AssembleError {
    /// Canonical metadata has no `name`, so no package filename can be chosen.
    #[error("module {0} has no canonical name")]
    MissingName(ModuleId),

    /// The resolved entry point is absent from a variant's file set.
    #[error("module {module}: entry point '{}' not found for variant {variant}", .entry.display())]
    MissingEntryPoint {
        /// Module being assembled.
        module: ModuleId,
        /// Variant whose file set lacks the entry.
        variant: Variant,
        /// Entry path relative to the variant's file set.
        entry: PathBuf,
    },

    /// Variant manifests disagree.
    #[error(transparent)]
    Mismatch(#[from] ManifestMismatchError),

    /// The external packager failed.
    #[error(transparent)]
    Packager(#[from] PackagerError),

    /// Reading or rewriting a package archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
