//! Core library for varpack.
//!
//! Enumerates modules, builds them, collects their per-variant artifacts,
//! reconciles manifests across variants, and assembles one multi-variant
//! package per module through an external packager. Results are recorded in
//! a sorted package index.

pub mod archive;
pub mod assembler;
pub mod builder;
pub mod collector;
pub mod config;
pub mod error;
pub mod index;
pub mod metadata;
pub mod packager;
pub mod paths;
pub mod pipeline;
pub mod reconcile;
pub mod reporter;
pub mod source;

#[cfg(test)]
mod testing;

pub use assembler::{AssembledPackage, Assembler, AssemblyMode};
pub use builder::{Builder, CommandBuilder, stage_output};
pub use collector::{Artifact, VariantArtifact, VariantCollector};
pub use config::{Config, ConfigError};
pub use error::{AssembleError, ManifestMismatchError, SetupError};
pub use index::IndexBuilder;
pub use packager::{CliPackager, Packager, PackagerError};
pub use pipeline::{ModuleOutcome, Pipeline, RunSummary, check};
pub use reporter::{NullReporter, Reporter};
pub use source::{ModuleList, ModuleSource, apply_filter, module_dir, source_for};
