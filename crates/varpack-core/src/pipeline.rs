//! Per-module assembly driver.
//!
//! Modules are processed one at a time in enumeration order:
//!
//! ```text
//! collect -> (merge) reconcile -> assemble -> record
//! ```
//!
//! Entries accumulate in an [`IndexBuilder`] that is merged with the index on
//! disk once every module has succeeded. Any fatal error stops the run and
//! leaves the existing index untouched; packages already written stay on
//! disk.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;
use varpack_schema::{ModuleId, Variant};

use crate::assembler::{AssembledPackage, Assembler, AssemblyMode};
use crate::collector::{VariantArtifact, VariantCollector};
use crate::config::Config;
use crate::error::SetupError;
use crate::index::IndexBuilder;
use crate::packager::Packager;
use crate::reconcile::reconcile_artifacts;
use crate::reporter::Reporter;
use crate::source::module_dir;

/// One module that made it into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutcome {
    /// Module identifier.
    pub module: ModuleId,
    /// Package file name.
    pub package: String,
    /// Number of variants packaged.
    pub variants: usize,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Assembled modules, in processing order.
    pub assembled: Vec<ModuleOutcome>,
    /// Modules without any variant artifact, or whose every variant was
    /// left out.
    pub skipped: Vec<ModuleId>,
    /// Variants left out of otherwise assembled packages.
    pub skipped_variants: Vec<(ModuleId, Variant)>,
    /// Index file written at the end of the run.
    pub index: PathBuf,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Drives collection, reconciliation and assembly for a list of modules.
pub struct Pipeline<'a> {
    config: &'a Config,
    packager: &'a dyn Packager,
    reporter: &'a dyn Reporter,
    mode: AssemblyMode,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline for `mode`.
    pub fn new(
        config: &'a Config,
        packager: &'a dyn Packager,
        mode: AssemblyMode,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            packager,
            reporter,
            mode,
        }
    }

    /// Assemble every module in `modules` and update the index.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: an unreadable artifact, a manifest
    /// mismatch, a missing name, a packager failure, a missing entry point
    /// in fresh mode, or an index that cannot be merged or written.
    pub fn run(&self, modules: &[ModuleId]) -> Result<RunSummary> {
        let start = Instant::now();
        let variants = self.config.ordered_variants();
        if variants.is_empty() {
            return Err(SetupError::NoVariants.into());
        }

        let collector = VariantCollector::new(
            &self.config.artifacts_dir,
            &variants,
            &self.config.extension,
        );
        let assembler = Assembler::new(
            self.packager,
            &self.config.output_dir,
            &self.config.extension,
            self.mode,
            self.reporter,
        );

        self.reporter.section(match self.mode {
            AssemblyMode::Fresh => "Assembling",
            AssemblyMode::Merge => "Merging",
        });

        let mut index = IndexBuilder::new();
        let mut summary = RunSummary::default();

        for module in modules {
            self.reporter.module_started(module);

            let artifacts = self.collect(&collector, module)?;
            if artifacts.is_empty() {
                info!(module = %module, "no variant artifacts, skipping");
                self.reporter
                    .module_skipped(module, "no variant artifacts found");
                summary.skipped.push(module.clone());
                continue;
            }

            let Some(package) = self.assemble_module(&assembler, module, &artifacts)? else {
                info!(module = %module, "no variant could be packaged, skipping");
                self.reporter
                    .module_skipped(module, "no variant had its entry point");
                summary.skipped.push(module.clone());
                continue;
            };
            self.reporter
                .module_done(module, &package.file_name, package.variants.len());

            index.record(&package);
            summary
                .skipped_variants
                .extend(package.skipped.iter().map(|&v| (module.clone(), v)));
            summary.assembled.push(ModuleOutcome {
                module: package.module,
                package: package.file_name,
                variants: package.variants.len(),
            });
        }

        let index_path = self.config.index_path();
        index
            .persist(&index_path)
            .with_context(|| format!("Failed to update index {}", index_path.display()))?;
        summary.index = index_path;
        summary.elapsed = start.elapsed();

        self.reporter.summary(
            summary.assembled.len(),
            summary.skipped.len(),
            summary.elapsed.as_secs_f64(),
        );
        Ok(summary)
    }

    fn collect(
        &self,
        collector: &VariantCollector<'_>,
        module: &ModuleId,
    ) -> Result<Vec<VariantArtifact>> {
        match self.mode {
            AssemblyMode::Fresh => Ok(collector.collect_libraries(module)),
            AssemblyMode::Merge => collector
                .collect_packages(module)
                .with_context(|| format!("Failed to collect packages for {module}")),
        }
    }

    fn assemble_module(
        &self,
        assembler: &Assembler<'_>,
        module: &ModuleId,
        artifacts: &[VariantArtifact],
    ) -> Result<Option<AssembledPackage>> {
        if self.mode == AssemblyMode::Merge {
            reconcile_artifacts(module, artifacts)?;
        }
        let canonical =
            assembler.canonical_metadata(&module_dir(&self.config.modules_root, module), artifacts);
        assembler
            .assemble(module, &canonical, artifacts)
            .with_context(|| format!("Failed to assemble {module}"))
    }
}

/// Collect single-variant packages and reconcile their manifests without
/// writing anything. Returns the number of modules that had artifacts.
///
/// # Errors
///
/// Returns the first unreadable package or manifest mismatch.
pub fn check(config: &Config, modules: &[ModuleId], reporter: &dyn Reporter) -> Result<usize> {
    let variants = config.ordered_variants();
    if variants.is_empty() {
        return Err(SetupError::NoVariants.into());
    }
    let collector = VariantCollector::new(&config.artifacts_dir, &variants, &config.extension);

    reporter.section("Checking");
    let mut checked = 0;
    for module in modules {
        reporter.module_started(module);
        let artifacts = collector
            .collect_packages(module)
            .with_context(|| format!("Failed to collect packages for {module}"))?;
        if artifacts.is_empty() {
            reporter.module_skipped(module, "no variant artifacts found");
            continue;
        }
        reconcile_artifacts(module, &artifacts)?;
        info!(module = %module, variants = artifacts.len(), "manifests agree");
        checked += 1;
    }
    Ok(checked)
}
