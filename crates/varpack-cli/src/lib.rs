//! varpack - assemble multi-variant module packages.
//!
//! # Overview
//!
//! Each module is built once per platform variant. `varpack` collects the
//! per-variant outputs, verifies their manifests agree, and packs them into a
//! single package per module through the external packaging tool. A sorted
//! `list.json` index describes every package.
//!
//! # Layout
//!
//! ```text
//! artifacts/
//! ├── linux-amd64/<module>/   # `varpack build` output
//! └── darwin-arm64/<leaf>.vpk # single-variant packages for `varpack merge`
//! dist/
//! ├── <name>.vpk              # assembled packages
//! └── list.json               # package index
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use varpack_core::source::ModuleSource;
use varpack_core::{Config, ModuleList, SetupError, apply_filter, source_for};
use varpack_schema::{ModuleId, Variant};

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "varpack")]
#[command(author, version, about = "varpack - assemble multi-variant module packages")]
pub struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command. Flags override environment variables,
/// which override the configuration file.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Configuration file (defaults to ./varpack.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing the module checkouts
    #[arg(long, global = true)]
    pub modules_root: Option<PathBuf>,

    /// Root of the per-variant artifact tree
    #[arg(long, global = true, env = "VARPACK_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Directory receiving packages and the index
    #[arg(long, global = true, env = "VARPACK_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Packaging tool (path or name on PATH)
    #[arg(long, global = true, env = "VARPACK_PACKAGER")]
    pub packager: Option<String>,

    /// Restrict to a variant (repeatable)
    #[arg(long = "variant", global = true)]
    pub variants: Vec<Variant>,

    /// Process modules given explicitly instead of enumerating them (repeatable)
    #[arg(long = "module", global = true)]
    pub modules: Vec<String>,

    /// Process only the module with this identifier or name
    #[arg(short, long, global = true)]
    pub filter: Option<String>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build modules and stage their libraries into the artifact tree
    Build {
        /// Maximum parallel builds
        #[arg(long, default_value_t = num_cpus::get())]
        parallel: usize,
        /// Stream build output instead of writing log files
        #[arg(short, long)]
        verbose: bool,
    },
    /// Package fresh build output into multi-variant packages
    Assemble,
    /// Merge existing single-variant packages into multi-variant packages
    Merge,
    /// Verify that single-variant manifests agree, without writing anything
    Check,
}

impl GlobalArgs {
    /// Load the configuration file and apply overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(root) = &self.modules_root {
            config.modules_root.clone_from(root);
        }
        if let Some(dir) = &self.artifacts_dir {
            config.artifacts_dir.clone_from(dir);
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(packager) = &self.packager {
            config.packager.clone_from(packager);
        }
        if !self.variants.is_empty() {
            config.variants.clone_from(&self.variants);
        }
        Ok(config)
    }

    /// Modules to process, in enumeration order, after `--filter`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the source is missing or empty, or the
    /// filter matches nothing.
    pub fn resolve_modules(&self, config: &Config) -> Result<Vec<ModuleId>, SetupError> {
        let modules = if self.modules.is_empty() {
            source_for(config).modules()?
        } else {
            ModuleList::new(self.modules.iter().map(String::as_str).map(ModuleId::new).collect())
                .modules()?
        };
        apply_filter(modules, self.filter.as_deref())
    }

    /// Variants to build: the ones given on the command line, or the host's.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::UnsupportedHost`] when no variant was given and
    /// the host is not a supported variant.
    pub fn build_variants(&self) -> Result<Vec<Variant>, SetupError> {
        if !self.variants.is_empty() {
            let mut variants = self.variants.clone();
            variants.sort();
            variants.dedup();
            return Ok(variants);
        }
        Variant::current()
            .map(|v| vec![v])
            .ok_or(SetupError::UnsupportedHost)
    }
}
