//! Run configuration.
//!
//! Values come from built-in defaults, optionally overlaid by a
//! `varpack.toml` file. The CLI applies environment variables and flags on
//! top of the loaded value.
//!
//! ```toml
//! modules-root = "."
//! module-source = "gitmodules"
//! artifacts-dir = "artifacts"
//! output-dir = "dist"
//! packager = "vpk"
//! extension = "vpk"
//! variants = ["linux-amd64", "darwin-arm64"]
//!
//! [build]
//! command = "make lib"
//! output-dir = "lib"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use varpack_schema::{INDEX_FILE, Variant};

/// File picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "varpack.toml";

/// Errors that can occur when loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML content could not be deserialized into a configuration.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// How modules are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Every `path = ...` entry of `.gitmodules` under the modules root.
    #[default]
    GitModules,
    /// Every sub-directory of the modules root holding a `metadata.json`.
    Directory,
}

/// Settings for the fresh build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildConfig {
    /// Shell command run in each module directory.
    pub command: String,
    /// Library output directory, relative to the module directory.
    pub output_dir: PathBuf,
    /// Where per-module build logs are written.
    pub log_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: "make".to_string(),
            output_dir: PathBuf::from("lib"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Complete configuration for a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Directory the module identifiers are relative to.
    pub modules_root: PathBuf,
    /// Module enumeration strategy.
    pub module_source: SourceKind,
    /// Root of the per-variant artifact tree.
    pub artifacts_dir: PathBuf,
    /// Where packages and the index are written.
    pub output_dir: PathBuf,
    /// Packager program name or path.
    pub packager: String,
    /// Package file extension, without the dot.
    pub extension: String,
    /// Variants considered, in this order.
    pub variants: Vec<Variant>,
    /// File name of the index inside `output_dir`.
    pub index_file: String,
    /// Fresh build settings.
    pub build: BuildConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modules_root: PathBuf::from("."),
            module_source: SourceKind::default(),
            artifacts_dir: PathBuf::from("artifacts"),
            output_dir: PathBuf::from("dist"),
            packager: "vpk".to_string(),
            extension: "vpk".to_string(),
            variants: Variant::ALL.to_vec(),
            index_file: INDEX_FILE.to_string(),
            build: BuildConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] in
    /// the working directory is used if present, otherwise the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Full path of the package index.
    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join(&self.index_file)
    }

    /// Variants in canonical order with duplicates removed.
    pub fn ordered_variants(&self) -> Vec<Variant> {
        let mut variants = self.variants.clone();
        variants.sort();
        variants.dedup();
        variants
    }
}
