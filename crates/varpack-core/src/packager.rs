//! The external packaging tool.
//!
//! The packager owns the archive format. Two operations are used:
//!
//! | Operation | Command line |
//! |---|---|
//! | create | `<packager> create <name>` (cwd = output directory) |
//! | add | `<packager> add <package> --variant <id> --files <dir> --main <path> -y` |
//!
//! Calls are synchronous and never retried.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;
use varpack_schema::Variant;

use crate::error::SetupError;
use crate::paths::package_file_name;

/// Failures of a packager invocation.
#[derive(Error, Debug)]
pub enum PackagerError {
    /// The packager process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The packager exited unsuccessfully.
    #[error("`{command}` failed with exit code {code:?}: {stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// `create` succeeded but the expected package file is absent.
    #[error("packager reported success but {0} was not produced")]
    MissingOutput(PathBuf),
}

/// Creates packages and appends variants to them.
pub trait Packager: Send + Sync {
    /// Create an empty package called `name` inside `dir` and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError`] if the tool fails or produces no file.
    fn create(&self, name: &str, dir: &Path) -> Result<PathBuf, PackagerError>;

    /// Append `variant` to `package`, taking every file under `files` and
    /// marking `main` (relative to `files`) as its entry point.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError`] if the tool fails.
    fn add(
        &self,
        package: &Path,
        variant: Variant,
        files: &Path,
        main: &Path,
    ) -> Result<(), PackagerError>;
}

/// [`Packager`] backed by the packaging binary.
#[derive(Debug, Clone)]
pub struct CliPackager {
    program: PathBuf,
    extension: String,
}

impl CliPackager {
    /// Use `program` as-is.
    pub fn new(program: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extension: extension.into(),
        }
    }

    /// Resolve `program` (a path or a name on `PATH`).
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::PackagerNotFound`] if it cannot be found.
    pub fn locate(program: &str, extension: &str) -> Result<Self, SetupError> {
        let resolved = which::which(program).map_err(|source| SetupError::PackagerNotFound {
            program: program.to_string(),
            source,
        })?;
        Ok(Self::new(resolved, extension))
    }

    /// Resolved path of the packaging binary.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, cmd: &mut Command) -> Result<(), PackagerError> {
        let rendered = render(cmd);
        debug!(command = %rendered, "invoking packager");

        let output = cmd.output().map_err(|source| PackagerError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(PackagerError::Failed {
                command: rendered,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Packager for CliPackager {
    fn create(&self, name: &str, dir: &Path) -> Result<PathBuf, PackagerError> {
        self.run(
            Command::new(&self.program)
                .arg("create")
                .arg(name)
                .current_dir(dir),
        )?;

        let package = dir.join(package_file_name(name, &self.extension));
        if !package.is_file() {
            return Err(PackagerError::MissingOutput(package));
        }
        Ok(package)
    }

    fn add(
        &self,
        package: &Path,
        variant: Variant,
        files: &Path,
        main: &Path,
    ) -> Result<(), PackagerError> {
        self.run(
            Command::new(&self.program)
                .arg("add")
                .arg(package)
                .arg("--variant")
                .arg(variant.as_str())
                .arg("--files")
                .arg(files)
                .arg("--main")
                .arg(main)
                .arg("-y"),
        )
    }
}

fn render(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
