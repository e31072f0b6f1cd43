//! Fresh builds of module libraries.
//!
//! A build runs the configured command through `/bin/sh -c` inside the module
//! directory. Scripts receive:
//!
//! | Variable | Value |
//! |---|---|
//! | `VARPACK_VARIANT` | Target variant identifier (e.g. `linux-amd64`) |
//! | `VARPACK_MODULE` | Module identifier (e.g. `modules/wallet`) |
//! | `JOBS` | Logical CPU count |
//!
//! Output is captured to a log file unless the builder is verbose. The
//! library output directory is then staged into the artifact tree with
//! [`stage_output`].

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use varpack_schema::{ModuleId, Variant};

use crate::paths::{build_log_path, library_artifact_dir};

/// Number of log lines shown when a build fails.
const FAILURE_TAIL_LINES: usize = 20;

/// Bytes read from the end of a build log for the failure tail.
const LOG_TAIL_BYTES: u64 = 16 * 1024;

/// Produces a module's library output directory.
pub trait Builder: Send + Sync {
    /// Build `module` from the sources in `module_dir`, returning the
    /// directory holding its library files.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails or leaves no output directory.
    fn build(&self, module: &ModuleId, module_dir: &Path) -> Result<PathBuf>;
}

/// Runs a shell command to build each module.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: String,
    output_subdir: PathBuf,
    variant: Variant,
    log_dir: PathBuf,
    verbose: bool,
}

impl CommandBuilder {
    /// Create a builder running `command` for `variant`.
    ///
    /// `output_subdir` is the library directory relative to the module root.
    pub fn new(
        command: impl Into<String>,
        output_subdir: impl Into<PathBuf>,
        variant: Variant,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            output_subdir: output_subdir.into(),
            variant,
            log_dir: log_dir.into(),
            verbose: false,
        }
    }

    /// Stream build output to the terminal instead of a log file.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Variant this builder targets.
    pub fn variant(&self) -> Variant {
        self.variant
    }
}

impl Builder for CommandBuilder {
    fn build(&self, module: &ModuleId, module_dir: &Path) -> Result<PathBuf> {
        if !module_dir.is_dir() {
            bail!("Module directory {} does not exist", module_dir.display());
        }

        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c")
            .arg(&self.command)
            .current_dir(module_dir)
            .env("VARPACK_VARIANT", self.variant.as_str())
            .env("VARPACK_MODULE", module.as_str())
            .env("JOBS", num_cpus::get().to_string());

        debug!(module = %module, variant = %self.variant, command = %self.command, "running build");

        let log_path = build_log_path(&self.log_dir, module, self.variant);
        let status = if self.verbose {
            cmd.status().context("Failed to execute build command")?
        } else {
            fs::create_dir_all(&self.log_dir).with_context(|| {
                format!("Failed to create log directory {}", self.log_dir.display())
            })?;
            let log_file = fs::File::create(&log_path).context("Failed to create build log file")?;
            cmd.stdout(Stdio::from(log_file.try_clone()?))
                .stderr(Stdio::from(log_file))
                .status()
                .context("Failed to execute build command")?
        };

        if !status.success() {
            let tail = if self.verbose {
                None
            } else {
                read_last_lines(&log_path, FAILURE_TAIL_LINES).ok()
            };
            if let Some(tail) = tail {
                eprintln!("\nBuild of {module} failed. Last {FAILURE_TAIL_LINES} lines:");
                eprintln!("{tail}");
                eprintln!("\nFull log: {}", log_path.display());
            }
            bail!(
                "Build of {module} for {} failed with exit code: {:?}",
                self.variant,
                status.code()
            );
        }

        let output = module_dir.join(&self.output_subdir);
        if !output.is_dir() {
            bail!(
                "Build of {module} produced no output directory {}",
                output.display()
            );
        }
        info!(module = %module, variant = %self.variant, "build finished");
        Ok(output)
    }
}

/// Copy a module's library output into `<artifacts>/<variant>/<module>/`,
/// replacing anything previously staged there.
///
/// # Errors
///
/// Returns an error if the previous output cannot be removed or the copy
/// fails.
pub fn stage_output(
    artifacts_dir: &Path,
    variant: Variant,
    module: &ModuleId,
    lib_dir: &Path,
) -> Result<PathBuf> {
    let dest = library_artifact_dir(artifacts_dir, variant, module);
    if dest.exists() {
        fs::remove_dir_all(&dest)
            .with_context(|| format!("Failed to clear {}", dest.display()))?;
    }
    fs::create_dir_all(&dest)?;
    copy_dir_all(lib_dir, &dest)?;
    debug!(module = %module, dest = %dest.display(), "output staged");
    Ok(dest)
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs_extra::dir::copy(
        src,
        dst,
        &fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true),
    )
    .map_err(|e| anyhow::anyhow!("Copy of {} failed: {e}", src.display()))?;
    Ok(())
}

/// Last `n` lines of a build log. Only the final [`LOG_TAIL_BYTES`] are read;
/// invalid UTF-8 (e.g. a character cut by the seek) is replaced.
fn read_last_lines(path: &Path, n: usize) -> Result<String> {
    let mut log = fs::File::open(path)?;
    let offset = log.metadata()?.len().saturating_sub(LOG_TAIL_BYTES);
    log.seek(SeekFrom::Start(offset))?;

    let mut bytes = Vec::new();
    log.read_to_end(&mut bytes)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut lines: Vec<&str> = text.lines().collect();
    if offset > 0 && !lines.is_empty() {
        lines.remove(0);
    }
    let first = lines.len().saturating_sub(n);
    Ok(lines[first..].join("\n"))
}
