//! `check` command.

use anyhow::Result;
use varpack_core::Config;
use varpack_schema::ModuleId;

use crate::ui::ConsoleReporter;

/// Verify that every module's single-variant manifests agree.
///
/// # Errors
///
/// Returns the first unreadable package or manifest mismatch.
pub fn check(config: &Config, modules: &[ModuleId]) -> Result<()> {
    let checked = varpack_core::check(config, modules, &ConsoleReporter)?;
    println!();
    println!("  {checked} modules consistent");
    Ok(())
}
