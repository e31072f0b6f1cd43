//! `assemble` and `merge` commands.

use anyhow::Result;
use varpack_core::{AssemblyMode, CliPackager, Config, Pipeline};
use varpack_schema::ModuleId;

use crate::ui::ConsoleReporter;

/// Assemble one package per module and update the index.
///
/// The packager is located before any module is touched.
///
/// # Errors
///
/// Returns the first setup or assembly failure.
pub fn assemble(config: &Config, modules: &[ModuleId], mode: AssemblyMode) -> Result<()> {
    let packager = CliPackager::locate(&config.packager, &config.extension)?;
    tracing::debug!(packager = %packager.program().display(), "packager located");

    let reporter = ConsoleReporter;
    let summary = Pipeline::new(config, &packager, mode, &reporter).run(modules)?;

    for (module, variant) in &summary.skipped_variants {
        println!("    note: {module}: {variant} left out");
    }
    println!("  index: {}", summary.index.display());
    Ok(())
}
