//! Console output.

use std::path::Path;

use varpack_core::Reporter;
use varpack_schema::{ModuleId, Variant};

/// Plain-text progress on standard output; warnings on standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!();
        println!("  {}", title.to_lowercase());
    }

    fn module_started(&self, module: &ModuleId) {
        println!("  processing {module}");
    }

    fn module_skipped(&self, module: &ModuleId, reason: &str) {
        println!("    skipped {module}: {reason}");
    }

    fn variant_added(&self, _module: &ModuleId, variant: Variant, entry: &Path) {
        println!("    + {variant} ({})", entry.display());
    }

    fn variant_skipped(&self, _module: &ModuleId, variant: Variant, reason: &str) {
        eprintln!("    warning: {variant} skipped: {reason}");
    }

    fn module_done(&self, _module: &ModuleId, package: &str, variants: usize) {
        println!("    packaged {package} ({variants} variants)");
    }

    fn warning(&self, msg: &str) {
        eprintln!("    warning: {msg}");
    }

    fn summary(&self, assembled: usize, skipped: usize, elapsed_secs: f64) {
        println!();
        println!("  {assembled} assembled, {skipped} skipped in {elapsed_secs:.1}s");
    }
}
