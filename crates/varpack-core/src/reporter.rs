//! Reporter trait for dependency injection
//!
//! This trait allows the pipeline to report progress and status without
//! being coupled to a specific console implementation.

use std::path::Path;

use varpack_schema::{ModuleId, Variant};

/// Sink for operator-facing progress events.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Assembling").
    fn section(&self, title: &str);

    /// A module has been picked up for processing.
    fn module_started(&self, module: &ModuleId);

    /// A module produced nothing and was skipped (not an error).
    fn module_skipped(&self, module: &ModuleId, reason: &str);

    /// A variant was appended to the module's package.
    fn variant_added(&self, module: &ModuleId, variant: Variant, entry: &Path);

    /// A variant was left out of the module's package.
    fn variant_skipped(&self, module: &ModuleId, variant: Variant, reason: &str);

    /// A module's package is complete.
    fn module_done(&self, module: &ModuleId, package: &str, variants: usize);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary of the run.
    fn summary(&self, assembled: usize, skipped: usize, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn module_started(&self, module: &ModuleId) {
        (**self).module_started(module);
    }
    fn module_skipped(&self, module: &ModuleId, reason: &str) {
        (**self).module_skipped(module, reason);
    }
    fn variant_added(&self, module: &ModuleId, variant: Variant, entry: &Path) {
        (**self).variant_added(module, variant, entry);
    }
    fn variant_skipped(&self, module: &ModuleId, variant: Variant, reason: &str) {
        (**self).variant_skipped(module, variant, reason);
    }
    fn module_done(&self, module: &ModuleId, package: &str, variants: usize) {
        (**self).module_done(module, package, variants);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, assembled: usize, skipped: usize, elapsed_secs: f64) {
        (**self).summary(assembled, skipped, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., `check`, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn module_started(&self, _: &ModuleId) {}
    fn module_skipped(&self, _: &ModuleId, _: &str) {}
    fn variant_added(&self, _: &ModuleId, _: Variant, _: &Path) {}
    fn variant_skipped(&self, _: &ModuleId, _: Variant, _: &str) {}
    fn module_done(&self, _: &ModuleId, _: &str, _: usize) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: f64) {}
}
