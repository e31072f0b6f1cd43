//! Test doubles shared by unit tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use varpack_schema::{MANIFEST_PATH, ModuleId, Variant};
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::packager::{Packager, PackagerError};
use crate::reporter::Reporter;

/// Write a package with `manifest` and `(variant, relative path, contents)` files.
pub(crate) fn write_package(path: &Path, manifest: &Value, files: &[(Variant, &str, &str)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    writer
        .start_file(MANIFEST_PATH, SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(serde_json::to_string_pretty(manifest).unwrap().as_bytes())
        .unwrap();
    for (variant, name, contents) in files {
        writer
            .start_file(format!("{variant}/{name}"), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// In-process [`Packager`] producing the same archive layout as the real tool.
#[derive(Debug, Default)]
pub(crate) struct ZipPackager {
    fail_on: Option<Variant>,
    added: Mutex<Vec<(Variant, PathBuf)>>,
    created: Mutex<Vec<String>>,
}

impl ZipPackager {
    pub(crate) const DEFAULT_DESCRIPTION: &'static str = "A varpack module";

    /// A packager whose `add` fails for `variant`.
    pub(crate) fn failing_on(variant: Variant) -> Self {
        Self {
            fail_on: Some(variant),
            ..Self::default()
        }
    }

    /// `(variant, main)` of every successful `add`, in call order.
    pub(crate) fn added(&self) -> Vec<(Variant, PathBuf)> {
        self.added.lock().unwrap().clone()
    }

    /// Names passed to `create`, in call order.
    pub(crate) fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

impl Packager for ZipPackager {
    fn create(&self, name: &str, dir: &Path) -> Result<PathBuf, PackagerError> {
        let path = dir.join(format!("{name}.vpk"));
        write_package(
            &path,
            &serde_json::json!({
                "name": name,
                "version": "0.0.0",
                "description": Self::DEFAULT_DESCRIPTION,
            }),
            &[],
        );
        self.created.lock().unwrap().push(name.to_string());
        Ok(path)
    }

    fn add(
        &self,
        package: &Path,
        variant: Variant,
        files: &Path,
        main: &Path,
    ) -> Result<(), PackagerError> {
        if self.fail_on == Some(variant) {
            return Err(PackagerError::Failed {
                command: format!("add {} --variant {variant}", package.display()),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }

        let mut archive = ZipArchive::new(File::open(package).unwrap()).unwrap();
        let tmp = tempfile::NamedTempFile::new_in(package.parent().unwrap()).unwrap();
        let mut writer = ZipWriter::new(tmp.reopen().unwrap());
        for i in 0..archive.len() {
            writer
                .raw_copy_file(archive.by_index_raw(i).unwrap())
                .unwrap();
        }
        for entry in walkdir::WalkDir::new(files).sort_by_file_name() {
            let entry = entry.unwrap();
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(files).unwrap();
            writer
                .start_file(
                    format!("{variant}/{}", relative.display()),
                    SimpleFileOptions::default(),
                )
                .unwrap();
            writer
                .write_all(&std::fs::read(entry.path()).unwrap())
                .unwrap();
        }
        writer.finish().unwrap();
        tmp.persist(package).unwrap();

        self.added
            .lock()
            .unwrap()
            .push((variant, main.to_path_buf()));
        Ok(())
    }
}

/// [`Reporter`] that keeps skipped modules and warnings for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    skipped: Mutex<Vec<(ModuleId, String)>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub(crate) fn skipped(&self) -> Vec<(ModuleId, String)> {
        self.skipped.lock().unwrap().clone()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, _: &str) {}
    fn module_started(&self, _: &ModuleId) {}
    fn module_skipped(&self, module: &ModuleId, reason: &str) {
        self.skipped
            .lock()
            .unwrap()
            .push((module.clone(), reason.to_string()));
    }
    fn variant_added(&self, _: &ModuleId, _: Variant, _: &Path) {}
    fn variant_skipped(&self, _: &ModuleId, _: Variant, _: &str) {}
    fn module_done(&self, _: &ModuleId, _: &str, _: usize) {}
    fn warning(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
    fn summary(&self, _: usize, _: usize, _: f64) {}
}
