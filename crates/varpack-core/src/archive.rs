//! Read access to package archives and structural manifest rewrites.
//!
//! A package is a zip archive with `manifest.json` at the root and each
//! variant's file set stored under a `<variant-id>/` prefix. Creating
//! packages and appending variants is the external packager's job; this
//! module only reads them and replaces the manifest in place.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use varpack_schema::{MANIFEST_PATH, Manifest, ManifestError, Variant};
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Errors raised while reading or rewriting a package archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// IO error on the archive or an extracted file.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not a readable zip archive.
    #[error("archive error in {path}: {source}")]
    Zip {
        /// Archive involved.
        path: PathBuf,
        /// Underlying error.
        source: zip::result::ZipError,
    },

    /// The archive carries no `manifest.json`.
    #[error("{0} has no manifest.json")]
    MissingManifest(PathBuf),

    /// The embedded manifest is not a JSON object.
    #[error("invalid manifest in {path}: {source}")]
    Manifest {
        /// Archive involved.
        path: PathBuf,
        /// Underlying error.
        source: ManifestError,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn zip_err(path: &Path) -> impl FnOnce(zip::result::ZipError) -> ArchiveError + '_ {
    move |source| ArchiveError::Zip {
        path: path.to_path_buf(),
        source,
    }
}

fn open(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(io_err(path))?;
    ZipArchive::new(file).map_err(zip_err(path))
}

/// Read the manifest embedded in a package.
///
/// # Errors
///
/// Returns [`ArchiveError`] if the archive cannot be opened, has no
/// manifest, or the manifest is not a JSON object.
pub fn read_manifest(path: &Path) -> Result<Manifest, ArchiveError> {
    let mut archive = open(path)?;
    let mut entry = match archive.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingManifest(path.to_path_buf()));
        }
        Err(e) => return Err(zip_err(path)(e)),
    };

    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).map_err(io_err(path))?;
    Manifest::from_slice(&bytes).map_err(|source| ArchiveError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the manifest of a package, keeping every other entry byte-for-byte.
///
/// The archive is rebuilt into a sibling temporary file and renamed over the
/// original, so a failure leaves the package untouched.
///
/// # Errors
///
/// Returns [`ArchiveError`] if the archive cannot be read, the temporary file
/// cannot be written, or the final rename fails.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ArchiveError> {
    let mut archive = open(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    let mut writer = ZipWriter::new(tmp.reopen().map_err(io_err(tmp.path()))?);

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(zip_err(path))?;
        if entry.name() == MANIFEST_PATH {
            continue;
        }
        writer.raw_copy_file(entry).map_err(zip_err(path))?;
    }

    let json = manifest
        .to_pretty_json()
        .map_err(|source| ArchiveError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
    writer
        .start_file(MANIFEST_PATH, SimpleFileOptions::default())
        .map_err(zip_err(path))?;
    writer.write_all(json.as_bytes()).map_err(io_err(path))?;
    writer.finish().map_err(zip_err(path))?;

    tmp.persist(path).map_err(|e| ArchiveError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    debug!(package = %path.display(), "manifest rewritten");
    Ok(())
}

/// Variants that have at least one file in the package, in canonical order.
///
/// # Errors
///
/// Returns [`ArchiveError`] if the archive cannot be opened.
pub fn list_variants(path: &Path) -> Result<Vec<Variant>, ArchiveError> {
    let archive = open(path)?;
    let mut variants: Vec<Variant> = archive
        .file_names()
        .filter_map(|name| name.split_once('/'))
        .filter(|(_, rest)| !rest.is_empty())
        .filter_map(|(prefix, _)| prefix.parse().ok())
        .collect();
    variants.sort();
    variants.dedup();
    Ok(variants)
}

/// Extract one variant's file set into `dest`, stripping the variant prefix.
///
/// Returns the extracted paths relative to `dest`, sorted.
///
/// # Errors
///
/// Returns [`ArchiveError`] if the archive cannot be read or a file cannot
/// be written.
pub fn extract_variant(
    path: &Path,
    variant: Variant,
    dest: &Path,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = open(path)?;
    fs::create_dir_all(dest).map_err(io_err(dest))?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err(path))?;
        let Some(enclosed) = entry.enclosed_name() else {
            continue;
        };
        let Ok(relative) = enclosed.strip_prefix(variant.as_str()) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let relative = relative.to_path_buf();
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut out = File::create(&target).map_err(io_err(&target))?;
        io::copy(&mut entry, &mut out).map_err(io_err(&target))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .map_err(io_err(&target))?;
        }

        extracted.push(relative);
    }

    extracted.sort();
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_package;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_read_manifest() {
        let tmp = tempdir().unwrap();
        let pkg = tmp.path().join("wallet.vpk");
        write_package(
            &pkg,
            &json!({"name": "wallet", "main": "libwallet"}),
            &[(Variant::LinuxAmd64, "libwallet.so", "elf")],
        );

        let manifest = read_manifest(&pkg).unwrap();
        assert_eq!(manifest.get_str("name"), Some("wallet"));
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = tempdir().unwrap();
        let pkg = tmp.path().join("bare.vpk");
        let mut writer = ZipWriter::new(File::create(&pkg).unwrap());
        writer
            .start_file("linux-amd64/lib.so", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"x").unwrap();
        writer.finish().unwrap();

        assert!(matches!(
            read_manifest(&pkg),
            Err(ArchiveError::MissingManifest(_))
        ));
    }

    #[test]
    fn test_write_manifest_preserves_other_entries() {
        let tmp = tempdir().unwrap();
        let pkg = tmp.path().join("wallet.vpk");
        write_package(
            &pkg,
            &json!({"name": "wallet", "description": "old"}),
            &[
                (Variant::LinuxAmd64, "libwallet.so", "linux-bytes"),
                (Variant::DarwinArm64, "libwallet.dylib", "darwin-bytes"),
            ],
        );

        let mut manifest = read_manifest(&pkg).unwrap();
        manifest.insert("description", json!("new"));
        write_manifest(&pkg, &manifest).unwrap();

        assert_eq!(
            read_manifest(&pkg).unwrap().get_str("description"),
            Some("new")
        );
        assert_eq!(
            list_variants(&pkg).unwrap(),
            vec![Variant::LinuxAmd64, Variant::DarwinArm64]
        );

        let out = tmp.path().join("out");
        extract_variant(&pkg, Variant::DarwinArm64, &out).unwrap();
        assert_eq!(
            std::fs::read_to_string(out.join("libwallet.dylib")).unwrap(),
            "darwin-bytes"
        );
    }

    #[test]
    fn test_extract_variant_only_takes_its_prefix() {
        let tmp = tempdir().unwrap();
        let pkg = tmp.path().join("wallet.vpk");
        write_package(
            &pkg,
            &json!({"name": "wallet"}),
            &[
                (Variant::LinuxAmd64, "libwallet.so", "a"),
                (Variant::LinuxAmd64, "res/strings.txt", "b"),
                (Variant::DarwinArm64, "libwallet.dylib", "c"),
            ],
        );

        let out = tmp.path().join("linux");
        let files = extract_variant(&pkg, Variant::LinuxAmd64, &out).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("libwallet.so"),
                PathBuf::from("res/strings.txt")
            ]
        );
        assert!(!out.join("libwallet.dylib").exists());
    }
}
