//! Package index accumulation and persistence.
//!
//! Entries are keyed by module identifier. A run merges its entries over the
//! index already on disk, so re-running a subset of modules keeps unrelated
//! rows. Output is sorted by key and byte-stable for identical input.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use varpack_schema::{IndexEntry, ModuleId};

use crate::assembler::AssembledPackage;

/// Accumulates index entries for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBuilder {
    entries: BTreeMap<ModuleId, IndexEntry>,
}

impl IndexBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing index file.
    ///
    /// A missing file yields an empty builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read index {}", path.display()))?;
        let entries: Vec<IndexEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index {}", path.display()))?;

        let mut builder = Self::new();
        for entry in entries {
            builder.insert(entry);
        }
        Ok(builder)
    }

    /// Insert or replace the entry for its module.
    pub fn insert(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Record an assembled package.
    pub fn record(&mut self, package: &AssembledPackage) {
        self.insert(IndexEntry::from_manifest(
            &package.module,
            &package.manifest,
            package.file_name.as_str(),
            &package.variants,
        ));
    }

    /// Overlay `other`'s entries onto this one; `other` wins on conflicts.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Look up a module's entry.
    pub fn get(&self, module: &str) -> Option<&IndexEntry> {
        self.entries.get(module)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by module identifier.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Serialize as a pretty JSON array sorted by module identifier.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String> {
        let list: Vec<&IndexEntry> = self.entries().collect();
        let mut json = serde_json::to_string_pretty(&list)?;
        json.push('\n');
        Ok(json)
    }

    /// Merge over the index at `path` (if any) and write the result there.
    ///
    /// The write goes through a temporary file and a rename so readers never
    /// observe a partial index.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing index cannot be parsed or the new
    /// one cannot be written.
    pub fn persist(self, path: &Path) -> Result<Self> {
        let mut merged = Self::load(path)?;
        merged.merge(self);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, merged.to_json()?)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move index into {}", path.display()))?;

        debug!(index = %path.display(), entries = merged.len(), "index written");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use varpack_schema::{Manifest, Variant};

    fn entry(module: &str, version: &str) -> IndexEntry {
        let manifest = Manifest::try_from(json!({
            "name": module,
            "version": version,
            "type": "plugin"
        }))
        .unwrap();
        IndexEntry::from_manifest(
            &ModuleId::new(module),
            &manifest,
            format!("{module}.vpk"),
            &[Variant::LinuxAmd64],
        )
    }

    #[test]
    fn test_sorted_regardless_of_insertion_order() {
        let mut builder = IndexBuilder::new();
        builder.insert(entry("zeta", "1.0.0"));
        builder.insert(entry("alpha", "1.0.0"));
        builder.insert(entry("mid", "1.0.0"));

        let names: Vec<&str> = builder.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_persist_is_idempotent() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("list.json");

        let build = || {
            let mut b = IndexBuilder::new();
            b.insert(entry("wallet", "1.0.0"));
            b.insert(entry("ledger", "2.0.0"));
            b
        };

        build().persist(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        build().persist(&path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_persist_preserves_unrelated_entries() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("list.json");

        let mut first = IndexBuilder::new();
        first.insert(entry("wallet", "1.0.0"));
        first.insert(entry("ledger", "1.0.0"));
        first.persist(&path).unwrap();

        let mut rerun = IndexBuilder::new();
        rerun.insert(entry("wallet", "1.1.0"));
        let merged = rerun.persist(&path).unwrap();

        assert_eq!(merged.len(), 2);
        let reloaded = IndexBuilder::load(&path).unwrap();
        assert_eq!(
            reloaded.get("wallet").unwrap().version,
            Some(json!("1.1.0"))
        );
        assert_eq!(
            reloaded.get("ledger").unwrap().version,
            Some(json!("1.0.0"))
        );
    }

    #[test]
    fn test_corrupt_existing_index_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("list.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut builder = IndexBuilder::new();
        builder.insert(entry("wallet", "1.0.0"));
        assert!(builder.persist(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_empty_index_serializes_as_empty_array() {
        assert_eq!(IndexBuilder::new().to_json().unwrap(), "[]\n");
    }
}
