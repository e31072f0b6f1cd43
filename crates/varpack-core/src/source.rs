//! Module enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use varpack_schema::{METADATA_FILE, ModuleId};

use crate::config::{Config, SourceKind};
use crate::error::SetupError;

/// Produces the ordered set of modules a run processes.
pub trait ModuleSource {
    /// Enumerate modules in processing order, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the source is missing or declares nothing.
    fn modules(&self) -> Result<Vec<ModuleId>, SetupError>;
}

/// Modules declared as git submodules in `<root>/.gitmodules`.
#[derive(Debug, Clone)]
pub struct GitModules {
    root: PathBuf,
}

impl GitModules {
    /// Enumerate submodules of the repository at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModuleSource for GitModules {
    fn modules(&self) -> Result<Vec<ModuleId>, SetupError> {
        let path = self.root.join(".gitmodules");
        let content =
            fs::read_to_string(&path).map_err(|_| SetupError::MissingSource(path.clone()))?;

        let modules = dedup(parse_gitmodules(&content));
        if modules.is_empty() {
            return Err(SetupError::NoModules(path.display().to_string()));
        }
        Ok(modules)
    }
}

/// Extract every `path = ...` value, in file order.
fn parse_gitmodules(content: &str) -> Vec<ModuleId> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "path").then(|| ModuleId::new(value.trim()))
        })
        .filter(|id| !id.as_str().is_empty())
        .collect()
}

/// Immediate sub-directories of `root` that carry a metadata file.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Enumerate module directories under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModuleSource for DirectorySource {
    fn modules(&self) -> Result<Vec<ModuleId>, SetupError> {
        let entries =
            fs::read_dir(&self.root).map_err(|_| SetupError::MissingSource(self.root.clone()))?;

        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().join(METADATA_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();

        if names.is_empty() {
            return Err(SetupError::NoModules(self.root.display().to_string()));
        }
        Ok(names.into_iter().map(ModuleId::from).collect())
    }
}

/// An explicit, caller-supplied module list.
#[derive(Debug, Clone)]
pub struct ModuleList(Vec<ModuleId>);

impl ModuleList {
    /// Use `modules` as given.
    pub fn new(modules: Vec<ModuleId>) -> Self {
        Self(modules)
    }
}

impl ModuleSource for ModuleList {
    fn modules(&self) -> Result<Vec<ModuleId>, SetupError> {
        if self.0.is_empty() {
            return Err(SetupError::NoModules("module list".to_string()));
        }
        Ok(dedup(self.0.clone()))
    }
}

/// The source configured for this run.
pub fn source_for(config: &Config) -> Box<dyn ModuleSource> {
    match config.module_source {
        SourceKind::GitModules => Box::new(GitModules::new(&config.modules_root)),
        SourceKind::Directory => Box::new(DirectorySource::new(&config.modules_root)),
    }
}

/// Restrict `modules` to the one named by `filter`, if any.
///
/// # Errors
///
/// Returns [`SetupError::FilterMatchedNothing`] when the filter names no
/// enumerated module (matched against the full identifier or its leaf).
pub fn apply_filter(
    modules: Vec<ModuleId>,
    filter: Option<&str>,
) -> Result<Vec<ModuleId>, SetupError> {
    let Some(filter) = filter else {
        return Ok(modules);
    };
    let selected: Vec<ModuleId> = modules
        .into_iter()
        .filter(|m| m.as_str() == filter || m.leaf() == filter)
        .collect();
    if selected.is_empty() {
        return Err(SetupError::FilterMatchedNothing(filter.to_string()));
    }
    Ok(selected)
}

/// Absolute location of a module's checkout.
pub fn module_dir(modules_root: &Path, module: &ModuleId) -> PathBuf {
    modules_root.join(module)
}

fn dedup(modules: Vec<ModuleId>) -> Vec<ModuleId> {
    let mut seen = std::collections::HashSet::new();
    modules
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GITMODULES: &str = r#"
[submodule "wallet"]
	path = modules/wallet
	url = https://example.com/wallet.git
[submodule "ledger"]
	path = modules/ledger
	url = https://example.com/ledger.git
[submodule "wallet-again"]
	path = modules/wallet
	url = https://example.com/wallet.git
"#;

    #[test]
    fn test_gitmodules_preserves_file_order() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(".gitmodules"), GITMODULES).unwrap();

        let modules = GitModules::new(tmp.path()).modules().unwrap();
        assert_eq!(
            modules,
            vec![
                ModuleId::new("modules/wallet"),
                ModuleId::new("modules/ledger")
            ]
        );
    }

    #[test]
    fn test_missing_gitmodules_is_setup_error() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            GitModules::new(tmp.path()).modules(),
            Err(SetupError::MissingSource(_))
        ));
    }

    #[test]
    fn test_empty_gitmodules_is_setup_error() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(".gitmodules"), "# nothing\n").unwrap();
        assert!(matches!(
            GitModules::new(tmp.path()).modules(),
            Err(SetupError::NoModules(_))
        ));
    }

    #[test]
    fn test_directory_source_sorted_and_requires_metadata() {
        let tmp = tempdir().unwrap();
        for name in ["zeta", "alpha", "no-meta"] {
            std::fs::create_dir_all(tmp.path().join(name)).unwrap();
        }
        std::fs::write(tmp.path().join("zeta/metadata.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("alpha/metadata.json"), "{}").unwrap();

        let modules = DirectorySource::new(tmp.path()).modules().unwrap();
        assert_eq!(modules, vec![ModuleId::new("alpha"), ModuleId::new("zeta")]);
    }

    #[test]
    fn test_filter_matches_leaf() {
        let modules = vec![
            ModuleId::new("modules/wallet"),
            ModuleId::new("modules/ledger"),
        ];
        let selected = apply_filter(modules.clone(), Some("ledger")).unwrap();
        assert_eq!(selected, vec![ModuleId::new("modules/ledger")]);

        assert!(matches!(
            apply_filter(modules, Some("missing")),
            Err(SetupError::FilterMatchedNothing(_))
        ));
    }
}
