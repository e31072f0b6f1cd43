//! Cross-variant manifest agreement.
//!
//! Every variant of a module must declare the same manifest once
//! platform-specific keys (see [`varpack_schema::manifest::PLATFORM_KEYS`])
//! are removed. Equality is structural: object key order is irrelevant,
//! array order is significant.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;
use varpack_schema::{Manifest, ModuleId};

use crate::collector::VariantArtifact;
use crate::error::ManifestMismatchError;

/// Check that all `manifests` agree with the first one.
///
/// Stops at the first disagreement. An empty or single-element input
/// always passes.
///
/// # Errors
///
/// Returns [`ManifestMismatchError`] naming the reference and the
/// conflicting source together with both projections.
pub fn reconcile(
    module: &ModuleId,
    manifests: &[(&Path, &Manifest)],
) -> Result<(), ManifestMismatchError> {
    let Some(((reference_path, reference), rest)) = manifests.split_first() else {
        return Ok(());
    };
    let expected = reference.platform_neutral();

    for (path, manifest) in rest {
        let actual = manifest.platform_neutral();
        if actual != expected {
            return Err(ManifestMismatchError {
                module: module.clone(),
                reference: reference_path.to_path_buf(),
                conflicting: path.to_path_buf(),
                differing_keys: differing_keys(&expected, &actual),
                reference_projection: render(&expected),
                conflicting_projection: render(&actual),
            });
        }
    }
    Ok(())
}

/// Reconcile the embedded manifests of collected package artifacts.
/// Library artifacts carry no manifest and are ignored.
///
/// # Errors
///
/// See [`reconcile`].
pub fn reconcile_artifacts(
    module: &ModuleId,
    artifacts: &[VariantArtifact],
) -> Result<(), ManifestMismatchError> {
    let manifests: Vec<(&Path, &Manifest)> = artifacts
        .iter()
        .filter_map(|a| a.manifest().map(|m| (a.path(), m)))
        .collect();
    reconcile(module, &manifests)
}

fn differing_keys(expected: &Value, actual: &Value) -> Vec<String> {
    let (Some(a), Some(b)) = (expected.as_object(), actual.as_object()) else {
        return Vec::new();
    };
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    keys.into_iter()
        .filter(|k| a.get(k.as_str()) != b.get(k.as_str()))
        .cloned()
        .collect()
}

fn render(value: &Value) -> String {
    // serde_json maps iterate in sorted key order, so this output is stable.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        Manifest::try_from(value).unwrap()
    }

    fn wallet(version: &str, main: &str) -> Manifest {
        manifest(json!({
            "name": "wallet",
            "version": version,
            "dependencies": ["crypto", "storage"],
            "main": main
        }))
    }

    #[test]
    fn test_main_differences_are_accepted() {
        let linux = wallet("1.0.0", "libwallet.so");
        let darwin = wallet("1.0.0", "libwallet.dylib");
        let module = ModuleId::new("wallet");

        reconcile(
            &module,
            &[
                (Path::new("linux/wallet.vpk"), &linux),
                (Path::new("darwin/wallet.vpk"), &darwin),
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let a = manifest(json!({"name": "wallet", "category": "finance"}));
        let b: Manifest =
            serde_json::from_str(r#"{"category": "finance", "name": "wallet"}"#).unwrap();
        reconcile(
            &ModuleId::new("wallet"),
            &[(Path::new("a"), &a), (Path::new("b"), &b)],
        )
        .unwrap();
    }

    #[test]
    fn test_version_mismatch_reports_both_paths() {
        let linux = wallet("1.0.0", "libwallet");
        let darwin = wallet("1.0.1", "libwallet");
        let err = reconcile(
            &ModuleId::new("wallet"),
            &[
                (Path::new("linux/wallet.vpk"), &linux),
                (Path::new("darwin/wallet.vpk"), &darwin),
            ],
        )
        .unwrap_err();

        assert_eq!(err.reference, Path::new("linux/wallet.vpk"));
        assert_eq!(err.conflicting, Path::new("darwin/wallet.vpk"));
        assert_eq!(err.differing_keys, vec!["version"]);
        assert!(err.reference_projection.contains("\"1.0.0\""));
        assert!(err.conflicting_projection.contains("\"1.0.1\""));
        assert!(!err.conflicting_projection.contains("main"));

        let message = err.to_string();
        assert!(message.contains("linux/wallet.vpk"));
        assert!(message.contains("darwin/wallet.vpk"));
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = manifest(json!({"dependencies": ["crypto", "storage"]}));
        let b = manifest(json!({"dependencies": ["storage", "crypto"]}));
        let err = reconcile(
            &ModuleId::new("wallet"),
            &[(Path::new("a"), &a), (Path::new("b"), &b)],
        )
        .unwrap_err();
        assert_eq!(err.differing_keys, vec!["dependencies"]);
    }

    #[test]
    fn test_key_present_on_one_side_only() {
        let a = manifest(json!({"name": "wallet"}));
        let b = manifest(json!({"name": "wallet", "author": "someone"}));
        let err = reconcile(
            &ModuleId::new("wallet"),
            &[(Path::new("a"), &a), (Path::new("b"), &b)],
        )
        .unwrap_err();
        assert_eq!(err.differing_keys, vec!["author"]);
    }

    #[test]
    fn test_stops_at_first_mismatch() {
        let reference = wallet("1.0.0", "x");
        let same = wallet("1.0.0", "y");
        let first_bad = wallet("2.0.0", "x");
        let second_bad = wallet("3.0.0", "x");
        let err = reconcile(
            &ModuleId::new("wallet"),
            &[
                (Path::new("ref"), &reference),
                (Path::new("same"), &same),
                (Path::new("first"), &first_bad),
                (Path::new("second"), &second_bad),
            ],
        )
        .unwrap_err();
        assert_eq!(err.conflicting, Path::new("first"));
    }

    #[test]
    fn test_empty_and_single_pass() {
        let module = ModuleId::new("wallet");
        reconcile(&module, &[]).unwrap();
        let only = wallet("1.0.0", "x");
        reconcile(&module, &[(Path::new("only"), &only)]).unwrap();
    }
}
