// gait-pack/src/diff.rs
// ============================================================================
// Module: Pack Diff
// Description: Compares two same-type packs by manifest entry and, for JSON
// entries, by top-level payload field.
// Purpose: Implement `spec.md` §4.8 Diff.
// Dependencies: gait-core::zip, gait-schema::pack, serde_json
// ============================================================================

//! ## Overview
//! Entry-level comparison mirrors [`crate::verify::verify_pack`]'s manifest
//! walk; payload-level comparison is new, since the teacher's runpack
//! verifier only ever compares one manifest against its own archive, never
//! two manifests against each other.

use gait_schema::pack::PackManifest;
use serde_json::Value;

use crate::MANIFEST_PATH;
use crate::MAX_ENTRY_BYTES;
use crate::PackError;

/// One entry-level change between two packs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ManifestChange {
    /// Path of the changed entry.
    pub path: String,
    /// Field-level differences, for JSON entries whose top-level object
    /// fields changed; empty for non-JSON entries or non-object payloads.
    pub field_diffs: Vec<String>,
}

/// The result of comparing two packs of the same type.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PackDiff {
    /// Paths present only in the second pack.
    pub added: Vec<String>,
    /// Paths present only in the first pack.
    pub removed: Vec<String>,
    /// Paths present in both packs with a different digest.
    pub changed: Vec<ManifestChange>,
}

/// Compares two packs of the same [`gait_schema::pack::PackType`].
///
/// # Errors
///
/// Returns [`PackError::Zip`] if either archive cannot be parsed,
/// [`PackError::MissingManifest`] if either has no manifest entry, and
/// [`PackError::TypeMismatch`] if the two packs are of different types.
pub fn diff_pack(first: &[u8], second: &[u8]) -> Result<PackDiff, PackError> {
    let (first_manifest, first_entries) = load(first)?;
    let (second_manifest, second_entries) = load(second)?;

    if first_manifest.pack_type != second_manifest.pack_type {
        return Err(PackError::TypeMismatch { expected: first_manifest.pack_type, found: second_manifest.pack_type });
    }

    let first_paths: std::collections::BTreeMap<&str, &str> =
        first_manifest.entries.iter().map(|entry| (entry.path.as_str(), entry.sha256.as_str())).collect();
    let second_paths: std::collections::BTreeMap<&str, &str> =
        second_manifest.entries.iter().map(|entry| (entry.path.as_str(), entry.sha256.as_str())).collect();

    let added: Vec<String> = second_paths.keys().filter(|path| !first_paths.contains_key(*path)).map(|path| (*path).to_string()).collect();
    let removed: Vec<String> = first_paths.keys().filter(|path| !second_paths.contains_key(*path)).map(|path| (*path).to_string()).collect();

    let mut changed = Vec::new();
    for (path, first_sha) in &first_paths {
        if let Some(second_sha) = second_paths.get(path) {
            if first_sha != second_sha {
                let field_diffs = diff_json_fields(&first_entries, &second_entries, path);
                changed.push(ManifestChange { path: (*path).to_string(), field_diffs });
            }
        }
    }

    Ok(PackDiff { added, removed, changed })
}

fn load(archive: &[u8]) -> Result<(PackManifest, Vec<gait_core::ZipEntry>), PackError> {
    let entries = gait_core::read_entries(archive, MAX_ENTRY_BYTES)?;
    crate::enforce_aggregate_limit(&entries)?;
    let manifest_entry = entries.iter().find(|entry| entry.name == MANIFEST_PATH).ok_or(PackError::MissingManifest)?;
    let manifest = PackManifest::parse(&manifest_entry.contents)?;
    Ok((manifest, entries))
}

fn diff_json_fields(first_entries: &[gait_core::ZipEntry], second_entries: &[gait_core::ZipEntry], path: &str) -> Vec<String> {
    let first_value = first_entries.iter().find(|entry| entry.name == path).and_then(|entry| serde_json::from_slice::<Value>(&entry.contents).ok());
    let second_value = second_entries.iter().find(|entry| entry.name == path).and_then(|entry| serde_json::from_slice::<Value>(&entry.contents).ok());

    match (first_value, second_value) {
        (Some(Value::Object(first_map)), Some(Value::Object(second_map))) => {
            let mut fields: std::collections::BTreeSet<&String> = first_map.keys().collect();
            fields.extend(second_map.keys());
            fields
                .into_iter()
                .filter(|field| first_map.get(*field) != second_map.get(*field))
                .map(|field| field.clone())
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::diff_pack;
    use crate::build::PackFile;
    use crate::build::build_pack;
    use gait_schema::pack::PackType;

    #[test]
    fn detects_added_and_removed_paths() {
        let first = build_pack(PackType::Run, Some("run_1"), vec![PackFile::binary("a.bin", vec![1])], None).expect("build");
        let second = build_pack(PackType::Run, Some("run_1"), vec![PackFile::binary("b.bin", vec![1])], None).expect("build");
        let diff = diff_pack(&first.archive, &second.archive).expect("diff");
        assert_eq!(diff.added, vec!["b.bin".to_string()]);
        assert_eq!(diff.removed, vec!["a.bin".to_string()]);
    }

    #[test]
    fn reports_changed_json_fields() {
        let first = build_pack(PackType::Run, Some("run_1"), vec![PackFile::json("a.json", &serde_json::json!({"x": 1, "y": 2})).unwrap()], None).expect("build");
        let second = build_pack(PackType::Run, Some("run_1"), vec![PackFile::json("a.json", &serde_json::json!({"x": 1, "y": 3})).unwrap()], None).expect("build");
        let diff = diff_pack(&first.archive, &second.archive).expect("diff");
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].field_diffs, vec!["y".to_string()]);
    }

    #[test]
    fn different_pack_types_fail_closed() {
        let run_pack = build_pack(PackType::Run, Some("run_1"), vec![], None).expect("build");
        let job_pack = build_pack(PackType::Job, None, vec![], None).expect("build");
        assert!(diff_pack(&run_pack.archive, &job_pack.archive).is_err());
    }
}
