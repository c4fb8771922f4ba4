// gait-registry/src/list.rs
// ============================================================================
// Module: Registry List
// Description: Enumerates cached pack versions and cross-references pins.
// Purpose: Implement `spec.md` §4.9's `List` operation.
// Dependencies: gait-schema, std::fs
// ============================================================================

//! ## Overview
//! Walks the `<cache>/<pack_name>/<pack_version>/<digest>/` layout
//! [`crate::install::install`] writes and reports, for each cached entry,
//! whether it matches the pin currently recorded in `<cache>/pins/`. A
//! cached entry with no matching pin is still listed, just reported
//! unpinned, since an operator may keep multiple installed versions around.

use std::path::Path;
use std::path::PathBuf;

use crate::RegistryError;

/// One cached pack version discovered under the cache root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CachedEntry {
    /// Name of the cached pack.
    pub pack_name: String,
    /// Version of the cached pack.
    pub pack_version: String,
    /// Content digest of the cached manifest.
    pub digest: String,
    /// Path to the cached `registry_pack.json`.
    pub path: PathBuf,
    /// Whether `digest` matches the pin currently recorded for `pack_name`.
    pub pin_verified: bool,
}

/// Lists every pack version cached under `cache_dir`.
///
/// # Errors
///
/// Returns [`RegistryError::Cache`] if `cache_dir` cannot be read.
pub fn list(cache_dir: &Path) -> Result<Vec<CachedEntry>, RegistryError> {
    let pins = read_pins(cache_dir);
    let mut entries = Vec::new();
    let pack_dirs = match std::fs::read_dir(cache_dir) {
        Ok(dirs) => dirs,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
        Err(err) => return Err(RegistryError::Cache(err.to_string())),
    };
    for pack_dir in pack_dirs.filter_map(Result::ok) {
        let pack_name = pack_dir.file_name().to_string_lossy().into_owned();
        if pack_name == "pins" || !pack_dir.path().is_dir() {
            continue;
        }
        for version_dir in read_subdirs(&pack_dir.path()) {
            let pack_version = version_dir.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
            for digest_dir in read_subdirs(&version_dir) {
                let digest = digest_dir.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
                let manifest_path = digest_dir.join("registry_pack.json");
                if !manifest_path.is_file() {
                    continue;
                }
                let pin_verified = pins.get(&pack_name).is_some_and(|pinned_digest| pinned_digest == &digest);
                entries.push(CachedEntry { pack_name: pack_name.clone(), pack_version: pack_version.clone(), digest, path: manifest_path, pin_verified });
            }
        }
    }
    entries.sort();
    Ok(entries)
}

fn read_subdirs(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir).into_iter().flatten().filter_map(Result::ok).map(|entry| entry.path()).filter(|path| path.is_dir()).collect()
}

fn read_pins(cache_dir: &Path) -> std::collections::BTreeMap<String, String> {
    let pins_dir = cache_dir.join("pins");
    let mut pins = std::collections::BTreeMap::new();
    let Ok(entries) = std::fs::read_dir(&pins_dir) else {
        return pins;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Some(pack_name) = path.file_stem().map(|name| name.to_string_lossy().into_owned()) else {
            continue;
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        let digest = contents.trim().strip_prefix("sha256:").unwrap_or(contents.trim()).to_string();
        pins.insert(pack_name, digest);
    }
    pins
}

#[cfg(test)]
mod tests {
    use super::list;

    #[test]
    fn lists_cached_entries_and_pin_status() {
        let cache_dir = tempfile::tempdir().unwrap();
        let digest_dir = cache_dir.path().join("demo-pack").join("1.0.0").join("d".repeat(64));
        std::fs::create_dir_all(&digest_dir).unwrap();
        std::fs::write(digest_dir.join("registry_pack.json"), b"{}").unwrap();
        let pins_dir = cache_dir.path().join("pins");
        std::fs::create_dir_all(&pins_dir).unwrap();
        std::fs::write(pins_dir.join("demo-pack.pin"), format!("sha256:{}\n", "d".repeat(64))).unwrap();

        let entries = list(cache_dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].pin_verified);
    }

    #[test]
    fn reports_unpinned_entries_without_failing() {
        let cache_dir = tempfile::tempdir().unwrap();
        let digest_dir = cache_dir.path().join("demo-pack").join("1.0.0").join("e".repeat(64));
        std::fs::create_dir_all(&digest_dir).unwrap();
        std::fs::write(digest_dir.join("registry_pack.json"), b"{}").unwrap();

        let entries = list(cache_dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].pin_verified);
    }

    #[test]
    fn missing_cache_dir_returns_empty_list() {
        let cache_dir = tempfile::tempdir().unwrap();
        let missing = cache_dir.path().join("does-not-exist");
        let entries = list(&missing).unwrap();
        assert!(entries.is_empty());
    }
}
