// gait-schema/src/pack.rs
// ============================================================================
// Module: Pack Manifest
// Description: The manifest shape shared by runpacks and the unified pack
// envelope.
// Purpose: Strict-parse and validate manifest records per `spec.md` §3/§4.8.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every pack `gait-pack` builds carries a [`PackManifest`] listing its
//! entries in ascending path order with a per-entry SHA-256 and type tag.
//! This module owns the manifest shape and the `pack_type` discriminator;
//! the ZIP container and signature logic live in `gait-pack` and `gait-core`.

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;

/// The kind of pack a manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackType {
    /// A single run's captured intents and results.
    Run,
    /// A job's full state and event journal.
    Job,
    /// A tool call plus its speak-receipt chain.
    Call,
    /// An incident bundle referencing prior packs.
    Incident,
    /// An evidence bundle referencing prior packs.
    Evidence,
}

/// The declared type of one manifest entry's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// A JSON document.
    Json,
    /// A newline-delimited JSON stream.
    Jsonl,
    /// An opaque binary blob.
    Binary,
}

/// One entry in a pack manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Path within the archive.
    pub path: String,
    /// Lowercase hex SHA-256 of the entry's uncompressed bytes.
    pub sha256: String,
    /// The entry's content type.
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// The manifest carried by every pack, listing its entries in ascending
/// path order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackManifest {
    /// The pack's type.
    pub pack_type: PackType,
    /// Stable identifier of the form `pack_<hex>`.
    pub pack_id: String,
    /// The run this pack was captured from, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Manifest entries, sorted by `path`.
    pub entries: Vec<ManifestEntry>,
}

impl PackManifest {
    /// Strict-parses a manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON, an empty `pack_id`, or
    /// entries not sorted by path.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validates that `pack_id` is non-empty and entries are sorted by path.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] on the first violation found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.pack_id.trim().is_empty() {
            return Err(SchemaError::Invalid("pack_id must be non-empty".to_string()));
        }
        for pair in self.entries.windows(2) {
            if pair[0].path >= pair[1].path {
                return Err(SchemaError::Invalid(format!(
                    "manifest entries not sorted by path: {} >= {}",
                    pair[0].path, pair[1].path
                )));
            }
        }
        Ok(())
    }

    /// Computes the stable `pack_id` for a manifest body digest and run ID,
    /// per `spec.md` §4.8: `"pack_" + hex(SHA-256(canonical(manifest.contents) || run_id))`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the entry list cannot be canonicalized.
    pub fn compute_pack_id(entries: &[ManifestEntry], run_id: &str) -> Result<String, SchemaError> {
        let mut bytes =
            gait_core::canonical_json_bytes(entries).map_err(|err| SchemaError::Invalid(err.to_string()))?;
        bytes.extend_from_slice(run_id.as_bytes());
        let digest = gait_core::digest_hex(gait_core::DEFAULT_HASH_ALGORITHM, &bytes);
        Ok(format!("pack_{digest}"))
    }
}

#[cfg(test)]
mod tests {
    use super::EntryType;
    use super::ManifestEntry;
    use super::PackManifest;

    fn entry(path: &str) -> ManifestEntry {
        ManifestEntry { path: path.to_string(), sha256: "a".repeat(64), entry_type: EntryType::Json }
    }

    #[test]
    fn rejects_unsorted_entries() {
        let manifest = PackManifest {
            pack_type: super::PackType::Run,
            pack_id: "pack_abc".to_string(),
            run_id: Some("run_1".to_string()),
            entries: vec![entry("b.json"), entry("a.json")],
        };
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn accepts_sorted_entries() {
        let manifest = PackManifest {
            pack_type: super::PackType::Run,
            pack_id: "pack_abc".to_string(),
            run_id: Some("run_1".to_string()),
            entries: vec![entry("a.json"), entry("b.json")],
        };
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn pack_id_is_deterministic() {
        let entries = vec![entry("a.json")];
        let first = PackManifest::compute_pack_id(&entries, "run_1").unwrap();
        let second = PackManifest::compute_pack_id(&entries, "run_1").unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("pack_"));
    }
}
