// gait-regress/src/fixture.rs
// ============================================================================
// Module: Fixture Capture
// Description: The captured baseline a regression run replays against.
// Purpose: Implement `spec.md` §4.11 Init: snapshot a built runpack's digest
// set so later runs can be checked for bit-for-bit stability.
// Dependencies: gait-core, gait-pack, gait-schema
// ============================================================================

//! ## Overview
//! Adapted from the teacher's golden-runpack tests, which compare a freshly
//! exported runpack byte-for-byte against a committed golden copy rather
//! than re-running the scenario engine. [`Fixture`] generalizes that
//! comparison from raw bytes to the manifest's own per-entry digests, so a
//! fixture records exactly what [`gait_pack::verify_pack`] already computes
//! and a later replay only has to recompute and diff, never re-derive.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use gait_pack::PackError;
use serde::Deserialize;
use serde::Serialize;

use crate::RegressError;

/// Whether a fixture's capture recorded context fingerprints for
/// [`crate::context_conformance`] checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Only archive-entry digests were captured.
    Standard,
    /// Archive-entry digests and per-intent `context` fingerprints were captured.
    ContextConformance,
}

/// A single fixture: one captured runpack plus the digest baseline to
/// replay it against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    /// The run this fixture was captured from.
    pub run_id: String,
    /// Path to the captured runpack archive, relative to the fixture's own directory.
    pub runpack_file: String,
    /// The manifest's `pack_id` at capture time.
    pub pack_id: String,
    /// Per-entry digest baseline, keyed by archive path.
    pub entry_digests: BTreeMap<String, String>,
    /// Exit code a replay of this fixture is expected to produce.
    #[serde(default)]
    pub expected_replay_exit_code: i32,
    /// Whether `context_fingerprints` was populated at capture time.
    pub capture_mode: CaptureMode,
    /// Captured intent `context` objects, keyed by intent archive path, used
    /// by [`crate::context_conformance`] to classify replay drift.
    #[serde(default)]
    pub context_fingerprints: BTreeMap<String, serde_json::Value>,
}

const FIXTURE_FILE: &str = "fixture.json";
const RUNPACK_FILE: &str = "runpack.zip";

impl Fixture {
    /// Captures a fixture from an already-built runpack archive and writes
    /// it under `fixtures_root/<run_id>/`.
    ///
    /// # Errors
    ///
    /// Returns [`RegressError`] if the archive fails manifest parsing or the
    /// fixture directory cannot be written.
    pub fn capture(
        fixtures_root: &Path,
        run_id: &str,
        archive: &[u8],
        context_fingerprints: BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, RegressError> {
        let report = gait_pack::verify_pack(archive, gait_pack::VerifyOptions::default()).map_err(RegressError::Pack)?;
        if !report.integrity_ok() {
            return Err(RegressError::Pack(PackError::MissingManifest));
        }
        let pack_id = manifest_pack_id(archive)?;
        let entry_digests = entry_digest_map(archive)?;
        let capture_mode = if context_fingerprints.is_empty() { CaptureMode::Standard } else { CaptureMode::ContextConformance };

        let fixture = Self {
            run_id: run_id.to_string(),
            runpack_file: RUNPACK_FILE.to_string(),
            pack_id,
            entry_digests,
            expected_replay_exit_code: 0,
            capture_mode,
            context_fingerprints,
        };

        let dir = fixture_dir(fixtures_root, run_id);
        std::fs::create_dir_all(&dir).map_err(|err| RegressError::Io(err.to_string()))?;
        gait_core::write_file_atomic(&dir.join(RUNPACK_FILE), archive).map_err(RegressError::Fs)?;
        let bytes = serde_json::to_vec_pretty(&fixture).map_err(|err| RegressError::Io(err.to_string()))?;
        gait_core::write_file_atomic(&dir.join(FIXTURE_FILE), &bytes).map_err(RegressError::Fs)?;
        Ok(fixture)
    }

    /// Loads a previously captured fixture from `fixtures_root/<run_id>/`.
    ///
    /// # Errors
    ///
    /// Returns [`RegressError`] if the fixture directory is missing or its
    /// `fixture.json` fails to parse.
    pub fn load(fixtures_root: &Path, run_id: &str) -> Result<Self, RegressError> {
        let dir = fixture_dir(fixtures_root, run_id);
        let bytes = std::fs::read(dir.join(FIXTURE_FILE)).map_err(|err| RegressError::Io(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| RegressError::Io(err.to_string()))
    }

    /// Reads this fixture's captured runpack archive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RegressError`] if the archive file cannot be read.
    pub fn read_runpack(&self, fixtures_root: &Path) -> Result<Vec<u8>, RegressError> {
        let path = fixture_dir(fixtures_root, &self.run_id).join(&self.runpack_file);
        std::fs::read(&path).map_err(|err| RegressError::Io(err.to_string()))
    }
}

/// Directory holding one fixture's captured files.
#[must_use]
pub fn fixture_dir(fixtures_root: &Path, run_id: &str) -> PathBuf {
    fixtures_root.join(run_id)
}

fn entry_digest_map(archive: &[u8]) -> Result<BTreeMap<String, String>, RegressError> {
    let entries = gait_core::read_entries(archive, gait_pack::MAX_ENTRY_BYTES).map_err(RegressError::Zip)?;
    let mut map = BTreeMap::new();
    for entry in entries {
        let digest = gait_core::digest_hex(gait_core::DEFAULT_HASH_ALGORITHM, &entry.contents);
        map.insert(entry.name, digest.as_str().to_string());
    }
    Ok(map)
}

/// Reads the manifest's `pack_id` out of an archive without verifying it.
fn manifest_pack_id(archive: &[u8]) -> Result<String, RegressError> {
    let entries = gait_core::read_entries(archive, gait_pack::MAX_ENTRY_BYTES).map_err(RegressError::Zip)?;
    let manifest_entry = entries.iter().find(|entry| entry.name == gait_pack::MANIFEST_PATH).ok_or(RegressError::Pack(PackError::MissingManifest))?;
    let manifest = gait_schema::pack::PackManifest::parse(&manifest_entry.contents).map_err(|err| RegressError::Pack(PackError::Schema(err.to_string())))?;
    Ok(manifest.pack_id)
}
