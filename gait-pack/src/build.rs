// gait-pack/src/build.rs
// ============================================================================
// Module: Pack Builder
// Description: Normalizes a typed record set into a manifest-first
// deterministic ZIP archive.
// Purpose: Implement `spec.md` §4.8 Build for every pack type.
// Dependencies: gait-core (zip, hashing, signing), gait-schema::pack
// ============================================================================

//! ## Overview
//! Mirrors the teacher's `RunpackBuilder::build`: digest each artifact,
//! accumulate a sorted entry list, derive a root identity (`pack_id`) from
//! the entry list plus the run ID, then emit the archive. Unlike the
//! teacher's hard-coded artifact set, [`build_pack`] accepts an arbitrary
//! [`PackFile`] list so every pack type (run/job/call/incident/evidence)
//! shares one code path; the `build_*_pack` helpers assemble that list from
//! typed records using this crate's own layout convention.

use gait_core::DEFAULT_HASH_ALGORITHM;
use gait_core::PrivateKey;
use gait_core::ZipWriter;
use gait_core::digest_hex;
use gait_core::hash_canonical_json;
use gait_schema::Event;
use gait_schema::IntentRequest;
use gait_schema::JobState;
use gait_schema::TraceRecord;
use gait_schema::pack::EntryType;
use gait_schema::pack::ManifestEntry;
use gait_schema::pack::PackManifest;
use gait_schema::pack::PackType;

use crate::MANIFEST_PATH;
use crate::PackError;
use crate::SIGNATURE_PATH;
use crate::refs::RunpackRef;

/// One file destined for a pack archive, prior to manifest assembly.
#[derive(Debug, Clone)]
pub struct PackFile {
    /// Path within the archive.
    pub path: String,
    /// The file's declared content type.
    pub entry_type: EntryType,
    /// Raw bytes to store.
    pub bytes: Vec<u8>,
}

impl PackFile {
    /// Builds a JSON pack file from a serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Digest`] if `value` cannot be canonicalized.
    pub fn json(path: impl Into<String>, value: &impl serde::Serialize) -> Result<Self, PackError> {
        let bytes = gait_core::canonical_json_bytes(value)?;
        Ok(Self { path: path.into(), entry_type: EntryType::Json, bytes })
    }

    /// Builds a JSONL pack file from pre-rendered lines.
    #[must_use]
    pub fn jsonl(path: impl Into<String>, lines: &[String]) -> Self {
        let mut bytes = Vec::new();
        for line in lines {
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
        Self { path: path.into(), entry_type: EntryType::Jsonl, bytes }
    }

    /// Builds an opaque binary pack file.
    #[must_use]
    pub fn binary(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), entry_type: EntryType::Binary, bytes }
    }
}

/// The built archive bytes plus the manifest describing them.
#[derive(Debug, Clone)]
pub struct BuiltPack {
    /// The pack's manifest.
    pub manifest: PackManifest,
    /// Complete deterministic ZIP bytes, including the manifest and, if
    /// signed, the detached signature entry.
    pub archive: Vec<u8>,
}

/// Builds a pack archive from an arbitrary record set.
///
/// Digests each file, produces a manifest sorted by path, derives
/// `pack_id`, writes a deterministic ZIP containing every file plus the
/// manifest, and signs the manifest digest when `signing_key` is given.
///
/// # Errors
///
/// Returns [`PackError::Zip`] if the archive cannot be assembled,
/// [`PackError::Digest`] if the manifest cannot be canonicalized, or
/// [`PackError::Sign`] if signing fails.
pub fn build_pack(
    pack_type: PackType,
    run_id: Option<&str>,
    mut files: Vec<PackFile>,
    signing_key: Option<&PrivateKey>,
) -> Result<BuiltPack, PackError> {
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let entries: Vec<ManifestEntry> = files
        .iter()
        .map(|file| ManifestEntry {
            path: file.path.clone(),
            sha256: digest_hex(DEFAULT_HASH_ALGORITHM, &file.bytes).as_str().to_string(),
            entry_type: file.entry_type,
        })
        .collect();

    let pack_id = PackManifest::compute_pack_id(&entries, run_id.unwrap_or("no_run"))?;
    let manifest = PackManifest { pack_type, pack_id, run_id: run_id.map(str::to_string), entries };

    let mut writer = ZipWriter::new();
    for file in &files {
        writer.add_entry(&file.path, &file.bytes)?;
    }
    let manifest_bytes = gait_core::canonical_json_bytes(&manifest)?;
    writer.add_entry(MANIFEST_PATH, &manifest_bytes)?;

    if let Some(key) = signing_key {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &manifest)?;
        let signature = key.sign_digest(&digest)?;
        let sig_record = SignatureRecord { signer_public_key: key.public_key().to_base64(), signature: signature.to_base64() };
        let sig_bytes = gait_core::canonical_json_bytes(&sig_record)?;
        writer.add_entry(SIGNATURE_PATH, &sig_bytes)?;
    }

    let archive = writer.finish()?;
    Ok(BuiltPack { manifest, archive })
}

/// The signature entry stored alongside a signed manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct SignatureRecord {
    /// Base64-encoded public key of the signer.
    pub signer_public_key: String,
    /// Base64-encoded detached ed25519 signature over the manifest digest.
    pub signature: String,
}

/// Builds a run pack from its recorded intent/trace lineage.
///
/// # Errors
///
/// Returns [`PackError`] if any record cannot be canonicalized or the
/// archive cannot be assembled.
pub fn build_run_pack(
    run_id: &str,
    intents: &[IntentRequest],
    traces: &[TraceRecord],
    signing_key: Option<&PrivateKey>,
) -> Result<BuiltPack, PackError> {
    let mut files = Vec::with_capacity(intents.len() + traces.len());
    for (index, intent) in intents.iter().enumerate() {
        files.push(PackFile::json(format!("intents/{index:06}.json"), intent)?);
    }
    for (index, trace) in traces.iter().enumerate() {
        files.push(PackFile::json(format!("traces/{index:06}.json"), trace)?);
    }
    build_pack(PackType::Run, Some(run_id), files, signing_key)
}

/// Builds a job pack from its durable state and event journal.
///
/// # Errors
///
/// Returns [`PackError`] if the state cannot be canonicalized or the
/// archive cannot be assembled.
pub fn build_job_pack(state: &JobState, events: &[Event], signing_key: Option<&PrivateKey>) -> Result<BuiltPack, PackError> {
    let lines: Result<Vec<String>, PackError> =
        events.iter().map(|event| event.to_jsonl_line().map_err(PackError::from)).collect();
    let mut files = vec![PackFile::json("state.json", state)?];
    files.push(PackFile::jsonl("events.jsonl", &lines?));
    build_pack(PackType::Job, None, files, signing_key)
}

/// Builds a call pack from one evaluated intent, its trace, an optional
/// embedded runpack, and the speak-receipt chain leading to it.
///
/// # Errors
///
/// Returns [`PackError`] if a record cannot be canonicalized or the archive
/// cannot be assembled.
pub fn build_call_pack(
    run_id: &str,
    intent: &IntentRequest,
    trace: &TraceRecord,
    embedded_runpack: Option<&[u8]>,
    receipt_chain: &[TraceRecord],
    signing_key: Option<&PrivateKey>,
) -> Result<BuiltPack, PackError> {
    let mut files = vec![PackFile::json("intent.json", intent)?, PackFile::json("trace.json", trace)?];
    if let Some(runpack_bytes) = embedded_runpack {
        files.push(PackFile::binary("runpack.zip", runpack_bytes.to_vec()));
    }
    for (index, receipt) in receipt_chain.iter().enumerate() {
        files.push(PackFile::json(format!("receipts/{index:06}.json"), receipt)?);
    }
    build_pack(PackType::Call, Some(run_id), files, signing_key)
}

/// Builds an incident pack referencing prior runpacks plus supplemental
/// evidence content.
///
/// # Errors
///
/// Returns [`PackError`] if `refs` cannot be canonicalized or the archive
/// cannot be assembled.
pub fn build_incident_pack(
    refs: &[RunpackRef],
    content: Vec<PackFile>,
    signing_key: Option<&PrivateKey>,
) -> Result<BuiltPack, PackError> {
    build_referencing_pack(PackType::Incident, refs, content, signing_key)
}

/// Builds an evidence pack referencing prior runpacks plus supplemental
/// evidence content.
///
/// # Errors
///
/// Returns [`PackError`] if `refs` cannot be canonicalized or the archive
/// cannot be assembled.
pub fn build_evidence_pack(
    refs: &[RunpackRef],
    content: Vec<PackFile>,
    signing_key: Option<&PrivateKey>,
) -> Result<BuiltPack, PackError> {
    build_referencing_pack(PackType::Evidence, refs, content, signing_key)
}

fn build_referencing_pack(
    pack_type: PackType,
    refs: &[RunpackRef],
    mut content: Vec<PackFile>,
    signing_key: Option<&PrivateKey>,
) -> Result<BuiltPack, PackError> {
    let summary = crate::refs::summarize_refs(refs);
    content.push(PackFile::json("refs.json", &summary)?);
    build_pack(pack_type, None, content, signing_key)
}

#[cfg(test)]
mod tests {
    use super::PackFile;
    use super::build_pack;
    use gait_core::PrivateKey;
    use gait_core::read_entries;
    use gait_schema::pack::PackType;

    #[test]
    fn entries_end_up_sorted_by_path_regardless_of_input_order() {
        let files = vec![PackFile::binary("b.bin", vec![1]), PackFile::binary("a.bin", vec![2])];
        let built = build_pack(PackType::Run, Some("run_1"), files, None).expect("build");
        assert_eq!(built.manifest.entries[0].path, "a.bin");
        assert_eq!(built.manifest.entries[1].path, "b.bin");
    }

    #[test]
    fn unsigned_pack_has_no_signature_entry() {
        let built = build_pack(PackType::Run, Some("run_1"), vec![], None).expect("build");
        let entries = read_entries(&built.archive, 1024).expect("read");
        assert!(!entries.iter().any(|entry| entry.name == crate::SIGNATURE_PATH));
    }

    #[test]
    fn signed_pack_carries_a_signature_entry() {
        let key = PrivateKey::generate();
        let built = build_pack(PackType::Run, Some("run_1"), vec![], Some(&key)).expect("build");
        let entries = read_entries(&built.archive, 1024).expect("read");
        assert!(entries.iter().any(|entry| entry.name == crate::SIGNATURE_PATH));
    }

    #[test]
    fn same_inputs_produce_byte_identical_archives() {
        let files = || vec![PackFile::binary("a.bin", vec![1, 2, 3])];
        let first = build_pack(PackType::Run, Some("run_1"), files(), None).expect("build");
        let second = build_pack(PackType::Run, Some("run_1"), files(), None).expect("build");
        assert_eq!(first.archive, second.archive);
    }
}
