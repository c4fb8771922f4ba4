// gait-pack/src/verify.rs
// ============================================================================
// Module: Pack Verifier
// Description: Offline integrity and signature verification for a built
// pack archive.
// Purpose: Implement `spec.md` §4.8 Verify.
// Dependencies: gait-core (zip, hashing, signing), gait-schema::pack
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `RunpackVerifier::verify_manifest`: recompute
//! every entry's hash from the archive bytes and compare against the
//! manifest, rather than trusting the manifest's claims. Signature handling
//! is new (the teacher's runpacks are unsigned) and follows the detached
//! `manifest.sig.json` convention [`crate::build::build_pack`] writes.

use gait_core::DEFAULT_HASH_ALGORITHM;
use gait_core::PublicKey;
use gait_core::digest_hex;
use gait_core::hash_canonical_json;
use gait_core::read_entries;
use gait_schema::pack::PackManifest;

use crate::MANIFEST_PATH;
use crate::MAX_ENTRY_BYTES;
use crate::PackError;
use crate::SIGNATURE_PATH;
use crate::build::SignatureRecord;

/// Outcome of checking a pack's detached signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// The signature was present and verified against the supplied key.
    Verified,
    /// The pack carries no signature entry.
    Missing,
    /// A signature was present but did not verify.
    Failed,
    /// A signature was present but no public key was supplied to check it.
    Skipped,
}

/// Options controlling [`verify_pack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions<'a> {
    /// Public key to verify the pack's signature against, if any.
    pub public_key: Option<&'a PublicKey>,
    /// Whether an unsigned pack should be treated as a verification error.
    pub require_signature: bool,
}

/// The report produced by [`verify_pack`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VerifyReport {
    /// Outcome of the signature check.
    pub signature_status: SignatureStatus,
    /// Whether the signature, if checked, was valid.
    pub signatures_valid: bool,
    /// Manifest entries absent from the archive.
    pub missing_files: Vec<String>,
    /// Manifest entries present but with a mismatched digest.
    pub hash_mismatches: Vec<String>,
    /// Archive entries not named by the manifest.
    pub extras: Vec<String>,
}

impl VerifyReport {
    /// Returns whether the archive matched its manifest with no tampering,
    /// irrespective of signature status.
    #[must_use]
    pub fn integrity_ok(&self) -> bool {
        self.missing_files.is_empty() && self.hash_mismatches.is_empty()
    }
}

/// Verifies a pack archive's manifest-to-content integrity and, if
/// requested, its detached signature.
///
/// # Errors
///
/// Returns [`PackError::Zip`] if the archive cannot be parsed,
/// [`PackError::MissingManifest`] if it has no `manifest.json` entry,
/// [`PackError::Schema`] if the manifest fails strict validation, and
/// [`PackError::SignatureRequired`] if `options.require_signature` is set
/// and the archive carries no signature.
pub fn verify_pack(archive: &[u8], options: VerifyOptions<'_>) -> Result<VerifyReport, PackError> {
    let entries = read_entries(archive, MAX_ENTRY_BYTES)?;
    crate::enforce_aggregate_limit(&entries)?;
    let manifest_entry = entries.iter().find(|entry| entry.name == MANIFEST_PATH).ok_or(PackError::MissingManifest)?;
    let manifest = PackManifest::parse(&manifest_entry.contents)?;

    let mut missing_files = Vec::new();
    let mut hash_mismatches = Vec::new();
    for manifest_item in &manifest.entries {
        match entries.iter().find(|entry| entry.name == manifest_item.path) {
            Some(found) => {
                let actual = digest_hex(DEFAULT_HASH_ALGORITHM, &found.contents);
                if actual.as_str() != manifest_item.sha256 {
                    hash_mismatches.push(manifest_item.path.clone());
                }
            }
            None => missing_files.push(manifest_item.path.clone()),
        }
    }

    let known_paths: std::collections::BTreeSet<&str> = manifest
        .entries
        .iter()
        .map(|entry| entry.path.as_str())
        .chain([MANIFEST_PATH, SIGNATURE_PATH])
        .collect();
    let extras: Vec<String> = entries.iter().map(|entry| entry.name.clone()).filter(|name| !known_paths.contains(name.as_str())).collect();

    let sig_entry = entries.iter().find(|entry| entry.name == SIGNATURE_PATH);
    let (signature_status, signatures_valid) = match sig_entry {
        None => {
            if options.require_signature {
                return Err(PackError::SignatureRequired);
            }
            (SignatureStatus::Missing, false)
        }
        Some(sig_entry) => match options.public_key {
            None => (SignatureStatus::Skipped, false),
            Some(public_key) => {
                let record: SignatureRecord = serde_json::from_slice(&sig_entry.contents).map_err(|err| PackError::Schema(err.to_string()))?;
                let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &manifest)?;
                let signature = gait_core::Signature::from_base64(&record.signature).map_err(|err| PackError::Sign(err.to_string()))?;
                match public_key.verify_digest(&digest, &signature) {
                    Ok(()) => (SignatureStatus::Verified, true),
                    Err(_err) => (SignatureStatus::Failed, false),
                }
            }
        },
    };

    Ok(VerifyReport { signature_status, signatures_valid, missing_files, hash_mismatches, extras })
}
