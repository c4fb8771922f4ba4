// gait-registry/src/verify.rs
// ============================================================================
// Module: Registry Verify
// Description: Re-validates a previously installed manifest against a trust
// key and, optionally, the cache's recorded pin.
// Purpose: Implement `spec.md` §4.9's `Verify` operation.
// Dependencies: gait-core, gait-schema, crate::install
// ============================================================================

//! ## Overview
//! [`verify`] performs the same checks [`crate::install::install`] performs
//! before persisting, but against an already-cached manifest and without
//! fetching anything: reparse, recompute `signable_digest`, recheck
//! signatures, and if a pin exists for the pack name, cross-check it.

use std::path::Path;

use gait_core::hashing::DEFAULT_HASH_ALGORITHM;
use gait_core::hashing::HashDigest;
use gait_core::hashing::hash_canonical_json;
use gait_core::signing::PublicKey;
use gait_core::signing::Signature;
use gait_schema::RegistryManifest;

use crate::RegistryError;
use crate::install::key_id_for;

/// Result of re-verifying an installed manifest.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// The reparsed manifest.
    pub manifest: RegistryManifest,
    /// Recomputed `signable_digest`.
    pub signable_digest: String,
    /// Whether at least one signature verified against the supplied key.
    pub signature_verified: bool,
    /// Whether the cache's recorded pin (if any) matches `signable_digest`'s
    /// underlying `digest`. `None` when no pin is recorded or no cache
    /// directory was supplied.
    pub pin_verified: Option<bool>,
}

/// Re-verifies the manifest at `metadata_path`.
///
/// # Errors
///
/// Returns [`RegistryError`] if the file cannot be read or fails strict
/// parse.
pub fn verify(metadata_path: &Path, cache_dir: Option<&Path>, public_key: &PublicKey) -> Result<VerifyReport, RegistryError> {
    let bytes = std::fs::read(metadata_path).map_err(|err| RegistryError::Fetch(err.to_string()))?;
    let manifest = RegistryManifest::parse(&bytes).map_err(|err| RegistryError::Manifest(err.to_string()))?;

    let digest: HashDigest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &manifest.unsigned()).map_err(|err| RegistryError::Manifest(err.to_string()))?;
    let signable_digest = digest.as_str().to_string();
    let expected_key_id = key_id_for(public_key);
    let signature_verified = manifest.signatures.iter().any(|candidate| {
        candidate.key_id == expected_key_id
            && candidate.signed_digest == signable_digest
            && Signature::from_base64(&candidate.sig).is_ok_and(|sig| public_key.verify_digest(&digest, &sig).is_ok())
    });

    let pin_verified = cache_dir.map(|dir| pin_matches(dir, &manifest.pack_name, &manifest.digest));

    Ok(VerifyReport { manifest, signable_digest, signature_verified, pin_verified })
}

fn pin_matches(cache_dir: &Path, pack_name: &str, digest: &str) -> bool {
    let pin_path = cache_dir.join("pins").join(format!("{pack_name}.pin"));
    let Ok(contents) = std::fs::read_to_string(pin_path) else {
        return false;
    };
    let recorded = contents.trim().strip_prefix("sha256:").unwrap_or(contents.trim());
    recorded == digest
}

#[cfg(test)]
mod tests {
    use super::verify;
    use gait_core::signing::PrivateKey;
    use gait_schema::ManifestSignature;
    use gait_schema::RegistryManifest;

    fn signed_manifest(key: &PrivateKey) -> RegistryManifest {
        let unsigned = RegistryManifest { pack_name: "demo-pack".to_string(), pack_version: "1.0.0".to_string(), publisher: "acme".to_string(), digest: "f".repeat(64), signatures: Vec::new() };
        let digest = gait_core::hashing::hash_canonical_json(gait_core::hashing::DEFAULT_HASH_ALGORITHM, &unsigned).unwrap();
        let signature = key.sign_digest(&digest).unwrap();
        let key_id = super::key_id_for(&key.public_key());
        RegistryManifest {
            signatures: vec![ManifestSignature { alg: "ed25519".to_string(), key_id, sig: signature.to_base64(), signed_digest: digest.as_str().to_string() }],
            ..unsigned
        }
    }

    #[test]
    fn verify_confirms_valid_signature_and_reports_no_pin() {
        let dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let manifest_path = dir.path().join("registry_pack.json");
        std::fs::write(&manifest_path, serde_json::to_vec(&signed_manifest(&key)).unwrap()).unwrap();

        let report = verify(&manifest_path, None, &key.public_key()).unwrap();
        assert!(report.signature_verified);
        assert!(report.pin_verified.is_none());
    }

    #[test]
    fn verify_cross_checks_a_matching_pin() {
        let dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let manifest = signed_manifest(&key);
        let manifest_path = dir.path().join("registry_pack.json");
        std::fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();
        let pins_dir = dir.path().join("pins");
        std::fs::create_dir_all(&pins_dir).unwrap();
        std::fs::write(pins_dir.join("demo-pack.pin"), format!("sha256:{}\n", manifest.digest)).unwrap();

        let report = verify(&manifest_path, Some(dir.path()), &key.public_key()).unwrap();
        assert_eq!(report.pin_verified, Some(true));
    }

    #[test]
    fn verify_rejects_signature_from_wrong_key() {
        let dir = tempfile::tempdir().unwrap();
        let key = PrivateKey::generate();
        let other_key = PrivateKey::generate();
        let manifest_path = dir.path().join("registry_pack.json");
        std::fs::write(&manifest_path, serde_json::to_vec(&signed_manifest(&key)).unwrap()).unwrap();

        let report = verify(&manifest_path, None, &other_key.public_key()).unwrap();
        assert!(!report.signature_verified);
    }
}
