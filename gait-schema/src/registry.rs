// gait-schema/src/registry.rs
// ============================================================================
// Module: Registry Manifest
// Description: The signed manifest `gait-registry` installs, lists, and
// verifies.
// Purpose: Strict-parse and validate `RegistryManifest` per `spec.md` §3/§4.9.
// Dependencies: gait-core, serde
// ============================================================================

//! ## Overview
//! A [`RegistryManifest`] names one published pack version and carries zero
//! or more [`ManifestSignature`]s. Per `spec.md` §4.2/§4.9, a signature
//! binds to `signable_digest`: the JCS-canonical digest of the manifest
//! with `signatures` cleared, exactly as [`TraceRecord::unsigned`] clears
//! `signature` before digesting. `gait-registry` owns fetching and cache
//! persistence; this module owns only the shape and the digest derivation.

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;

/// One detached signature over a manifest's `signable_digest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSignature {
    /// Signature algorithm; always `"ed25519"`.
    pub alg: String,
    /// First 16 hex characters of `hex(SHA-256(signer public key))`.
    pub key_id: String,
    /// Base64-encoded detached signature bytes.
    pub sig: String,
    /// Hex digest this signature was computed over.
    pub signed_digest: String,
}

/// The signed manifest published for one pack version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryManifest {
    /// Name of the published pack.
    pub pack_name: String,
    /// Version of the published pack.
    pub pack_version: String,
    /// Identity of the publisher.
    pub publisher: String,
    /// Content digest of the pack payload this manifest describes.
    pub digest: String,
    /// Signatures attesting to this manifest's `signable_digest`.
    #[serde(default)]
    pub signatures: Vec<ManifestSignature>,
}

impl RegistryManifest {
    /// Strict-parses a registry manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON or a failed
    /// [`RegistryManifest::validate`] check.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validates that `pack_name`, `pack_version`, and `digest` are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] on the first violation found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.pack_name.trim().is_empty() {
            return Err(SchemaError::Invalid("pack_name must be non-empty".to_string()));
        }
        if self.pack_version.trim().is_empty() {
            return Err(SchemaError::Invalid("pack_version must be non-empty".to_string()));
        }
        if self.digest.trim().is_empty() {
            return Err(SchemaError::Invalid("digest must be non-empty".to_string()));
        }
        Ok(())
    }

    /// Returns this manifest with `signatures` cleared, the projection
    /// `signable_digest` is computed over.
    #[must_use]
    pub fn unsigned(&self) -> Self {
        Self { signatures: Vec::new(), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::ManifestSignature;
    use super::RegistryManifest;

    fn manifest() -> RegistryManifest {
        RegistryManifest {
            pack_name: "demo-pack".to_string(),
            pack_version: "1.0.0".to_string(),
            publisher: "acme".to_string(),
            digest: "a".repeat(64),
            signatures: vec![ManifestSignature {
                alg: "ed25519".to_string(),
                key_id: "0".repeat(16),
                sig: "sig".to_string(),
                signed_digest: "b".repeat(64),
            }],
        }
    }

    #[test]
    fn unsigned_projection_clears_signatures() {
        let projected = manifest().unsigned();
        assert!(projected.signatures.is_empty());
        assert_eq!(projected.pack_name, "demo-pack");
    }

    #[test]
    fn rejects_empty_pack_name() {
        let mut invalid = manifest();
        invalid.pack_name = String::new();
        assert!(invalid.validate().is_err());
    }
}
