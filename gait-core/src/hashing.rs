// gait-core/src/hashing.rs
// ============================================================================
// Module: Digest Primitives
// Description: SHA-256 hex digesting over canonical JSON and raw bytes.
// Purpose: Provide the sole source of digest values used by traces, packs,
// and approval/delegation binding.
// Dependencies: crate::canonical, serde, sha2
// ============================================================================

//! ## Overview
//! All digests in Gait are lowercase hex SHA-256. Digests over a record are
//! always taken over its JCS canonical form with any `signatures` field
//! omitted, per `spec.md` §3; this module only provides the primitive, the
//! signature-stripping is the caller's responsibility (see
//! `gait-ledger::trace` and `gait-pack::manifest`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::canonical::CanonicalError;
use crate::canonical::canonical_json_bytes;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for Gait artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing (the only algorithm `spec.md` names).
    Sha256,
}

/// Default hash algorithm for Gait, used wherever `spec.md` does not name one.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// A lowercase hex-encoded content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashDigest(String);

impl HashDigest {
    /// Wraps an already-computed lowercase hex digest string.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HashDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Hashes raw bytes using the given algorithm, returning a lowercase hex digest.
#[must_use]
pub fn digest_hex(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            HashDigest(hex_encode(&hasher.finalize()))
        }
    }
}

/// Hashes the JCS canonical form of a serializable value.
///
/// # Errors
///
/// Returns [`CanonicalError`] when canonicalization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, CanonicalError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(digest_hex(algorithm, &bytes))
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::HashAlgorithm;
    use super::digest_hex;
    use super::hash_canonical_json;
    use serde_json::json;

    #[test]
    fn digest_is_deterministic() {
        let a = digest_hex(HashAlgorithm::Sha256, b"hello");
        let b = digest_hex(HashAlgorithm::Sha256, b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_of_empty_matches_known_sha256() {
        let digest = digest_hex(HashAlgorithm::Sha256, b"");
        assert_eq!(
            digest.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn hash_canonical_json_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        let digest_a = hash_canonical_json(HashAlgorithm::Sha256, &a).unwrap();
        let digest_b = hash_canonical_json(HashAlgorithm::Sha256, &b).unwrap();
        assert_eq!(digest_a, digest_b);
    }
}
