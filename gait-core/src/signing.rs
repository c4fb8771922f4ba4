// gait-core/src/signing.rs
// ============================================================================
// Module: Ed25519 Signing
// Description: Key loading and signature creation/verification over canonical
// JSON digests.
// Purpose: Bind trace records, approval tokens, and pack manifests to a key
// that is either an ephemeral dev key or an operator-supplied production key.
// Dependencies: crate::canonical, crate::hashing, base64, ed25519-dalek, rand
// ============================================================================

//! ## Overview
//! Gait signs the JCS canonical bytes of a digest, never the raw payload
//! directly, so verification never requires re-deriving the digest algorithm
//! choice. [`KeyMode::Dev`] generates an ephemeral in-memory keypair suitable
//! for `gait demo` and tests; [`KeyMode::Prod`] loads a key from a file path
//! or an environment variable, and the two sources are mutually exclusive by
//! construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as Base64;
use ed25519_dalek::Signer as _;
use ed25519_dalek::SigningKey;
use ed25519_dalek::Verifier as _;
use ed25519_dalek::VerifyingKey;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::canonical::canonical_json_bytes;
use crate::hashing::HashDigest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading keys or signing/verifying.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Both a key file path and a key environment variable were supplied.
    #[error("key source is ambiguous: both a file path and an environment variable were given")]
    AmbiguousKeySource,

    /// Neither a key file path nor a key environment variable was supplied in prod mode.
    #[error("no key source configured for production signing")]
    MissingKeySource,

    /// The key file exists but its POSIX permissions are more permissive than 0600.
    #[error("key file {path} has overly permissive mode {mode:o}, expected 0600 or stricter")]
    InsecureKeyPermissions {
        /// Path to the offending key file.
        path: String,
        /// Observed permission mode bits.
        mode: u32,
    },

    /// The key bytes could not be read or decoded.
    #[error("failed to load key: {0}")]
    KeyLoad(String),

    /// The key material was not a valid ed25519 key.
    #[error("invalid ed25519 key material")]
    InvalidKey,

    /// Serializing the digest into canonical JSON failed.
    #[error("failed to serialize digest for signing: {0}")]
    Canonicalization(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,

    /// The signature bytes were not a valid ed25519 signature.
    #[error("invalid signature bytes")]
    InvalidSignature,
}

// ============================================================================
// SECTION: Key Mode
// ============================================================================

/// Selects how signing keys are obtained.
#[derive(Debug, Clone)]
pub enum KeyMode {
    /// Generate a fresh, in-memory keypair. Never persisted to disk.
    Dev,
    /// Load a key from a file path.
    ProdFile(String),
    /// Decode a base64-encoded key from an environment variable's value.
    ProdEnvValue(String),
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// An ed25519 private signing key.
pub struct PrivateKey(SigningKey);

/// An ed25519 public verifying key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

/// A detached ed25519 signature over a hash digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

impl Signature {
    /// Returns the raw signature bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the signature base64-encoded, as stored in trace records.
    #[must_use]
    pub fn to_base64(&self) -> String {
        Base64.encode(&self.0)
    }

    /// Decodes a signature from base64.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidSignature`] when the input is not
    /// valid base64 or is not 64 bytes long.
    pub fn from_base64(value: &str) -> Result<Self, SigningError> {
        let bytes = Base64
            .decode(value)
            .map_err(|_err| SigningError::InvalidSignature)?;
        if bytes.len() != 64 {
            return Err(SigningError::InvalidSignature);
        }
        Ok(Self(bytes))
    }
}

impl PublicKey {
    /// Returns the public key base64-encoded.
    #[must_use]
    pub fn to_base64(&self) -> String {
        Base64.encode(self.0.as_bytes())
    }

    /// Decodes a public key from base64.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidKey`] when the input is not valid
    /// base64 or is not a valid ed25519 public key.
    pub fn from_base64(value: &str) -> Result<Self, SigningError> {
        let bytes = Base64
            .decode(value.trim())
            .map_err(|_err| SigningError::InvalidKey)?;
        let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_err| SigningError::InvalidKey)?;
        let key = VerifyingKey::from_bytes(&array).map_err(|_err| SigningError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Verifies a signature over a hash digest.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Canonicalization`] if the digest cannot be
    /// canonicalized, or [`SigningError::VerificationFailed`] if the
    /// signature does not verify.
    pub fn verify_digest(&self, digest: &HashDigest, signature: &Signature) -> Result<(), SigningError> {
        let message = canonical_json_bytes(digest).map_err(|err| SigningError::Canonicalization(err.to_string()))?;
        let raw: [u8; 64] = signature
            .0
            .as_slice()
            .try_into()
            .map_err(|_err| SigningError::InvalidSignature)?;
        let sig = ed25519_dalek::Signature::from_bytes(&raw);
        self.0
            .verify(&message, &sig)
            .map_err(|_err| SigningError::VerificationFailed)
    }
}

impl PrivateKey {
    /// Loads a key according to the given [`KeyMode`].
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::AmbiguousKeySource`], [`SigningError::MissingKeySource`],
    /// [`SigningError::InsecureKeyPermissions`], or [`SigningError::KeyLoad`]
    /// as appropriate for the mode.
    pub fn load(mode: &KeyMode) -> Result<Self, SigningError> {
        match mode {
            KeyMode::Dev => Ok(Self::generate()),
            KeyMode::ProdFile(path) => Self::load_from_file(path),
            KeyMode::ProdEnvValue(value) => Self::load_from_base64(value),
        }
    }

    /// Generates a fresh ephemeral keypair using the OS random source.
    #[must_use]
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    /// Returns the private key base64-encoded.
    #[must_use]
    pub fn to_base64(&self) -> String {
        Base64.encode(self.0.to_bytes())
    }

    /// Decodes a private key from base64.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidKey`] when the input is not valid
    /// base64 or is not a valid ed25519 private key.
    pub fn from_base64(value: &str) -> Result<Self, SigningError> {
        Self::load_from_base64(value)
    }

    /// Returns the public key corresponding to this private key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Signs a hash digest, returning a detached signature.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Canonicalization`] if the digest cannot be
    /// canonicalized.
    pub fn sign_digest(&self, digest: &HashDigest) -> Result<Signature, SigningError> {
        let message = canonical_json_bytes(digest).map_err(|err| SigningError::Canonicalization(err.to_string()))?;
        let signature = self.0.sign(&message);
        Ok(Signature(signature.to_bytes().to_vec()))
    }

    fn load_from_file(path: &str) -> Result<Self, SigningError> {
        let metadata = fs::metadata(path).map_err(|err| SigningError::KeyLoad(err.to_string()))?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            return Err(SigningError::InsecureKeyPermissions {
                path: path.to_string(),
                mode,
            });
        }
        let contents = fs::read_to_string(path).map_err(|err| SigningError::KeyLoad(err.to_string()))?;
        Self::load_from_base64(contents.trim())
    }

    fn load_from_base64(value: &str) -> Result<Self, SigningError> {
        let bytes = Base64.decode(value.trim()).map_err(|_err| SigningError::InvalidKey)?;
        let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_err| SigningError::InvalidKey)?;
        Ok(Self(SigningKey::from_bytes(&array)))
    }
}

/// Builds a [`KeyMode`] from mutually-exclusive file/env inputs, as the CLI
/// and service boundaries receive them.
///
/// # Errors
///
/// Returns [`SigningError::AmbiguousKeySource`] when both are `Some`, or
/// [`SigningError::MissingKeySource`] when both are `None` and `dev` is false.
pub fn resolve_key_mode(
    dev: bool,
    key_file: Option<&Path>,
    key_env_value: Option<String>,
) -> Result<KeyMode, SigningError> {
    if dev {
        return Ok(KeyMode::Dev);
    }
    match (key_file, key_env_value) {
        (Some(_), Some(_)) => Err(SigningError::AmbiguousKeySource),
        (Some(path), None) => Ok(KeyMode::ProdFile(path.to_string_lossy().into_owned())),
        (None, Some(value)) => Ok(KeyMode::ProdEnvValue(value)),
        (None, None) => Err(SigningError::MissingKeySource),
    }
}

#[cfg(test)]
mod tests {
    use super::KeyMode;
    use super::PrivateKey;
    use super::PublicKey;
    use super::resolve_key_mode;
    use crate::hashing::HashAlgorithm;
    use crate::hashing::digest_hex;

    #[test]
    fn dev_key_signs_and_verifies() {
        let key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let digest = digest_hex(HashAlgorithm::Sha256, b"payload");
        let signature = key.sign_digest(&digest).expect("sign");
        key.public_key().verify_digest(&digest, &signature).expect("verify");
    }

    #[test]
    fn tampered_digest_fails_verification() {
        let key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let digest = digest_hex(HashAlgorithm::Sha256, b"payload");
        let other = digest_hex(HashAlgorithm::Sha256, b"other-payload");
        let signature = key.sign_digest(&digest).expect("sign");
        assert!(key.public_key().verify_digest(&other, &signature).is_err());
    }

    #[test]
    fn public_key_roundtrips_through_base64() {
        let key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let encoded = key.public_key().to_base64();
        let decoded = PublicKey::from_base64(&encoded).expect("decode");
        assert_eq!(key.public_key(), decoded);
    }

    #[test]
    fn resolve_key_mode_rejects_both_sources() {
        let result = resolve_key_mode(false, Some(std::path::Path::new("/tmp/key")), Some("abc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn resolve_key_mode_rejects_no_sources() {
        let result = resolve_key_mode(false, None, None);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_key_mode_dev_short_circuits() {
        let mode = resolve_key_mode(true, None, None).expect("dev mode");
        assert!(matches!(mode, KeyMode::Dev));
    }
}
