// gait-ledger/src/trace.rs
// ============================================================================
// Module: Trace Record Signing and Verification
// Description: Signs and verifies `TraceRecord`s emitted by the gate.
// Purpose: Keep key material out of `gait-policy`; the evaluator there signs
// through this crate's helpers when it is given a key.
// Dependencies: gait-core, gait-schema
// ============================================================================

//! ## Overview
//! A trace's digest is always taken over [`TraceRecord::unsigned`], matching
//! the convention every other signed record in this crate follows.

use gait_core::HashAlgorithm;
use gait_core::PrivateKey;
use gait_core::PublicKey;
use gait_schema::trace::TraceRecord;

use crate::LedgerError;

/// Returns a copy of `trace` with `signature` set to a fresh signature over
/// its unsigned canonical form.
///
/// # Errors
///
/// Returns [`LedgerError::Digest`] if canonicalization fails, or
/// [`LedgerError::SignatureInvalid`] if signing fails.
pub fn sign_trace(trace: &TraceRecord, signing_key: &PrivateKey) -> Result<TraceRecord, LedgerError> {
    let unsigned = trace.unsigned();
    let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &unsigned).map_err(|err| LedgerError::Digest(err.to_string()))?;
    let signature = signing_key.sign_digest(&digest)?;
    let mut signed = unsigned;
    signed.signature = Some(signature.to_base64());
    Ok(signed)
}

/// Verifies that `trace.signature` is a valid signature by `public_key` over
/// `trace.unsigned()`.
///
/// # Errors
///
/// Returns [`LedgerError::SignatureInvalid`] if the trace is unsigned, the
/// signature is malformed, or verification fails.
pub fn verify_trace(trace: &TraceRecord, public_key: &PublicKey) -> Result<(), LedgerError> {
    let Some(signature_base64) = &trace.signature else {
        return Err(LedgerError::SignatureInvalid("trace record carries no signature".to_string()));
    };
    let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &trace.unsigned()).map_err(|err| LedgerError::Digest(err.to_string()))?;
    let signature = gait_core::Signature::from_base64(signature_base64)?;
    public_key.verify_digest(&digest, &signature)?;
    Ok(())
}
