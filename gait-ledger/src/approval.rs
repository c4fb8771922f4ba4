// gait-ledger/src/approval.rs
// ============================================================================
// Module: Approval Token Minting and Verification
// Description: `MintApproval`/`VerifyApproval` from `spec.md` §4.7.
// Purpose: Produce and check signed approval tokens bound to an
// (intent_digest, policy_digest) pair.
// Dependencies: gait-core, gait-schema
// ============================================================================

//! ## Overview
//! Minting signs the token's canonical form with `signature` held empty;
//! verification recomputes that same digest and checks it against the
//! embedded signature. This mirrors [`gait_schema::trace::TraceRecord::unsigned`]
//! without a dedicated helper on `ApprovalToken`, since only this crate ever
//! needs the unsigned projection.

use gait_core::HashAlgorithm;
use gait_core::PrivateKey;
use gait_core::PublicKey;
use gait_core::Timestamp;
use gait_schema::tokens::ApprovalToken;

use crate::LedgerError;

/// Mints a signed [`ApprovalToken`] bound to `intent_digest`/`policy_digest`.
///
/// # Errors
///
/// Returns [`LedgerError::Digest`] if the unsigned token fails to
/// canonicalize, or [`LedgerError::SignatureInvalid`] if signing fails.
#[allow(clippy::too_many_arguments, reason = "mirrors the token's field set 1:1, a struct would only move the list")]
pub fn mint_approval(
    token_id: impl Into<String>,
    intent_digest: impl Into<String>,
    policy_digest: impl Into<String>,
    scope: Vec<String>,
    approver_identity: impl Into<String>,
    reason_code: impl Into<String>,
    expires_at: Timestamp,
    signing_key: &PrivateKey,
) -> Result<ApprovalToken, LedgerError> {
    let mut token = ApprovalToken {
        token_id: token_id.into(),
        intent_digest: intent_digest.into(),
        policy_digest: policy_digest.into(),
        scope,
        approver_identity: approver_identity.into(),
        reason_code: reason_code.into(),
        expires_at,
        signature: String::new(),
    };
    let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &token).map_err(|err| LedgerError::Digest(err.to_string()))?;
    let signature = signing_key.sign_digest(&digest)?;
    token.signature = signature.to_base64();
    Ok(token)
}

/// Verifies that `token` is signed by `public_key` over its own unsigned
/// canonical form, and that it has not expired as of `now`.
///
/// # Errors
///
/// Returns [`LedgerError::SignatureInvalid`] on a bad signature, or
/// [`LedgerError::ChainInvalid`] if the token has already expired (reused
/// here rather than a new variant since both describe "this token cannot be
/// relied on").
pub fn verify_approval(token: &ApprovalToken, public_key: &PublicKey, now: Timestamp) -> Result<(), LedgerError> {
    if token.is_expired(now) {
        return Err(LedgerError::ChainInvalid("approval token has expired".to_string()));
    }
    let mut unsigned = token.clone();
    unsigned.signature = String::new();
    let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &unsigned).map_err(|err| LedgerError::Digest(err.to_string()))?;
    let signature = gait_core::Signature::from_base64(&token.signature)?;
    public_key.verify_digest(&digest, &signature)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::mint_approval;
    use super::verify_approval;
    use gait_core::KeyMode;
    use gait_core::PrivateKey;
    use gait_core::Timestamp;

    #[test]
    fn minted_token_verifies_with_matching_key() {
        let key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let expires_at = Timestamp::parse("2030-01-01T00:00:00Z").expect("parse");
        let token = mint_approval(
            "tok_1",
            "intent-digest",
            "policy-digest",
            vec!["tool:tool.write".to_string()],
            "alice",
            "manual_review",
            expires_at,
            &key,
        )
        .expect("mint");
        verify_approval(&token, &key.public_key(), Timestamp::now()).expect("verify");
    }

    #[test]
    fn tampered_scope_fails_verification() {
        let key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let expires_at = Timestamp::parse("2030-01-01T00:00:00Z").expect("parse");
        let mut token = mint_approval(
            "tok_1",
            "intent-digest",
            "policy-digest",
            vec!["tool:tool.write".to_string()],
            "alice",
            "manual_review",
            expires_at,
            &key,
        )
        .expect("mint");
        token.scope.push("tool:tool.delete".to_string());
        assert!(verify_approval(&token, &key.public_key(), Timestamp::now()).is_err());
    }

    #[test]
    fn expired_token_fails_verification() {
        let key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let expires_at = Timestamp::parse("2000-01-01T00:00:00Z").expect("parse");
        let token = mint_approval(
            "tok_1",
            "intent-digest",
            "policy-digest",
            vec!["*".to_string()],
            "alice",
            "manual_review",
            expires_at,
            &key,
        )
        .expect("mint");
        assert!(verify_approval(&token, &key.public_key(), Timestamp::now()).is_err());
    }
}
