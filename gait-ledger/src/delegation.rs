// gait-ledger/src/delegation.rs
// ============================================================================
// Module: Delegation Chain Verification
// Description: Cryptographic verification of a delegation chain.
// Purpose: Combine `gait_schema::tokens::validate_chain_linkage` (structural)
// with per-link signature verification (cryptographic), per `spec.md` §4.7.
// Dependencies: gait-core, gait-schema
// ============================================================================

//! ## Overview
//! Structural linkage (`delegate_identity` handing off to the next link's
//! `delegator_identity`, depth bound) lives in `gait-schema` since it needs
//! no key material. This module adds the cryptographic half: each link must
//! verify under the *delegator's* public key, resolved by identity through a
//! caller-supplied lookup, since a delegation chain does not embed keys.

use gait_core::HashAlgorithm;
use gait_core::PublicKey;
use gait_core::Timestamp;
use gait_schema::tokens::DelegationToken;

use crate::LedgerError;

/// Resolves a delegator identity to the public key that should have signed
/// its delegation tokens.
pub trait DelegationKeyResolver {
    /// Returns the public key for `identity`, or `None` if unknown.
    fn resolve(&self, identity: &str) -> Option<PublicKey>;
}

/// Verifies `chain` structurally and cryptographically, and rejects any
/// expired link as of `now`.
///
/// # Errors
///
/// Returns [`LedgerError::ChainInvalid`] on a linkage, depth, expiry, or
/// unresolved-key failure, or [`LedgerError::SignatureInvalid`] on a bad
/// signature.
pub fn verify_delegation_chain(
    chain: &[DelegationToken],
    resolver: &dyn DelegationKeyResolver,
    now: Timestamp,
) -> Result<(), LedgerError> {
    gait_schema::tokens::validate_chain_linkage(chain)?;
    for token in chain {
        if token.is_expired(now) {
            return Err(LedgerError::ChainInvalid(format!("delegation link from {} has expired", token.delegator_identity)));
        }
        let key = resolver
            .resolve(&token.delegator_identity)
            .ok_or_else(|| LedgerError::ChainInvalid(format!("no known key for delegator {}", token.delegator_identity)))?;
        let mut unsigned = token.clone();
        unsigned.signature = String::new();
        let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &unsigned).map_err(|err| LedgerError::Digest(err.to_string()))?;
        let signature = gait_core::Signature::from_base64(&token.signature)?;
        key.verify_digest(&digest, &signature)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::DelegationKeyResolver;
    use super::verify_delegation_chain;
    use gait_core::HashAlgorithm;
    use gait_core::KeyMode;
    use gait_core::PrivateKey;
    use gait_core::PublicKey;
    use gait_core::Timestamp;
    use gait_schema::tokens::DelegationToken;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, PublicKey>);

    impl DelegationKeyResolver for MapResolver {
        fn resolve(&self, identity: &str) -> Option<PublicKey> {
            self.0.get(identity).cloned()
        }
    }

    fn signed_link(delegator_key: &PrivateKey, delegator: &str, delegate: &str, depth: u32) -> DelegationToken {
        let mut token = DelegationToken {
            delegator_identity: delegator.to_string(),
            delegate_identity: delegate.to_string(),
            scope: vec!["*".to_string()],
            intent_digest: None,
            chain_depth: depth,
            expires_at: Timestamp::parse("2030-01-01T00:00:00Z").expect("parse"),
            signature: String::new(),
        };
        let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &token).expect("digest");
        token.signature = delegator_key.sign_digest(&digest).expect("sign").to_base64();
        token
    }

    #[test]
    fn verifies_a_two_link_chain() {
        let alice_key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let bob_key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let chain = vec![
            signed_link(&alice_key, "alice", "bob", 0),
            signed_link(&bob_key, "bob", "carol", 1),
        ];
        let mut keys = HashMap::new();
        keys.insert("alice".to_string(), alice_key.public_key());
        keys.insert("bob".to_string(), bob_key.public_key());
        let resolver = MapResolver(keys);
        verify_delegation_chain(&chain, &resolver, Timestamp::now()).expect("verify");
    }

    #[test]
    fn rejects_unresolved_delegator_key() {
        let alice_key = PrivateKey::load(&KeyMode::Dev).expect("generate");
        let chain = vec![signed_link(&alice_key, "alice", "bob", 0)];
        let resolver = MapResolver(HashMap::new());
        assert!(verify_delegation_chain(&chain, &resolver, Timestamp::now()).is_err());
    }
}
