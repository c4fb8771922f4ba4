// gait-schema/src/tokens.rs
// ============================================================================
// Module: Approval and Delegation Tokens
// Description: Typed records for approval and delegation tokens.
// Purpose: Strict-parse and validate `ApprovalToken`/`DelegationToken` per
// `spec.md` §3.
// Dependencies: gait-core, serde
// ============================================================================

//! ## Overview
//! Both token kinds are bound to a signature over their own digest, produced
//! by `gait-ledger`; this module only owns the shape and field-level
//! validation (expiry not yet elapsed relative to a caller-supplied "now",
//! scope and chain-depth invariants). Signature verification lives in
//! `gait-ledger` since it needs key material this crate does not hold.

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;

/// Maximum allowed delegation chain depth, per `spec.md` §4.7.
pub const MAX_DELEGATION_CHAIN_DEPTH: u32 = 8;

/// A signed approval token bound to a specific `(intent_digest, policy_digest)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalToken {
    /// Unique token identifier.
    pub token_id: String,
    /// The intent digest this token authorizes.
    pub intent_digest: String,
    /// The policy digest this token was minted under.
    pub policy_digest: String,
    /// Scopes this token grants, e.g. `"tool:tool.write"` or `"*"`.
    pub scope: Vec<String>,
    /// Identity of the approver who minted this token.
    pub approver_identity: String,
    /// Reason code recorded at mint time.
    pub reason_code: String,
    /// RFC 3339 expiry instant.
    pub expires_at: gait_core::Timestamp,
    /// Base64-encoded ed25519 signature over the token's digest.
    pub signature: String,
}

impl ApprovalToken {
    /// Returns whether `scope` grants authority over `tool_name`, honoring
    /// the `"*"` wildcard scope.
    #[must_use]
    pub fn grants_tool(&self, tool_name: &str) -> bool {
        let wanted = format!("tool:{tool_name}");
        self.scope.iter().any(|scope| scope == "*" || scope == &wanted)
    }

    /// Returns whether this token is bound to the given digest pair.
    #[must_use]
    pub fn binds(&self, intent_digest: &str, policy_digest: &str) -> bool {
        self.intent_digest == intent_digest && self.policy_digest == policy_digest
    }

    /// Returns whether this token has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: gait_core::Timestamp) -> bool {
        self.expires_at.is_before(now)
    }

    /// Strict-parses an approval token from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON or an empty `token_id`/`scope`.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let token: Self = serde_json::from_slice(bytes)?;
        if token.token_id.trim().is_empty() {
            return Err(SchemaError::Invalid("token_id must be non-empty".to_string()));
        }
        if token.scope.is_empty() {
            return Err(SchemaError::Invalid("scope must have at least one entry".to_string()));
        }
        Ok(token)
    }
}

/// A signed delegation token, one link in a delegation chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationToken {
    /// Identity delegating authority.
    pub delegator_identity: String,
    /// Identity receiving delegated authority.
    pub delegate_identity: String,
    /// Scopes granted by this link.
    pub scope: Vec<String>,
    /// Optional intent digest this delegation is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_digest: Option<String>,
    /// Depth of this link within its chain, root = 0.
    pub chain_depth: u32,
    /// RFC 3339 expiry instant.
    pub expires_at: gait_core::Timestamp,
    /// Base64-encoded ed25519 signature over the token's digest.
    pub signature: String,
}

impl DelegationToken {
    /// Returns whether this token has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: gait_core::Timestamp) -> bool {
        self.expires_at.is_before(now)
    }
}

/// Verifies that a chain of delegation tokens links root to leaf: each
/// token's `delegate_identity` equals the next token's `delegator_identity`,
/// and no link's `chain_depth` exceeds [`MAX_DELEGATION_CHAIN_DEPTH`].
///
/// # Errors
///
/// Returns [`SchemaError::Invalid`] on an empty chain, a depth-bound
/// violation, or a broken identity link.
pub fn validate_chain_linkage(chain: &[DelegationToken]) -> Result<(), SchemaError> {
    if chain.is_empty() {
        return Err(SchemaError::Invalid("delegation chain must have at least one token".to_string()));
    }
    if chain.len() as u32 > MAX_DELEGATION_CHAIN_DEPTH {
        return Err(SchemaError::Invalid(format!(
            "delegation chain depth {} exceeds maximum of {MAX_DELEGATION_CHAIN_DEPTH}",
            chain.len()
        )));
    }
    for pair in chain.windows(2) {
        if pair[0].delegate_identity != pair[1].delegator_identity {
            return Err(SchemaError::Invalid(format!(
                "delegation chain broken: {} does not hand off to {}",
                pair[0].delegate_identity, pair[1].delegator_identity
            )));
        }
    }
    Ok(())
}
