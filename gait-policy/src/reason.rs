// gait-policy/src/reason.rs
// ============================================================================
// Module: Reason Codes
// Description: The stable reason-code vocabulary emitted during gate
// evaluation.
// Purpose: Give every constraint check in `evaluator.rs` a single named
// constant instead of an inline string literal.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Reason codes are part of the wire contract (`spec.md` §4.6): callers
//! pattern-match on them. Centralizing the literals here means a rename is a
//! one-line change instead of a grep-and-replace.

/// The fail-closed precondition blocked evaluation due to a missing required field.
pub const FAIL_CLOSED_MISSING_FIELD: &str = "fail_closed_missing_field";
/// `context.context_set_digest` was empty or absent.
pub const CONTEXT_SET_DIGEST_MISSING: &str = "context_set_digest_missing";
/// `context.context_evidence_mode` did not meet the rule's required mode.
pub const CONTEXT_EVIDENCE_MODE_MISMATCH: &str = "context_evidence_mode_mismatch";
/// `context.context_age_seconds` exceeded the rule's maximum.
pub const CONTEXT_FRESHNESS_EXCEEDED: &str = "context_freshness_exceeded";
/// Context evidence was required but entirely absent.
pub const CONTEXT_EVIDENCE_MISSING: &str = "context_evidence_missing";
/// The intent declared no delegation chain where one was required.
pub const DELEGATION_MISSING: &str = "delegation_missing";
/// A delegation chain failed cryptographic or linkage verification.
pub const DELEGATION_INVALID: &str = "delegation_invalid";
/// A delegation chain verified but did not grant the required scope.
pub const DELEGATION_SCOPE_MISMATCH: &str = "delegation_scope_mismatch";
/// The credential broker did not grant a credential for the rule's reference.
pub const BROKER_CREDENTIAL_MISSING: &str = "broker_credential_missing";
/// No approval token bound to the evaluated digests was supplied.
pub const APPROVAL_TOKEN_MISSING: &str = "approval_token_missing";
/// A supplied approval token did not bind to the evaluated digests.
pub const APPROVAL_TOKEN_INTENT_MISMATCH: &str = "approval_token_intent_mismatch";
/// An approval token was granted and accepted.
pub const APPROVAL_GRANTED: &str = "approval_granted";
/// The intent matched the approved-script fast path.
pub const PRE_APPROVED_SCRIPT: &str = "pre_approved_script";
