// gait-policy/src/script.rs
// ============================================================================
// Module: Approved-Script Registry Interface
// Description: The fast-path lookup for pre-approved `script.run` intents.
// Purpose: Let the gate short-circuit to `allow` for a script digest signed
// under the evaluated policy, per `spec.md` §4.6.
// Dependencies: none
// ============================================================================

//! ## Overview
//! A match carries the `pattern_id`/`registry_reason` fields embedded into
//! the resulting trace record, a convention this spec's `original_source/`
//! carries forward unchanged (see `SPEC_FULL.md` §4.13).

/// A verified match against the approved-script registry.
#[derive(Debug, Clone)]
pub struct ApprovedScriptMatch {
    /// Identifier of the pattern the script digest matched.
    pub pattern_id: String,
    /// Human-readable reason the registry entry was approved.
    pub registry_reason: String,
}

/// Looks up a script digest against entries signed under a given policy
/// digest.
pub trait ApprovedScriptRegistry {
    /// Returns a match if `script_digest` is a verified, signed entry under
    /// `policy_digest`.
    fn lookup(&self, script_digest: &str, policy_digest: &str) -> Option<ApprovedScriptMatch>;
}
