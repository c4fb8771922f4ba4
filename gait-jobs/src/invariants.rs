// gait-jobs/src/invariants.rs
// ============================================================================
// Module: Safety Invariant Ledger
// Description: Deterministic digest of the safety invariant set in force for a job.
// Purpose: Implement `spec.md` §4.10's safety-invariant ledger: submit
// generates the hash, resume preserves it, divergence is fatal.
// Dependencies: gait-core
// ============================================================================

//! ## Overview
//! `hash_invariants` is a pure function of the invariant names and the
//! version label: the same set, in the same order, with the same version,
//! always hashes the same. `gait-jobs` never recomputes this hash during
//! resume; it is carried forward unchanged from the stored [`gait_schema::JobState`]
//! so that any out-of-band tampering with `safety_invariants` between submit
//! and resume produces a verifiable mismatch rather than silently rebinding.

use gait_core::hashing::DEFAULT_HASH_ALGORITHM;
use gait_core::hashing::hash_canonical_json;
use serde::Serialize;

#[derive(Serialize)]
struct InvariantSet<'a> {
    version: &'a str,
    invariants: &'a [String],
}

/// Computes a content digest over a safety invariant set and version label.
#[must_use]
pub fn hash_invariants(version: &str, invariants: &[String]) -> String {
    let set = InvariantSet { version, invariants };
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &set).map(|digest| digest.as_str().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::hash_invariants;

    #[test]
    fn same_set_and_version_hash_identically() {
        let invariants = vec!["no_raw_shell".to_string(), "no_unbounded_writes".to_string()];
        assert_eq!(hash_invariants("v1", &invariants), hash_invariants("v1", &invariants));
    }

    #[test]
    fn differing_version_changes_the_hash() {
        let invariants = vec!["no_raw_shell".to_string()];
        assert_ne!(hash_invariants("v1", &invariants), hash_invariants("v2", &invariants));
    }

    #[test]
    fn differing_order_changes_the_hash() {
        let a = vec!["a".to_string(), "b".to_string()];
        let b = vec!["b".to_string(), "a".to_string()];
        assert_ne!(hash_invariants("v1", &a), hash_invariants("v1", &b));
    }
}
