// gait-jobs/src/fingerprint.rs
// ============================================================================
// Module: Environment Fingerprint
// Description: Deterministic digest of the host environment a job is bound to.
// Purpose: Implement `spec.md` §4.10's `Submit` fingerprinting step.
// Dependencies: gait-core
// ============================================================================

//! ## Overview
//! The fingerprint is a digest over the facts that make resuming a job on a
//! different machine or toolchain meaningfully risky: OS, architecture, and
//! this binary's own crate version. It carries no wall-clock or random
//! component, so the same binary run twice on the same host produces the
//! same fingerprint, matching [`crate::invariants::hash_invariants`]'s pure,
//! caller-supplied-input style.

use gait_core::hashing::DEFAULT_HASH_ALGORITHM;
use gait_core::hashing::hash_canonical_json;
use serde::Serialize;

#[derive(Serialize)]
struct EnvironmentFacts<'a> {
    os: &'a str,
    arch: &'a str,
    runtime_version: &'a str,
}

/// Computes a content digest of the current host environment.
#[must_use]
pub fn compute_environment_fingerprint() -> String {
    let facts = EnvironmentFacts { os: std::env::consts::OS, arch: std::env::consts::ARCH, runtime_version: env!("CARGO_PKG_VERSION") };
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &facts).map(|digest| digest.as_str().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::compute_environment_fingerprint;

    #[test]
    fn fingerprint_is_deterministic_within_a_process() {
        assert_eq!(compute_environment_fingerprint(), compute_environment_fingerprint());
    }

    #[test]
    fn fingerprint_is_a_hex_digest() {
        let fingerprint = compute_environment_fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
