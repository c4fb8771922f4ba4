// gait-core/src/error.rs
// ============================================================================
// Module: Gait Error Taxonomy
// Description: The machine-readable error category shared across every crate.
// Purpose: Let every crate-local error type classify itself the same way so
// CLI and service boundaries can map failures to stable exit codes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every Gait crate defines its own `thiserror`-derived error enum, one
//! variant per distinguishable failure. Each of those enums implements
//! `classify()` to return one of the [`ErrorCategory`] values below, which is
//! the only thing exit-code mapping and `--json` output ever inspect. This
//! keeps the taxonomy a type, not a convention re-derived per call site.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Category
// ============================================================================

/// Machine-readable error category, stable for programmatic handling.
///
/// # Invariants
/// - Variants are stable wire identifiers; do not renumber or remove.
/// - `retryable()` is pure and independent of any runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Schema invalid, missing required flag, ambiguous key source, unknown profile.
    Input,
    /// A policy rule matched with effect `block`. Not an error condition per se.
    PolicyBlock,
    /// A policy rule requires approval that was not supplied or did not match.
    ApprovalRequired,
    /// Hash mismatch, missing file, or tampered signature in an artifact.
    ArtifactIntegrity,
    /// Deterministic replay produced a digest or exit-code mismatch.
    Regression,
    /// Missing required directory, unreadable schema, missing binary.
    Environment,
    /// Lock contention or a concurrent conflicting mutation.
    Contention,
    /// Remote fetch failure classified as transient (5xx, timeout, reset).
    TransientNetwork,
    /// Signature failed, pin mismatch, or publisher not allowlisted.
    Trust,
}

impl ErrorCategory {
    /// Returns the stable CLI exit code for this category, where the
    /// category alone determines the code (see `spec.md` §6/§7).
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Input => 6,
            Self::PolicyBlock => 3,
            Self::ApprovalRequired => 4,
            Self::ArtifactIntegrity => 2,
            Self::Regression => 5,
            Self::Environment => 7,
            Self::Contention | Self::TransientNetwork | Self::Trust => 1,
        }
    }

    /// Returns whether a failure in this category may be retried by the
    /// caller. Trust failures are never retryable, even with a cache
    /// fallback available, unless an explicit pin is supplied by the caller.
    #[must_use]
    pub const fn retryable(self) -> bool {
        matches!(self, Self::Contention | Self::TransientNetwork)
    }

    /// Returns the wire identifier used in `--json` output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::PolicyBlock => "policy_block",
            Self::ApprovalRequired => "approval_required",
            Self::ArtifactIntegrity => "artifact_integrity",
            Self::Regression => "regression",
            Self::Environment => "environment",
            Self::Contention => "contention",
            Self::TransientNetwork => "transient_network",
            Self::Trust => "trust",
        }
    }
}

// ============================================================================
// SECTION: Classifiable Trait
// ============================================================================

/// Implemented by every crate-local error enum to report its category.
pub trait GaitError: std::error::Error {
    /// Returns the machine-readable category for this error.
    fn category(&self) -> ErrorCategory;

    /// Returns the stable exit code derived from [`GaitError::category`].
    fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCategory;

    #[test]
    fn exit_codes_match_spec_table() {
        assert_eq!(ErrorCategory::Input.exit_code(), 6);
        assert_eq!(ErrorCategory::PolicyBlock.exit_code(), 3);
        assert_eq!(ErrorCategory::ApprovalRequired.exit_code(), 4);
        assert_eq!(ErrorCategory::ArtifactIntegrity.exit_code(), 2);
        assert_eq!(ErrorCategory::Regression.exit_code(), 5);
        assert_eq!(ErrorCategory::Environment.exit_code(), 7);
    }

    #[test]
    fn only_contention_and_transient_network_are_retryable() {
        assert!(ErrorCategory::Contention.retryable());
        assert!(ErrorCategory::TransientNetwork.retryable());
        assert!(!ErrorCategory::Trust.retryable());
        assert!(!ErrorCategory::Input.retryable());
    }
}
