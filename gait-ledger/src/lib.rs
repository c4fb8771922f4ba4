// gait-ledger/src/lib.rs
// ============================================================================
// Module: Trace and Approval/Delegation Ledger
// Description: Mints and verifies approval tokens, verifies delegation
// chains, and signs/verifies trace records.
// Purpose: Implement the C7 algorithms from `spec.md` §4.7.
// Dependencies: gait-core, gait-schema
// ============================================================================

//! ## Overview
//! This crate owns everything that touches a signing or verifying key on
//! behalf of a gate decision: minting approval tokens, verifying delegation
//! chains link-by-link, and signing/verifying [`gait_schema::trace::TraceRecord`]s.
//! `gait-policy` never holds key material; it only consumes tokens this
//! crate produced. Adapted from the teacher's `decision-gate-mcp::audit`
//! one-audit-record-per-decision pattern, generalized from a fixed MCP event
//! shape into the approval/delegation/trace records `spec.md` §3 defines.

pub mod approval;
pub mod audit;
pub mod delegation;
pub mod trace;

pub use approval::mint_approval;
pub use approval::verify_approval;
pub use audit::ApprovalAudit;
pub use audit::CredentialEvidence;
pub use audit::write_approval_audit;
pub use audit::write_credential_evidence;
pub use delegation::DelegationKeyResolver;
pub use delegation::verify_delegation_chain;
pub use trace::sign_trace;
pub use trace::verify_trace;

use thiserror::Error;

/// Errors raised while minting, verifying, or signing ledger records.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A signature failed to verify.
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    /// A delegation chain failed linkage or depth validation.
    #[error("delegation chain invalid: {0}")]
    ChainInvalid(String),

    /// A record failed to canonicalize or digest.
    #[error("digest computation failed: {0}")]
    Digest(String),

    /// A record failed schema validation.
    #[error("record invalid: {0}")]
    Schema(String),

    /// Persisting a ledger record to disk failed.
    #[error("failed to persist ledger record: {0}")]
    Io(String),
}

impl From<gait_schema::SchemaError> for LedgerError {
    fn from(err: gait_schema::SchemaError) -> Self {
        Self::Schema(err.to_string())
    }
}

impl From<gait_core::SigningError> for LedgerError {
    fn from(err: gait_core::SigningError) -> Self {
        Self::SignatureInvalid(err.to_string())
    }
}

impl From<gait_core::FsError> for LedgerError {
    fn from(err: gait_core::FsError) -> Self {
        Self::Io(err.to_string())
    }
}

impl gait_core::GaitError for LedgerError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::SignatureInvalid(_) | Self::ChainInvalid(_) => gait_core::ErrorCategory::Trust,
            Self::Digest(_) | Self::Schema(_) => gait_core::ErrorCategory::Input,
            Self::Io(_) => gait_core::ErrorCategory::Environment,
        }
    }
}
