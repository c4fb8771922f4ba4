// gait-ledger/src/audit.rs
// ============================================================================
// Module: Approval and Credential Audit Records
// Description: Writes `approval_audit_<trace_id>.json` and
// `credential_evidence_<trace_id>.json`.
// Purpose: Make approval and broker-credential evidence co-discoverable by
// trace ID, per `spec.md` §4.7.
// Dependencies: gait-core
// ============================================================================

//! ## Overview
//! Both record kinds are atomically written, never appended; a given trace
//! ID produces at most one of each file. Grounded on the teacher's
//! `decision-gate-mcp::audit` one-record-per-decision convention,
//! specialized to the two record kinds `spec.md` §4.7 names.

use std::path::Path;

use gait_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

use crate::LedgerError;

/// Audit record for a minted approval token, co-discoverable by trace ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalAudit {
    /// The trace this approval was minted for.
    pub trace_id: String,
    /// The token ID minted.
    pub token_id: String,
    /// Identity of the approver.
    pub approver_identity: String,
    /// Scopes granted.
    pub scope: Vec<String>,
    /// Reason code recorded at mint time.
    pub reason_code: String,
    /// Expiry of the minted token.
    pub expires_at: Timestamp,
    /// Instant the audit record was written.
    pub minted_at: Timestamp,
}

/// Audit record attesting a broker credential was obtained for a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialEvidence {
    /// The trace this credential evidence is attached to.
    pub trace_id: String,
    /// The broker reference that granted the credential.
    pub broker_reference: String,
    /// Scopes requested from the broker.
    pub scopes: Vec<String>,
    /// Opaque reference to the granted credential.
    pub credential_ref: String,
    /// Instant the evidence record was written.
    pub granted_at: Timestamp,
}

/// Writes `<root>/approval_audit_<trace_id>.json` atomically.
///
/// # Errors
///
/// Returns [`LedgerError::Digest`] if serialization fails, or
/// [`LedgerError::Io`] if the write fails.
pub fn write_approval_audit(root: &Path, audit: &ApprovalAudit) -> Result<(), LedgerError> {
    let path = root.join(format!("approval_audit_{}.json", audit.trace_id));
    let contents = serde_json::to_vec_pretty(audit).map_err(|err| LedgerError::Digest(err.to_string()))?;
    gait_core::write_file_atomic(&path, &contents)?;
    Ok(())
}

/// Writes `<root>/credential_evidence_<trace_id>.json` atomically.
///
/// # Errors
///
/// Returns [`LedgerError::Digest`] if serialization fails, or
/// [`LedgerError::Io`] if the write fails.
pub fn write_credential_evidence(root: &Path, evidence: &CredentialEvidence) -> Result<(), LedgerError> {
    let path = root.join(format!("credential_evidence_{}.json", evidence.trace_id));
    let contents = serde_json::to_vec_pretty(evidence).map_err(|err| LedgerError::Digest(err.to_string()))?;
    gait_core::write_file_atomic(&path, &contents)?;
    Ok(())
}
