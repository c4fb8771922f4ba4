// gait-schema/src/trace.rs
// ============================================================================
// Module: Trace Record
// Description: The signed record emitted by every gate evaluation.
// Purpose: Strict-parse and validate `TraceRecord` per `spec.md` §3/§4.6.
// Dependencies: gait-core, serde
// ============================================================================

//! ## Overview
//! A [`TraceRecord`] is produced once per gate evaluation, whether or not it
//! is persisted. Its digest (computed with `signature` omitted) is what
//! approval and delegation tokens bind against indirectly through
//! `intent_digest`/`policy_digest`.

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;
use crate::policy::Verdict;

/// The signed record emitted by a single gate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceRecord {
    /// Unique trace identifier.
    pub trace_id: String,
    /// The tool name the evaluated intent named.
    pub tool_name: String,
    /// Digest of the evaluated intent's canonical JSON.
    pub intent_digest: String,
    /// Digest of the evaluated policy's canonical JSON.
    pub policy_digest: String,
    /// The verdict reached.
    pub verdict: Verdict,
    /// Reason codes accumulated during evaluation.
    #[serde(default)]
    pub reason_codes: Vec<String>,
    /// Violation descriptions accumulated during evaluation.
    #[serde(default)]
    pub violations: Vec<String>,
    /// Token ID of the approval that satisfied this evaluation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_ref: Option<String>,
    /// References to delegation tokens verified during this evaluation.
    #[serde(default)]
    pub delegation_refs: Vec<String>,
    /// Reference to a credential granted by the broker, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<String>,
    /// Name of the rule that matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    /// Wall-clock milliseconds spent evaluating this intent.
    pub decision_latency_ms: u64,
    /// Base64-encoded ed25519 signature over this record's digest, with
    /// `signature` itself omitted from the signed payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl TraceRecord {
    /// Returns the exit code this trace's verdict maps to.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.verdict.exit_code()
    }

    /// Strict-parses a trace record from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON or an empty `trace_id`.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let trace: Self = serde_json::from_slice(bytes)?;
        if trace.trace_id.trim().is_empty() {
            return Err(SchemaError::Invalid("trace_id must be non-empty".to_string()));
        }
        Ok(trace)
    }

    /// Returns a clone of this record with `signature` cleared, the form
    /// over which the record's digest is computed.
    #[must_use]
    pub fn unsigned(&self) -> Self {
        let mut clone = self.clone();
        clone.signature = None;
        clone
    }
}
