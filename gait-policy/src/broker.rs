// gait-policy/src/broker.rs
// ============================================================================
// Module: Credential Broker Interface
// Description: Backend-agnostic interface the gate invokes to satisfy
// `require_broker_credential` constraints.
// Purpose: Let `gait-broker` and test fixtures supply credentials without
// the evaluator depending on a concrete transport.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-core::interfaces::Dispatcher`
//! pattern: a narrow trait at the seam, a dedicated error type, and a
//! fail-closed caller (a broker error degrades the rule effect to `block`,
//! it never fails open).

use thiserror::Error;

/// A credential granted by a broker for a specific reference and scope set.
#[derive(Debug, Clone)]
pub struct CredentialGrant {
    /// Opaque reference recorded in the trace as `credential_ref`.
    pub credential_ref: String,
}

/// Errors a credential broker may return.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No credential could be granted for the requested reference.
    #[error("no credential available for reference {0}")]
    NotFound(String),

    /// The broker call itself failed (network, auth, timeout).
    #[error("broker call failed: {0}")]
    CallFailed(String),
}

/// Grants credentials bound to a broker reference and scope set. Callers
/// must treat any error as `broker_credential_missing` and degrade the
/// rule's effect to `block`; this trait never signals a safe fail-open.
pub trait CredentialBroker {
    /// Requests a credential grant for `reference` with the given scopes.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if no credential can be granted.
    fn grant(&self, reference: &str, scopes: &[String]) -> Result<CredentialGrant, BrokerError>;
}
