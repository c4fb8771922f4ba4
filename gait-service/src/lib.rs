// gait-service/src/lib.rs
// ============================================================================
// Module: Decision Service
// Description: Stateless HTTP evaluate surface over the policy gate.
// Purpose: Implement `spec.md` §4.12 (C12): `/v1/evaluate`, SSE, and ndjson
// streaming, auth hardening, retention sweeping, and stop preemption.
// Dependencies: axum, tokio, gait-core, gait-jobs, gait-pack, gait-policy,
// gait-schema
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-mcp` HTTP/SSE server
//! (`server.rs`'s request dispatch shape, `auth.rs`'s loopback-default
//! bind and bearer-token `AuthContext`). The service's one invariant, held
//! across every route: it returns a decision, never dispatches the
//! underlying tool call. [`state::ServiceState`] is the shared state built
//! once at startup; [`evaluate::evaluate_request`] is the decision path
//! every transport in [`server`] calls; [`retention::spawn_sweeper`] runs
//! the background cleanup spec.md §4.12 requires for service-written
//! artifacts, driven by the pure [`retention::sweep`] function.

pub mod auth;
pub mod evaluate;
pub mod retention;
pub mod server;
pub mod state;

pub use evaluate::EvaluateRequest;
pub use evaluate::EvaluateResponse;
pub use retention::spawn_sweeper;
pub use server::serve;
pub use state::ServiceState;

use thiserror::Error;

/// Errors raised evaluating or serving a decision request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The policy gate failed to digest or sign its result.
    #[error("gate error: {0}")]
    Gate(#[from] gait_policy::GateError),

    /// A job-runtime operation failed while checking stop preemption.
    #[error("job error: {0}")]
    Job(#[from] gait_jobs::JobError),

    /// Building an auto-emitted pack failed.
    #[error("pack error: {0}")]
    Pack(#[from] gait_pack::PackError),

    /// A filesystem primitive failed writing an auto-emitted pack.
    #[error("fs error: {0}")]
    Fs(#[from] gait_core::fsutil::FsError),

    /// A plain IO operation failed.
    #[error("io error: {0}")]
    Io(String),
}

impl gait_core::GaitError for ServiceError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::Gate(_) => gait_core::ErrorCategory::Input,
            Self::Job(_) => gait_core::ErrorCategory::Environment,
            Self::Pack(_) => gait_core::ErrorCategory::ArtifactIntegrity,
            Self::Fs(_) | Self::Io(_) => gait_core::ErrorCategory::Environment,
        }
    }
}
