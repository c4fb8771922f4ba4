// gait-jobs/src/lib.rs
// ============================================================================
// Module: Job Runtime
// Description: The durable, checkpointed job state machine.
// Purpose: Implement `spec.md` §4.10: submit/checkpoint/pause/resume/cancel/
// emergency-stop with fail-closed resume and a per-job event journal.
// Dependencies: gait-core, gait-schema
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-core::runtime::engine::ControlPlane`,
//! re-targeted from Decision Gate's scenario/gate vocabulary to `spec.md`
//! §3's `JobState.status` vocabulary. [`runtime::JobRuntime`] is the single
//! entry point; every other module here supports one of its checks.

pub mod fingerprint;
pub mod invariants;
pub mod lock;
pub mod runtime;

pub use runtime::BlockedDispatchOptions;
pub use runtime::JobRuntime;
pub use runtime::ResumeOptions;
pub use runtime::SubmitOptions;

use thiserror::Error;

/// Errors raised by the job runtime.
#[derive(Debug, Error)]
pub enum JobError {
    /// A job directory already has a persisted `state.json`.
    #[error("job {0} already exists")]
    DuplicateJob(String),

    /// The requested operation is not legal from the job's current status.
    #[error("cannot apply {event} to a job in status {from}")]
    InvalidTransition {
        /// The job's status at the time of the attempted transition.
        from: String,
        /// The operation that was attempted.
        event: String,
    },

    /// Resume was attempted with an identity that does not match the job's bound identity.
    #[error("job is bound to identity {bound}, but resume supplied {supplied:?}")]
    IdentityMismatch {
        /// The identity the job is bound to.
        bound: String,
        /// The identity supplied by the resuming caller, if any.
        supplied: Option<String>,
    },

    /// Resume observed an environment fingerprint mismatch with no override.
    #[error("resume environment fingerprint does not match the job's bound fingerprint")]
    EnvironmentMismatch,

    /// Resume observed a policy digest transition without `require_policy_evaluation`.
    #[error("resume requires an explicit policy re-evaluation to cross a policy digest transition")]
    PolicyTransitionRequired,

    /// Resume required identity validation but no validation source was supplied.
    #[error("resume requires a non-empty identity_validation_source")]
    IdentityValidationRequired,

    /// Resume was attempted with a revoked identity.
    #[error("resume identity has been revoked")]
    IdentityRevoked,

    /// Resume observed fewer recorded approvals than outstanding decision checkpoints.
    #[error("resume requires {required} approvals, found {granted}")]
    ApprovalRequired {
        /// Number of decision-needed checkpoints recorded against the job.
        required: usize,
        /// Number of approvals recorded against the job.
        granted: usize,
    },

    /// The per-job lock could not be acquired before its timeout elapsed.
    #[error("job lock contended: {0}")]
    LockContended(String),

    /// Persisted state or the event journal failed strict schema validation.
    #[error("job schema error: {0}")]
    Schema(String),

    /// Reading or writing job state failed at the filesystem layer.
    #[error("job store error: {0}")]
    Store(String),
}

impl gait_core::GaitError for JobError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::DuplicateJob(_) | Self::InvalidTransition { .. } | Self::Schema(_) => gait_core::ErrorCategory::Input,
            Self::IdentityMismatch { .. } | Self::EnvironmentMismatch | Self::IdentityRevoked => gait_core::ErrorCategory::Trust,
            Self::PolicyTransitionRequired | Self::IdentityValidationRequired | Self::ApprovalRequired { .. } => gait_core::ErrorCategory::ApprovalRequired,
            Self::LockContended(_) => gait_core::ErrorCategory::Contention,
            Self::Store(_) => gait_core::ErrorCategory::Environment,
        }
    }
}
