// gait-schema/src/job.rs
// ============================================================================
// Module: Job State
// Description: Durable job state machine records.
// Purpose: Strict-parse and validate `JobState`/`Checkpoint` per `spec.md`
// §3/§4.10.
// Dependencies: gait-core, serde
// ============================================================================

//! ## Overview
//! [`JobState`] is the root record persisted at `jobs/<job_id>/state.json`.
//! Its `status` enum is the job's position in the durable state machine
//! `gait-jobs` drives; this module owns only the shape, not the transition
//! rules (see `gait_jobs::transitions`).

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;

/// A job's position in the durable state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The job is actively executing.
    Running,
    /// The job is paused, awaiting resume.
    Paused,
    /// The job is blocked by a policy decision.
    Blocked,
    /// The job requires an operator decision to proceed.
    DecisionNeeded,
    /// The job finished successfully.
    Completed,
    /// The job was cancelled.
    Cancelled,
    /// The job was halted by an emergency stop.
    EmergencyStopped,
}

/// The kind of checkpoint recorded in a job's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointType {
    /// A plan was recorded before execution began.
    Plan,
    /// Incremental progress was recorded.
    Progress,
    /// The job requires a decision before proceeding.
    DecisionNeeded,
    /// The job is blocked.
    Blocked,
    /// The job reached a completed checkpoint.
    Completed,
}

/// A single checkpoint in a job's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    /// Unique checkpoint identifier.
    pub checkpoint_id: String,
    /// The checkpoint's type.
    #[serde(rename = "type")]
    pub checkpoint_type: CheckpointType,
    /// Human-readable summary, at most 512 characters.
    pub summary: String,
    /// Action required of an operator before the job may proceed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<String>,
    /// Reason code explaining why this checkpoint was recorded.
    pub reason_code: String,
    /// RFC 3339 creation instant.
    pub created_at: gait_core::Timestamp,
}

/// Maximum length, in characters, of a checkpoint's `summary` field.
pub const MAX_CHECKPOINT_SUMMARY_CHARS: usize = 512;

impl Checkpoint {
    /// Validates the checkpoint's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] if `summary` exceeds
    /// [`MAX_CHECKPOINT_SUMMARY_CHARS`] characters.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.summary.chars().count() > MAX_CHECKPOINT_SUMMARY_CHARS {
            return Err(SchemaError::Invalid(format!(
                "checkpoint summary exceeds {MAX_CHECKPOINT_SUMMARY_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// An approval recorded against a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobApproval {
    /// Token identifier of the approval that was granted.
    pub token_id: String,
    /// Identity of the approver.
    pub approver_identity: String,
    /// RFC 3339 instant the approval was granted.
    pub granted_at: gait_core::Timestamp,
}

/// The durable state of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobState {
    /// Unique job identifier.
    pub job_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Reason code explaining the current status.
    pub status_reason_code: String,
    /// Reason the job was stopped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Fingerprint of the environment this job is bound to.
    pub environment_fingerprint: String,
    /// Digest of the policy governing this job, if bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_digest: Option<String>,
    /// Reference to the policy document governing this job, if bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_ref: Option<String>,
    /// Identity this job is bound to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Version of the safety invariant set in force.
    pub safety_invariant_version: String,
    /// Digest of the safety invariant set in force.
    pub safety_invariant_hash: String,
    /// The safety invariants in force, by name.
    #[serde(default)]
    pub safety_invariants: Vec<String>,
    /// Checkpoints recorded against this job, in order.
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    /// Approvals recorded against this job.
    #[serde(default)]
    pub approvals: Vec<JobApproval>,
    /// RFC 3339 creation instant.
    pub created_at: gait_core::Timestamp,
    /// RFC 3339 instant of the last mutation.
    pub updated_at: gait_core::Timestamp,
}

impl JobState {
    /// Strict-parses a job state record from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON, an empty `job_id`, or an
    /// invalid checkpoint.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let state: Self = serde_json::from_slice(bytes)?;
        if state.job_id.trim().is_empty() {
            return Err(SchemaError::Invalid("job_id must be non-empty".to_string()));
        }
        for checkpoint in &state.checkpoints {
            checkpoint.validate()?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::Checkpoint;
    use super::CheckpointType;
    use super::MAX_CHECKPOINT_SUMMARY_CHARS;
    use gait_core::Timestamp;

    #[test]
    fn checkpoint_summary_over_limit_is_rejected() {
        let checkpoint = Checkpoint {
            checkpoint_id: "cp_1".to_string(),
            checkpoint_type: CheckpointType::Progress,
            summary: "x".repeat(MAX_CHECKPOINT_SUMMARY_CHARS + 1),
            required_action: None,
            reason_code: "progress".to_string(),
            created_at: Timestamp::from_unix_millis(0).unwrap(),
        };
        assert!(checkpoint.validate().is_err());
    }

    #[test]
    fn checkpoint_summary_at_limit_is_accepted() {
        let checkpoint = Checkpoint {
            checkpoint_id: "cp_1".to_string(),
            checkpoint_type: CheckpointType::Progress,
            summary: "x".repeat(MAX_CHECKPOINT_SUMMARY_CHARS),
            required_action: None,
            reason_code: "progress".to_string(),
            created_at: Timestamp::from_unix_millis(0).unwrap(),
        };
        assert!(checkpoint.validate().is_ok());
    }
}
