// gait-jobs/src/runtime.rs
// ============================================================================
// Module: Job Runtime
// Description: The durable job state machine: submit, checkpoint, pause,
// resume, cancel, emergency-stop, and blocked-dispatch recording.
// Purpose: Implement `spec.md` §4.10's transition table as the only legal
// mutations of a job's persisted state.
// Dependencies: gait-core, gait-schema, crate::{fingerprint, invariants, lock}
// ============================================================================

//! ## Overview
//! Grounded on the teacher's `decision-gate-core::runtime::engine::ControlPlane`:
//! one struct owning an injected root directory in place of the teacher's
//! injected store/dispatcher traits, with a method per externally-visible
//! operation rather than per internal helper. Every mutation follows the same
//! shape: acquire [`crate::lock::JobLock`], load `state.json`, check the
//! current status is a legal source state, mutate, persist, append one
//! [`gait_schema::Event`] to `events.jsonl`.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use gait_core::JobId;
use gait_core::Timestamp;
use gait_core::fsutil;
use gait_schema::Checkpoint;
use gait_schema::CheckpointType;
use gait_schema::Event;
use gait_schema::EventType;
use gait_schema::JobState;
use gait_schema::JobStatus;
use serde_json::json;

use crate::JobError;
use crate::fingerprint::compute_environment_fingerprint;
use crate::lock::DEFAULT_LOCK_TIMEOUT;
use crate::lock::JobLock;

/// Inputs to [`JobRuntime::submit`].
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Identity to bind the job to, if known at submit time.
    pub identity: Option<String>,
    /// Digest of the policy governing this job, if bound.
    pub policy_digest: Option<String>,
    /// Reference to the policy document governing this job, if bound.
    pub policy_ref: Option<String>,
    /// Version label of the safety invariant set in force.
    pub safety_invariant_version: String,
    /// Safety invariant names in force, in order.
    pub safety_invariants: Vec<String>,
    /// Overrides the computed environment fingerprint, if supplied.
    pub environment_fingerprint_override: Option<String>,
}

/// Inputs to [`JobRuntime::resume`].
#[derive(Debug, Clone, Default)]
pub struct ResumeOptions {
    /// Identity requesting the resume.
    pub identity: Option<String>,
    /// The environment fingerprint observed at resume time.
    pub current_environment_fingerprint: String,
    /// Permits a fingerprint mismatch when `true` and `reason` is non-empty.
    pub allow_env_mismatch: bool,
    /// Required justification when `allow_env_mismatch` is used.
    pub reason: Option<String>,
    /// The policy digest the resuming caller expects to be bound to.
    pub policy_digest: Option<String>,
    /// Permits a policy digest transition when `true`.
    pub require_policy_evaluation: bool,
    /// Requires `identity_validation_source` to be supplied.
    pub require_identity_validation: bool,
    /// Source that validated `identity`, required when
    /// `require_identity_validation` is set.
    pub identity_validation_source: Option<String>,
    /// The resuming caller's identity has been revoked.
    pub identity_revoked: bool,
}

/// Inputs to [`JobRuntime::record_blocked_dispatch`].
#[derive(Debug, Clone)]
pub struct BlockedDispatchOptions {
    /// Identifier of the tool call that was blocked.
    pub tool_name: String,
    /// Identifier of the intent that was blocked, if known.
    pub intent_id: Option<String>,
}

/// Durable job state machine, rooted at `<root>/jobs/<job_id>`.
pub struct JobRuntime {
    jobs_root: PathBuf,
    lock_timeout: Duration,
}

impl JobRuntime {
    /// Builds a runtime rooted at `jobs_root`, using the default lock timeout.
    #[must_use]
    pub fn new(jobs_root: impl Into<PathBuf>) -> Self {
        Self { jobs_root: jobs_root.into(), lock_timeout: DEFAULT_LOCK_TIMEOUT }
    }

    /// Builds a runtime with a caller-supplied lock timeout.
    #[must_use]
    pub fn with_lock_timeout(jobs_root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self { jobs_root: jobs_root.into(), lock_timeout }
    }

    fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.jobs_root.join(job_id.as_str())
    }

    fn state_path(job_dir: &Path) -> PathBuf {
        job_dir.join("state.json")
    }

    fn events_path(job_dir: &Path) -> PathBuf {
        job_dir.join("events.jsonl")
    }

    fn load_state(job_dir: &Path) -> Result<JobState, JobError> {
        let bytes = std::fs::read(Self::state_path(job_dir)).map_err(|err| JobError::Store(err.to_string()))?;
        JobState::parse(&bytes).map_err(|err| JobError::Schema(err.to_string()))
    }

    fn save_state(job_dir: &Path, state: &JobState) -> Result<(), JobError> {
        let bytes = serde_json::to_vec(state).map_err(|err| JobError::Schema(err.to_string()))?;
        fsutil::write_file_atomic(&Self::state_path(job_dir), &bytes).map_err(|err| JobError::Store(err.to_string()))
    }

    fn append_event(job_dir: &Path, event: &Event) -> Result<(), JobError> {
        let line = event.to_jsonl_line().map_err(|err| JobError::Schema(err.to_string()))?;
        fsutil::append_line_locked(&Self::events_path(job_dir), &line).map_err(|err| JobError::Store(err.to_string()))
    }

    fn acquire_lock(&self, job_dir: &Path) -> Result<JobLock, JobError> {
        JobLock::acquire(job_dir, self.lock_timeout).map_err(|err| JobError::LockContended(err.to_string()))
    }

    /// Creates a new job and transitions it `created → running`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::DuplicateJob`] if `job_id` already has a state
    /// file, or a store/schema error on IO or persistence failure.
    pub fn submit(&self, job_id: &JobId, opts: SubmitOptions) -> Result<JobState, JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        if Self::state_path(&job_dir).exists() {
            return Err(JobError::DuplicateJob(job_id.as_str().to_string()));
        }
        let now = Timestamp::now();
        let environment_fingerprint = opts.environment_fingerprint_override.unwrap_or_else(compute_environment_fingerprint);
        let safety_invariant_hash = crate::invariants::hash_invariants(&opts.safety_invariant_version, &opts.safety_invariants);
        let state = JobState {
            job_id: job_id.as_str().to_string(),
            status: JobStatus::Running,
            status_reason_code: "submitted".to_string(),
            stop_reason: None,
            environment_fingerprint,
            policy_digest: opts.policy_digest,
            policy_ref: opts.policy_ref,
            identity: opts.identity,
            safety_invariant_version: opts.safety_invariant_version,
            safety_invariant_hash,
            safety_invariants: opts.safety_invariants,
            checkpoints: Vec::new(),
            approvals: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        Self::save_state(&job_dir, &state)?;
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_submit", state.job_id),
                event_type: EventType::StateTransition,
                created_at: now,
                reason_code: "submitted".to_string(),
                actor: state.identity.clone(),
                payload: json!({"job_id": state.job_id, "from": "created", "to": "running"}),
            },
        )?;
        Ok(state)
    }

    /// Appends `checkpoint` to the job's timeline and updates status per
    /// `checkpoint.checkpoint_type`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] if the job is not currently
    /// `running`, or [`JobError::Schema`] if `checkpoint` fails validation or
    /// is a `decision-needed` checkpoint with no `required_action`.
    pub fn add_checkpoint(&self, job_id: &JobId, checkpoint: Checkpoint) -> Result<JobState, JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        let mut state = Self::load_state(&job_dir)?;
        if state.status != JobStatus::Running {
            return Err(JobError::InvalidTransition { from: status_name(state.status), event: "checkpoint".to_string() });
        }
        checkpoint.validate().map_err(|err| JobError::Schema(err.to_string()))?;
        if checkpoint.checkpoint_type == CheckpointType::DecisionNeeded && checkpoint.required_action.as_deref().unwrap_or("").trim().is_empty() {
            return Err(JobError::Schema("decision-needed checkpoint requires a non-empty required_action".to_string()));
        }

        let (next_status, reason_code) = match checkpoint.checkpoint_type {
            CheckpointType::Plan => (JobStatus::Running, "plan_recorded"),
            CheckpointType::Progress => (JobStatus::Running, "progress_recorded"),
            CheckpointType::DecisionNeeded => (JobStatus::DecisionNeeded, "decision_needed"),
            CheckpointType::Blocked => (JobStatus::Blocked, "blocked"),
            CheckpointType::Completed => (JobStatus::Completed, "completed"),
        };

        let now = Timestamp::now();
        let checkpoint_id = checkpoint.checkpoint_id.clone();
        state.checkpoints.push(checkpoint);
        state.status = next_status;
        state.status_reason_code = reason_code.to_string();
        state.updated_at = now;
        Self::save_state(&job_dir, &state)?;
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_{checkpoint_id}", state.job_id),
                event_type: EventType::CheckpointAdded,
                created_at: now,
                reason_code: reason_code.to_string(),
                actor: state.identity.clone(),
                payload: json!({"job_id": state.job_id, "checkpoint_id": checkpoint_id, "status": reason_code}),
            },
        )?;
        Ok(state)
    }

    /// Transitions a running job to `paused`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] if the job is not `running`.
    pub fn pause(&self, job_id: &JobId) -> Result<JobState, JobError> {
        self.transition_from_running(job_id, JobStatus::Paused, "paused", "pause")
    }

    /// Transitions a running, paused, blocked, or decision-needed job to `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] if the job is already terminal.
    pub fn cancel(&self, job_id: &JobId) -> Result<JobState, JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        let mut state = Self::load_state(&job_dir)?;
        if !matches!(state.status, JobStatus::Running | JobStatus::Paused | JobStatus::Blocked | JobStatus::DecisionNeeded) {
            return Err(JobError::InvalidTransition { from: status_name(state.status), event: "cancel".to_string() });
        }
        let now = Timestamp::now();
        let from = status_name(state.status);
        state.status = JobStatus::Cancelled;
        state.status_reason_code = "cancelled".to_string();
        state.updated_at = now;
        Self::save_state(&job_dir, &state)?;
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_cancel_{}", state.job_id, now.as_unix_millis()),
                event_type: EventType::StateTransition,
                created_at: now,
                reason_code: "cancelled".to_string(),
                actor: state.identity.clone(),
                payload: json!({"job_id": state.job_id, "from": from, "to": "cancelled"}),
            },
        )?;
        Ok(state)
    }

    fn transition_from_running(&self, job_id: &JobId, next_status: JobStatus, reason_code: &str, event_name: &str) -> Result<JobState, JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        let mut state = Self::load_state(&job_dir)?;
        if state.status != JobStatus::Running {
            return Err(JobError::InvalidTransition { from: status_name(state.status), event: event_name.to_string() });
        }
        let now = Timestamp::now();
        state.status = next_status;
        state.status_reason_code = reason_code.to_string();
        state.updated_at = now;
        Self::save_state(&job_dir, &state)?;
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_{event_name}_{}", state.job_id, now.as_unix_millis()),
                event_type: EventType::StateTransition,
                created_at: now,
                reason_code: reason_code.to_string(),
                actor: state.identity.clone(),
                payload: json!({"job_id": state.job_id, "from": "running", "to": reason_code}),
            },
        )?;
        Ok(state)
    }

    /// Fail-closed resume from `paused`, `blocked`, or `decision_needed` back
    /// to `running`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] if the job is not in a
    /// resumable state, or one of [`JobError::IdentityMismatch`],
    /// [`JobError::EnvironmentMismatch`], [`JobError::PolicyTransitionRequired`],
    /// [`JobError::IdentityValidationRequired`], [`JobError::IdentityRevoked`],
    /// or [`JobError::ApprovalRequired`] for the corresponding fail-closed check.
    pub fn resume(&self, job_id: &JobId, opts: ResumeOptions) -> Result<JobState, JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        let mut state = Self::load_state(&job_dir)?;
        if !matches!(state.status, JobStatus::Paused | JobStatus::Blocked | JobStatus::DecisionNeeded) {
            return Err(JobError::InvalidTransition { from: status_name(state.status), event: "resume".to_string() });
        }

        if opts.identity_revoked {
            return Err(JobError::IdentityRevoked);
        }

        match &state.identity {
            None => state.identity = opts.identity.clone(),
            Some(bound) if opts.identity.as_deref() == Some(bound.as_str()) => {}
            Some(bound) => return Err(JobError::IdentityMismatch { bound: bound.clone(), supplied: opts.identity.clone() }),
        }

        let mut env_overridden = false;
        if state.environment_fingerprint != opts.current_environment_fingerprint {
            if !opts.allow_env_mismatch || opts.reason.as_deref().unwrap_or("").trim().is_empty() {
                return Err(JobError::EnvironmentMismatch);
            }
            env_overridden = true;
        }

        let mut policy_transitioned = false;
        if let Some(bound_policy) = &state.policy_digest {
            let Some(supplied_policy) = &opts.policy_digest else {
                return Err(JobError::PolicyTransitionRequired);
            };
            if supplied_policy != bound_policy {
                if !opts.require_policy_evaluation {
                    return Err(JobError::PolicyTransitionRequired);
                }
                policy_transitioned = true;
                state.policy_digest = Some(supplied_policy.clone());
            }
        }

        if opts.require_identity_validation && opts.identity_validation_source.as_deref().unwrap_or("").trim().is_empty() {
            return Err(JobError::IdentityValidationRequired);
        }

        let decision_checkpoint_count = state.checkpoints.iter().filter(|checkpoint| checkpoint.checkpoint_type == CheckpointType::DecisionNeeded).count();
        if state.approvals.len() < decision_checkpoint_count {
            return Err(JobError::ApprovalRequired { required: decision_checkpoint_count, granted: state.approvals.len() });
        }

        let reason_code = match (env_overridden, policy_transitioned) {
            (true, true) => "resumed_with_env_override_policy_transition",
            (true, false) => "resumed_with_env_override",
            (false, true) => "resumed_with_policy_transition",
            (false, false) => "resumed",
        };

        let now = Timestamp::now();
        let from = status_name(state.status);
        state.status = JobStatus::Running;
        state.status_reason_code = reason_code.to_string();
        state.updated_at = now;
        Self::save_state(&job_dir, &state)?;
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_resume_{}", state.job_id, now.as_unix_millis()),
                event_type: EventType::StateTransition,
                created_at: now,
                reason_code: reason_code.to_string(),
                actor: state.identity.clone(),
                payload: json!({
                    "job_id": state.job_id,
                    "from": from,
                    "to": "running",
                    "policy_digest": state.policy_digest,
                    "identity": state.identity,
                }),
            },
        )?;
        Ok(state)
    }

    /// Idempotently halts a job. A no-op if the job is already
    /// `emergency_stopped`; fails if the job is otherwise terminal.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] if the job already reached
    /// `completed` or `cancelled`.
    pub fn emergency_stop(&self, job_id: &JobId, reason: Option<String>) -> Result<JobState, JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        let mut state = Self::load_state(&job_dir)?;
        if state.status == JobStatus::EmergencyStopped {
            return Ok(state);
        }
        if matches!(state.status, JobStatus::Completed | JobStatus::Cancelled) {
            return Err(JobError::InvalidTransition { from: status_name(state.status), event: "stop".to_string() });
        }
        let now = Timestamp::now();
        let from = status_name(state.status);
        state.status = JobStatus::EmergencyStopped;
        state.status_reason_code = "emergency_stop_preempted".to_string();
        state.stop_reason = reason;
        state.updated_at = now;
        Self::save_state(&job_dir, &state)?;
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_stop_{}", state.job_id, now.as_unix_millis()),
                event_type: EventType::EmergencyStopAcknowledged,
                created_at: now,
                reason_code: "emergency_stop_preempted".to_string(),
                actor: state.identity.clone(),
                payload: json!({"job_id": state.job_id, "from": from, "to": "emergency_stopped"}),
            },
        )?;
        Ok(state)
    }

    /// Journals a dispatch that was blocked by an emergency-stopped job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidTransition`] if the job is not currently
    /// `emergency_stopped`.
    pub fn record_blocked_dispatch(&self, job_id: &JobId, opts: BlockedDispatchOptions) -> Result<(), JobError> {
        let job_dir = self.job_dir(job_id);
        let _lock = self.acquire_lock(&job_dir)?;
        let state = Self::load_state(&job_dir)?;
        if state.status != JobStatus::EmergencyStopped {
            return Err(JobError::InvalidTransition { from: status_name(state.status), event: "record_blocked_dispatch".to_string() });
        }
        let now = Timestamp::now();
        Self::append_event(
            &job_dir,
            &Event {
                event_id: format!("{}_blocked_{}", state.job_id, now.as_unix_millis()),
                event_type: EventType::DispatchBlocked,
                created_at: now,
                reason_code: "emergency_stop_preempted".to_string(),
                actor: state.identity.clone(),
                payload: json!({"job_id": state.job_id, "tool_name": opts.tool_name, "intent_id": opts.intent_id}),
            },
        )
    }

    /// Reads a job's current persisted state without taking the lock.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] if no such job exists.
    pub fn status(&self, job_id: &JobId) -> Result<JobState, JobError> {
        Self::load_state(&self.job_dir(job_id))
    }

    /// Reads a job's full event journal in append order, for inspection.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] if the journal cannot be read, or
    /// [`JobError::Schema`] if a line fails to parse.
    pub fn events(&self, job_id: &JobId) -> Result<Vec<Event>, JobError> {
        let path = Self::events_path(&self.job_dir(job_id));
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(JobError::Store(err.to_string())),
        };
        contents.lines().filter(|line| !line.is_empty()).map(|line| Event::parse_line(line).map_err(|err| JobError::Schema(err.to_string()))).collect()
    }
}

fn status_name(status: JobStatus) -> String {
    match status {
        JobStatus::Running => "running",
        JobStatus::Paused => "paused",
        JobStatus::Blocked => "blocked",
        JobStatus::DecisionNeeded => "decision_needed",
        JobStatus::Completed => "completed",
        JobStatus::Cancelled => "cancelled",
        JobStatus::EmergencyStopped => "emergency_stopped",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::BlockedDispatchOptions;
    use super::JobRuntime;
    use super::ResumeOptions;
    use super::SubmitOptions;
    use gait_core::JobId;
    use gait_core::Timestamp;
    use gait_schema::Checkpoint;
    use gait_schema::CheckpointType;
    use gait_schema::JobStatus;

    fn runtime() -> (tempfile::TempDir, JobRuntime) {
        let dir = tempfile::tempdir().unwrap();
        let runtime = JobRuntime::new(dir.path());
        (dir, runtime)
    }

    fn checkpoint(kind: CheckpointType, required_action: Option<&str>) -> Checkpoint {
        Checkpoint {
            checkpoint_id: format!("cp_{kind:?}"),
            checkpoint_type: kind,
            summary: "checkpoint".to_string(),
            required_action: required_action.map(str::to_string),
            reason_code: "test".to_string(),
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn submit_creates_a_running_job() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        let state = runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        assert_eq!(state.status, JobStatus::Running);
    }

    #[test]
    fn duplicate_submit_is_rejected() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        assert!(runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).is_err());
    }

    #[test]
    fn decision_needed_checkpoint_without_required_action_is_rejected() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        let result = runtime.add_checkpoint(&job_id, checkpoint(CheckpointType::DecisionNeeded, None));
        assert!(result.is_err());
    }

    #[test]
    fn checkpoint_blocked_transitions_status_and_blocks_further_checkpoints() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        let state = runtime.add_checkpoint(&job_id, checkpoint(CheckpointType::Blocked, None)).unwrap();
        assert_eq!(state.status, JobStatus::Blocked);
        assert!(runtime.add_checkpoint(&job_id, checkpoint(CheckpointType::Progress, None)).is_err());
    }

    #[test]
    fn pause_then_resume_round_trips_to_running() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        let paused = runtime.pause(&job_id).unwrap();
        assert_eq!(paused.status, JobStatus::Paused);
        let resumed = runtime.resume(&job_id, ResumeOptions { current_environment_fingerprint: paused.environment_fingerprint.clone(), ..Default::default() }).unwrap();
        assert_eq!(resumed.status, JobStatus::Running);
        assert_eq!(resumed.status_reason_code, "resumed");
    }

    #[test]
    fn resume_rejects_environment_mismatch_without_override() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        runtime.pause(&job_id).unwrap();
        let result = runtime.resume(&job_id, ResumeOptions { current_environment_fingerprint: "different".to_string(), ..Default::default() });
        assert!(result.is_err());
    }

    #[test]
    fn resume_accepts_environment_mismatch_with_override_and_reason() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        runtime.pause(&job_id).unwrap();
        let resumed = runtime
            .resume(&job_id, ResumeOptions { current_environment_fingerprint: "different".to_string(), allow_env_mismatch: true, reason: Some("migrated host".to_string()), ..Default::default() })
            .unwrap();
        assert_eq!(resumed.status_reason_code, "resumed_with_env_override");
    }

    #[test]
    fn resume_requires_approvals_for_outstanding_decision_checkpoints() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        let state = runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        runtime.add_checkpoint(&job_id, checkpoint(CheckpointType::DecisionNeeded, Some("review the output"))).unwrap();
        let result = runtime.resume(&job_id, ResumeOptions { current_environment_fingerprint: state.environment_fingerprint, ..Default::default() });
        assert!(result.is_err());
    }

    #[test]
    fn resume_rejects_revoked_identity() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        let state = runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        runtime.pause(&job_id).unwrap();
        let result = runtime.resume(&job_id, ResumeOptions { current_environment_fingerprint: state.environment_fingerprint, identity_revoked: true, ..Default::default() });
        assert!(result.is_err());
    }

    #[test]
    fn emergency_stop_is_idempotent() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        let first = runtime.emergency_stop(&job_id, Some("incident".to_string())).unwrap();
        assert_eq!(first.status, JobStatus::EmergencyStopped);
        let second = runtime.emergency_stop(&job_id, None).unwrap();
        assert_eq!(second.status, JobStatus::EmergencyStopped);
    }

    #[test]
    fn emergency_stop_on_completed_job_is_rejected() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        runtime.add_checkpoint(&job_id, checkpoint(CheckpointType::Completed, None)).unwrap();
        assert!(runtime.emergency_stop(&job_id, None).is_err());
    }

    #[test]
    fn record_blocked_dispatch_requires_emergency_stopped_state() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        let opts = BlockedDispatchOptions { tool_name: "tool.write".to_string(), intent_id: None };
        assert!(runtime.record_blocked_dispatch(&job_id, opts.clone()).is_err());
        runtime.emergency_stop(&job_id, None).unwrap();
        assert!(runtime.record_blocked_dispatch(&job_id, opts).is_ok());
    }

    #[test]
    fn cancel_is_legal_from_blocked() {
        let (_dir, runtime) = runtime();
        let job_id = JobId::new("job_1");
        runtime.submit(&job_id, SubmitOptions { safety_invariant_version: "v1".to_string(), ..Default::default() }).unwrap();
        runtime.add_checkpoint(&job_id, checkpoint(CheckpointType::Blocked, None)).unwrap();
        let cancelled = runtime.cancel(&job_id).unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
    }
}
