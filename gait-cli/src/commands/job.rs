// gait-cli/src/commands/job.rs
// ============================================================================
// Module: Job Command Group
// Description: `gait job {submit,status,inspect,checkpoint,pause,resume,
// approve,cancel,stop}`.
// Purpose: 1:1 CLI surface over `gait_jobs::JobRuntime`'s transition table.
// `approve` is sugar over `resume` with `require_policy_evaluation: true`,
// matching how an operator actually unblocks a job pending policy sign-off
// without exposing `ResumeOptions`' full shape on the happy path.
// `stop` is the CLI name for `emergency_stop`.
// Dependencies: gait-jobs, gait-core, gait-schema, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::JobId;
use gait_core::Timestamp;
use gait_jobs::JobRuntime;
use gait_jobs::ResumeOptions;
use gait_jobs::SubmitOptions;
use gait_schema::Checkpoint;
use gait_schema::CheckpointType;

use crate::CliResult;
use crate::context::CliContext;
use crate::output::print_json;

/// `gait job` subcommands.
#[derive(Subcommand, Debug)]
pub enum JobCommand {
    /// Submits a new job.
    Submit(SubmitArgs),
    /// Prints a job's current state.
    Status(JobIdArgs),
    /// Prints a job's full event journal alongside its current state.
    Inspect(JobIdArgs),
    /// Appends a checkpoint to a job's timeline.
    Checkpoint(CheckpointArgs),
    /// Pauses a running job.
    Pause(JobIdArgs),
    /// Resumes a paused job.
    Resume(ResumeArgs),
    /// Resumes a job pending policy approval.
    Approve(ResumeArgs),
    /// Cancels a job.
    Cancel(JobIdArgs),
    /// Emergency-stops a job.
    Stop(StopArgs),
}

/// Arguments identifying a single job.
#[derive(Args, Debug)]
pub struct JobIdArgs {
    /// Root directory jobs are persisted under.
    #[arg(long)]
    jobs_root: PathBuf,
    /// The job's identifier.
    job_id: String,
}

/// Arguments to `job submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Root directory jobs are persisted under.
    #[arg(long)]
    jobs_root: PathBuf,
    /// The new job's identifier.
    job_id: String,
    /// Identity to bind the job to.
    #[arg(long)]
    identity: Option<String>,
    /// Digest of the policy governing this job.
    #[arg(long)]
    policy_digest: Option<String>,
    /// Reference to the policy document governing this job.
    #[arg(long)]
    policy_ref: Option<String>,
    /// Version label of the safety invariant set in force.
    #[arg(long, default_value = "v1")]
    safety_invariant_version: String,
    /// Safety invariant names in force.
    #[arg(long = "safety-invariant")]
    safety_invariants: Vec<String>,
}

/// Arguments to `job checkpoint`.
#[derive(Args, Debug)]
pub struct CheckpointArgs {
    /// Root directory jobs are persisted under.
    #[arg(long)]
    jobs_root: PathBuf,
    /// The job's identifier.
    job_id: String,
    /// Unique identifier for the new checkpoint.
    #[arg(long)]
    checkpoint_id: String,
    /// The checkpoint's type.
    #[arg(long, value_enum)]
    checkpoint_type: CheckpointTypeArg,
    /// Human-readable summary, at most 512 characters.
    #[arg(long)]
    summary: String,
    /// Reason code explaining why this checkpoint was recorded.
    #[arg(long)]
    reason_code: String,
    /// Action required of an operator before the job may proceed.
    #[arg(long)]
    required_action: Option<String>,
}

/// Mirrors [`gait_schema::job::CheckpointType`] as a `clap::ValueEnum`.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum CheckpointTypeArg {
    Plan,
    Progress,
    DecisionNeeded,
    Blocked,
    Completed,
}

impl From<CheckpointTypeArg> for CheckpointType {
    fn from(value: CheckpointTypeArg) -> Self {
        match value {
            CheckpointTypeArg::Plan => CheckpointType::Plan,
            CheckpointTypeArg::Progress => CheckpointType::Progress,
            CheckpointTypeArg::DecisionNeeded => CheckpointType::DecisionNeeded,
            CheckpointTypeArg::Blocked => CheckpointType::Blocked,
            CheckpointTypeArg::Completed => CheckpointType::Completed,
        }
    }
}

/// Arguments to `job resume` / `job approve`.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Root directory jobs are persisted under.
    #[arg(long)]
    jobs_root: PathBuf,
    /// The job's identifier.
    job_id: String,
    /// Identity requesting the resume.
    #[arg(long)]
    identity: Option<String>,
    /// The environment fingerprint observed at resume time.
    #[arg(long, default_value = "")]
    current_environment_fingerprint: String,
    /// Permits a fingerprint mismatch, given `--reason`.
    #[arg(long)]
    allow_env_mismatch: bool,
    /// Required justification when `--allow-env-mismatch` is used.
    #[arg(long)]
    reason: Option<String>,
    /// The policy digest the resuming caller expects to be bound to.
    #[arg(long)]
    policy_digest: Option<String>,
    /// Source that validated `--identity`.
    #[arg(long)]
    identity_validation_source: Option<String>,
    /// Marks the supplied identity as revoked, forcing resume to fail.
    #[arg(long)]
    identity_revoked: bool,
}

/// Arguments to `job stop`.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Root directory jobs are persisted under.
    #[arg(long)]
    jobs_root: PathBuf,
    /// The job's identifier.
    job_id: String,
    /// Reason the job was emergency-stopped.
    #[arg(long)]
    reason: Option<String>,
}

/// Dispatches a `job` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(_ctx: &CliContext, command: JobCommand) -> CliResult<std::process::ExitCode> {
    match command {
        JobCommand::Submit(args) => command_submit(&args),
        JobCommand::Status(args) => command_status(&args),
        JobCommand::Inspect(args) => command_inspect(&args),
        JobCommand::Checkpoint(args) => command_checkpoint(&args),
        JobCommand::Pause(args) => command_pause(&args),
        JobCommand::Resume(args) => command_resume(&args, false),
        JobCommand::Approve(args) => command_resume(&args, true),
        JobCommand::Cancel(args) => command_cancel(&args),
        JobCommand::Stop(args) => command_stop(&args),
    }
}

fn command_submit(args: &SubmitArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.submit(
        &job_id,
        SubmitOptions {
            identity: args.identity.clone(),
            policy_digest: args.policy_digest.clone(),
            policy_ref: args.policy_ref.clone(),
            safety_invariant_version: args.safety_invariant_version.clone(),
            safety_invariants: args.safety_invariants.clone(),
            environment_fingerprint_override: None,
        },
    )?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_status(args: &JobIdArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.status(&job_id)?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_inspect(args: &JobIdArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.status(&job_id)?;
    let events = runtime.events(&job_id)?;
    print_json(&serde_json::json!({"state": state, "events": events}))?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_checkpoint(args: &CheckpointArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let checkpoint = Checkpoint {
        checkpoint_id: args.checkpoint_id.clone(),
        checkpoint_type: args.checkpoint_type.into(),
        summary: args.summary.clone(),
        required_action: args.required_action.clone(),
        reason_code: args.reason_code.clone(),
        created_at: Timestamp::now(),
    };
    let state = runtime.add_checkpoint(&job_id, checkpoint)?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_pause(args: &JobIdArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.pause(&job_id)?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_resume(args: &ResumeArgs, is_approve: bool) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.resume(
        &job_id,
        ResumeOptions {
            identity: args.identity.clone(),
            current_environment_fingerprint: args.current_environment_fingerprint.clone(),
            allow_env_mismatch: args.allow_env_mismatch,
            reason: args.reason.clone(),
            policy_digest: args.policy_digest.clone(),
            require_policy_evaluation: is_approve,
            require_identity_validation: args.identity_validation_source.is_some(),
            identity_validation_source: args.identity_validation_source.clone(),
            identity_revoked: args.identity_revoked,
        },
    )?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_cancel(args: &JobIdArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.cancel(&job_id)?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_stop(args: &StopArgs) -> CliResult<std::process::ExitCode> {
    let runtime = JobRuntime::new(args.jobs_root.clone());
    let job_id = JobId::new(args.job_id.clone());
    let state = runtime.emergency_stop(&job_id, args.reason.clone())?;
    print_json(&state)?;
    Ok(std::process::ExitCode::SUCCESS)
}
