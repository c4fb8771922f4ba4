// gait-cli/src/commands/gate.rs
// ============================================================================
// Module: Gate Command Group
// Description: `gait gate eval`.
// Purpose: Evaluate one intent against one policy document, exactly as
// `gait_policy::evaluate` computes it, with no broker or approved-script
// registry wired in (the CLI evaluates offline; a broker/registry-backed
// evaluation only happens through `gait-service`).
// Dependencies: gait-policy, gait-schema, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::Timestamp;
use gait_policy::GateInputs;
use gait_schema::IntentRequest;
use gait_schema::Policy;
use gait_schema::tokens::ApprovalToken;
use gait_schema::tokens::DelegationToken;
use serde::Serialize;

use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait gate` subcommands.
#[derive(Subcommand, Debug)]
pub enum GateCommand {
    /// Evaluates an intent against a policy document.
    Eval(EvalArgs),
}

/// Arguments to `gate eval`.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Path to the intent JSON document.
    #[arg(long)]
    intent: PathBuf,
    /// Path to the policy YAML document.
    #[arg(long)]
    policy: PathBuf,
    /// Path to a JSON array of approval tokens presented with the intent.
    #[arg(long)]
    approvals: Option<PathBuf>,
    /// Path to a JSON array of delegation tokens presented with the intent.
    #[arg(long)]
    delegations: Option<PathBuf>,
    /// Sign the resulting trace record with the resolved signing key.
    #[arg(long)]
    sign: bool,
    /// Key file to load the signing key from, when `--sign` is set.
    #[arg(long)]
    key_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct EvalOutput {
    verdict: gait_schema::Verdict,
    exit_code: u8,
    reason_codes: Vec<String>,
    violations: Vec<String>,
    matched_rule: Option<String>,
    trace: gait_schema::TraceRecord,
}

/// Dispatches a `gate` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(ctx: &CliContext, command: GateCommand) -> CliResult<std::process::ExitCode> {
    match command {
        GateCommand::Eval(args) => command_eval(ctx, &args),
    }
}

fn command_eval(ctx: &CliContext, args: &EvalArgs) -> CliResult<std::process::ExitCode> {
    let intent = IntentRequest::parse(&output::read_file(&args.intent)?)?;
    let policy = Policy::parse_yaml(&output::read_file(&args.policy)?)?;
    let approval_tokens: Vec<ApprovalToken> = match &args.approvals {
        Some(path) => serde_json::from_slice(&output::read_file(path)?).map_err(|err| crate::CliError::Usage(err.to_string()))?,
        None => Vec::new(),
    };
    let delegation_tokens: Vec<DelegationToken> = match &args.delegations {
        Some(path) => serde_json::from_slice(&output::read_file(path)?).map_err(|err| crate::CliError::Usage(err.to_string()))?,
        None => Vec::new(),
    };
    let signing_key = if args.sign { Some(ctx.resolve_key(args.key_file.as_deref(), None)?) } else { None };

    let now = Timestamp::now();
    let inputs = GateInputs {
        intent: &intent,
        policy: &policy,
        approval_tokens: &approval_tokens,
        delegation_tokens: &delegation_tokens,
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: signing_key.as_ref(),
        now,
        decision_latency_ms: 0,
        trace_id: format!("trace_cli_{}", now.as_unix_millis()),
    };
    let (result, trace) = gait_policy::evaluate(&inputs)?;
    let exit_code = result.exit_code();

    print_json(&EvalOutput {
        verdict: result.verdict,
        exit_code,
        reason_codes: result.reason_codes,
        violations: result.violations,
        matched_rule: result.matched_rule,
        trace,
    })?;
    Ok(std::process::ExitCode::from(exit_code))
}
