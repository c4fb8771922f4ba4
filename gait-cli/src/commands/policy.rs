// gait-cli/src/commands/policy.rs
// ============================================================================
// Module: Policy Command Group
// Description: `gait policy {validate,fmt,test,init,simulate}`.
// Purpose: `validate` strict-parses a policy document through the same path
// the gate and service use. `fmt` canonicalizes a document's YAML
// formatting by round-tripping it through the typed `Policy` struct.
// `test`/`simulate` both evaluate a sample intent against the policy via
// `gait_policy::evaluate`, offline, with no broker or approved-script
// registry; `simulate` additionally reports the matched rule's priority
// rank so authors can see why a rule did or didn't win. `init` writes a
// minimal fail-closed template to start from.
// Dependencies: gait-policy, gait-schema, gait-core, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::Timestamp;
use gait_policy::GateInputs;
use gait_schema::IntentRequest;
use gait_schema::Policy;
use gait_schema::Verdict;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait policy` subcommands.
#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Strict-parses and validates a policy document.
    Validate(PolicyPathArgs),
    /// Canonicalizes a policy document's YAML formatting.
    Fmt(FmtArgs),
    /// Evaluates a sample intent against a policy document.
    Test(TestArgs),
    /// Evaluates a sample intent and reports the matched rule's rank.
    Simulate(TestArgs),
    /// Writes a minimal fail-closed policy template.
    Init(InitArgs),
}

/// Arguments naming a single policy document.
#[derive(Args, Debug)]
pub struct PolicyPathArgs {
    /// Path to the policy YAML document.
    policy: PathBuf,
}

/// Arguments to `policy fmt`.
#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Path to the policy YAML document.
    policy: PathBuf,
    /// Rewrite the document in place instead of printing it.
    #[arg(long)]
    write: bool,
}

/// Arguments to `policy test` / `policy simulate`.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Path to the policy YAML document.
    #[arg(long)]
    policy: PathBuf,
    /// Path to the sample intent JSON document.
    #[arg(long)]
    intent: PathBuf,
}

/// Arguments to `policy init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to write the new policy template to.
    out: PathBuf,
}

/// Dispatches a `policy` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(_ctx: &CliContext, command: PolicyCommand) -> CliResult<std::process::ExitCode> {
    match command {
        PolicyCommand::Validate(args) => command_validate(&args),
        PolicyCommand::Fmt(args) => command_fmt(&args),
        PolicyCommand::Test(args) => command_test(&args, false),
        PolicyCommand::Simulate(args) => command_test(&args, true),
        PolicyCommand::Init(args) => command_init(&args),
    }
}

fn command_validate(args: &PolicyPathArgs) -> CliResult<std::process::ExitCode> {
    let policy = Policy::parse_yaml(&output::read_file(&args.policy)?)?;
    print_json(&policy)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_fmt(args: &FmtArgs) -> CliResult<std::process::ExitCode> {
    let policy = Policy::parse_yaml(&output::read_file(&args.policy)?)?;
    let rendered = serde_yaml::to_string(&policy).map_err(|err| CliError::Usage(err.to_string()))?;
    if args.write {
        std::fs::write(&args.policy, rendered).map_err(|err| CliError::Usage(format!("failed to write {}: {err}", args.policy.display())))?;
    } else {
        print!("{rendered}");
    }
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_test(args: &TestArgs, simulate: bool) -> CliResult<std::process::ExitCode> {
    let policy = Policy::parse_yaml(&output::read_file(&args.policy)?)?;
    let intent = IntentRequest::parse(&output::read_file(&args.intent)?)?;
    let now = Timestamp::now();
    let inputs = GateInputs {
        intent: &intent,
        policy: &policy,
        approval_tokens: &[],
        delegation_tokens: &[],
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: None,
        now,
        decision_latency_ms: 0,
        trace_id: format!("trace_policy_test_{}", now.as_unix_millis()),
    };
    let (result, _trace) = gait_policy::evaluate(&inputs)?;
    if simulate {
        let rank = result.matched_rule.as_ref().and_then(|name| policy.rules.iter().position(|rule| &rule.name == name));
        print_json(&serde_json::json!({
            "verdict": result.verdict,
            "matched_rule": result.matched_rule,
            "matched_rule_rank": rank,
            "reason_codes": result.reason_codes,
            "violations": result.violations,
        }))?;
    } else {
        print_json(&serde_json::json!({
            "verdict": result.verdict,
            "matched_rule": result.matched_rule,
            "reason_codes": result.reason_codes,
            "violations": result.violations,
        }))?;
    }
    Ok(std::process::ExitCode::from(result.exit_code()))
}

fn command_init(args: &InitArgs) -> CliResult<std::process::ExitCode> {
    let policy = Policy {
        default_verdict: Verdict::Block,
        fail_closed: None,
        rules: Vec::new(),
    };
    let rendered = serde_yaml::to_string(&policy).map_err(|err| CliError::Usage(err.to_string()))?;
    std::fs::write(&args.out, rendered).map_err(|err| CliError::Usage(format!("failed to write {}: {err}", args.out.display())))?;
    Ok(std::process::ExitCode::SUCCESS)
}
