// gait-cli/src/commands/mcp.rs
// ============================================================================
// Module: MCP Command Group
// Description: `gait mcp {serve,proxy,bridge}`.
// Purpose: `serve` is the only command that needs an async runtime: it
// builds a `ServiceState` from the loaded config and policy, spawns the
// retention sweeper alongside the HTTP server, and blocks until the server
// exits. `proxy` and `bridge` are a true alias pair (see `DESIGN.md`):
// both evaluate one intent through `gait_service::evaluate::evaluate_request`
// synchronously, so an MCP client-side adapter (out of this crate's scope)
// can shell out per call instead of holding an HTTP connection open.
// Dependencies: gait-service, gait-jobs, gait-schema, tokio, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::Timestamp;
use gait_schema::IntentRequest;
use gait_schema::Policy;
use gait_schema::tokens::ApprovalToken;
use gait_schema::tokens::DelegationToken;
use gait_service::evaluate::EvaluateRequest;
use gait_service::evaluate::evaluate_request;
use gait_service::state::ServiceState;
use gait_service::state::SuppliedTokens;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait mcp` subcommands.
#[derive(Subcommand, Debug)]
pub enum McpCommand {
    /// Serves the decision evaluation HTTP API.
    Serve(ServeArgs),
    /// Evaluates one intent through the decision logic, honoring emergency-stop preemption.
    Proxy(ProxyArgs),
    /// Alias of `proxy`, kept for the stable CLI surface.
    Bridge(ProxyArgs),
}

/// Arguments to `mcp serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the policy document this service evaluates every request
    /// against.
    #[arg(long)]
    policy: PathBuf,
    /// Root directory jobs and auto-emitted packs are persisted under.
    #[arg(long)]
    jobs_root: PathBuf,
    /// Key file to sign trace records and packs with.
    #[arg(long)]
    key_file: Option<PathBuf>,
}

/// Arguments to `mcp proxy` / `mcp bridge`.
#[derive(Args, Debug)]
pub struct ProxyArgs {
    /// Path to the intent JSON document to evaluate.
    #[arg(long)]
    intent: PathBuf,
    /// Path to the policy YAML document.
    #[arg(long)]
    policy: PathBuf,
    /// Root directory jobs are persisted under, consulted for emergency-stop
    /// preemption when the intent's `context.job_id` names a job there.
    #[arg(long)]
    jobs_root: PathBuf,
    /// Path to a JSON array of approval tokens presented with the intent.
    #[arg(long)]
    approvals: Option<PathBuf>,
    /// Path to a JSON array of delegation tokens presented with the intent.
    #[arg(long)]
    delegations: Option<PathBuf>,
    /// Key file to sign the resulting trace record with.
    #[arg(long)]
    key_file: Option<PathBuf>,
}

/// Dispatches an `mcp` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(ctx: &CliContext, command: McpCommand) -> CliResult<std::process::ExitCode> {
    match command {
        McpCommand::Serve(args) => command_serve(ctx, &args),
        McpCommand::Proxy(args) => command_proxy(ctx, &args),
        McpCommand::Bridge(args) => command_proxy(ctx, &args),
    }
}

fn command_serve(ctx: &CliContext, args: &ServeArgs) -> CliResult<std::process::ExitCode> {
    let config = ctx.load_config()?;
    let policy = Policy::parse_yaml(&output::read_file(&args.policy)?)?;
    let signing_key = match &args.key_file {
        Some(_) => Some(ctx.resolve_key(args.key_file.as_deref(), None)?),
        None => None,
    };

    let runtime = tokio::runtime::Runtime::new().map_err(|err| CliError::Usage(format!("failed to start async runtime: {err}")))?;
    runtime.block_on(async move {
        let state = gait_service::state::ServiceState::new(config.service, policy, signing_key, args.jobs_root.clone()).shared();
        let _sweeper = gait_service::spawn_sweeper(state.clone());
        gait_service::server::serve(state).await
    })?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_proxy(ctx: &CliContext, args: &ProxyArgs) -> CliResult<std::process::ExitCode> {
    let intent = IntentRequest::parse(&output::read_file(&args.intent)?)?;
    let policy = Policy::parse_yaml(&output::read_file(&args.policy)?)?;
    let approval_tokens: Vec<ApprovalToken> = match &args.approvals {
        Some(path) => serde_json::from_slice(&output::read_file(path)?).map_err(|err| CliError::Usage(err.to_string()))?,
        None => Vec::new(),
    };
    let delegation_tokens: Vec<DelegationToken> = match &args.delegations {
        Some(path) => serde_json::from_slice(&output::read_file(path)?).map_err(|err| CliError::Usage(err.to_string()))?,
        None => Vec::new(),
    };
    let signing_key = match &args.key_file {
        Some(_) => Some(ctx.resolve_key(args.key_file.as_deref(), None)?),
        None => None,
    };

    let state = ServiceState::new(Default::default(), policy, signing_key, args.jobs_root.clone());
    let request = EvaluateRequest {
        intent,
        tokens: SuppliedTokens { approval_tokens, delegation_tokens },
    };
    let trace_id = format!("trace_mcp_proxy_{}", Timestamp::now().as_unix_millis());
    let response = evaluate_request(&state, &request, trace_id)?;
    let exit_code = response.exit_code;
    print_json(&response)?;
    Ok(std::process::ExitCode::from(exit_code))
}
