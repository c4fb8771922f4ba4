// gait-cli/src/commands/run.rs
// ============================================================================
// Module: Run Command Group
// Description: `gait run {record,replay,diff,receipt,inspect}`.
// Purpose: Give operators one CLI surface over a run's captured intents and
// traces: `record` builds a run pack, `inspect`/`receipt` summarize one,
// `diff` compares two, and `replay` re-runs a run's declared fixture through
// `gait_regress` to confirm it still reaches the same verdicts.
// Dependencies: gait-pack, gait-regress, gait-schema, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_pack::InspectSummary;
use gait_pack::build_run_pack;
use gait_pack::diff_pack;
use gait_pack::inspect_pack;
use gait_regress::RegressConfig;
use gait_schema::IntentRequest;
use gait_schema::TraceRecord;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait run` subcommands.
#[derive(Subcommand, Debug)]
pub enum RunCommand {
    /// Builds a run pack from recorded intents and traces.
    Record(RecordArgs),
    /// Replays a run's declared fixture and reports whether it still passes.
    Replay(ReplayArgs),
    /// Diffs two run packs.
    Diff(DiffArgs),
    /// Prints a run pack's tool names and verdicts as a receipt.
    Receipt(InspectArgs),
    /// Summarizes a run pack's contents.
    Inspect(InspectArgs),
}

/// Arguments to `run record`.
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Run ID this pack is captured under.
    #[arg(long)]
    run_id: String,
    /// Paths to recorded intent JSON documents, in order.
    #[arg(long = "intent")]
    intents: Vec<PathBuf>,
    /// Paths to recorded trace JSON documents, in the same order.
    #[arg(long = "trace")]
    traces: Vec<PathBuf>,
    /// Path to write the built archive to.
    #[arg(long)]
    out: PathBuf,
    /// Sign the pack with the resolved signing key.
    #[arg(long)]
    sign: bool,
    /// Key file to load the signing key from, when `--sign` is set.
    #[arg(long)]
    key_file: Option<PathBuf>,
}

/// Arguments to `run replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Directory fixtures are replayed from.
    #[arg(long)]
    fixtures_root: PathBuf,
    /// Run ID to replay.
    run_id: String,
}

/// Arguments to `run diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Path to the first run pack archive.
    first: PathBuf,
    /// Path to the second run pack archive.
    second: PathBuf,
}

/// Arguments to `run inspect` / `run receipt`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the run pack archive.
    archive: PathBuf,
}

/// Dispatches a `run` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(ctx: &CliContext, command: RunCommand) -> CliResult<std::process::ExitCode> {
    match command {
        RunCommand::Record(args) => command_record(ctx, &args),
        RunCommand::Replay(args) => command_replay(&args),
        RunCommand::Diff(args) => command_diff(&args),
        RunCommand::Receipt(args) => command_receipt(&args),
        RunCommand::Inspect(args) => command_inspect(&args),
    }
}

fn command_record(ctx: &CliContext, args: &RecordArgs) -> CliResult<std::process::ExitCode> {
    let mut intents = Vec::with_capacity(args.intents.len());
    for path in &args.intents {
        intents.push(IntentRequest::parse(&output::read_file(path)?)?);
    }
    let mut traces = Vec::with_capacity(args.traces.len());
    for path in &args.traces {
        traces.push(TraceRecord::parse(&output::read_file(path)?)?);
    }
    let signing_key = if args.sign { Some(ctx.resolve_key(args.key_file.as_deref(), None)?) } else { None };
    let built = build_run_pack(&args.run_id, &intents, &traces, signing_key.as_ref())?;
    std::fs::write(&args.out, &built.archive).map_err(|err| CliError::Usage(format!("failed to write {}: {err}", args.out.display())))?;
    print_json(&built.manifest)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_replay(args: &ReplayArgs) -> CliResult<std::process::ExitCode> {
    let mut config = RegressConfig::empty();
    config.declare_fixture(&args.run_id);
    let report = gait_regress::run(&args.fixtures_root, &config)?;
    let exit_code = report.exit_code();
    print_json(&report)?;
    Ok(std::process::ExitCode::from(u8::try_from(exit_code).unwrap_or(1)))
}

fn command_diff(args: &DiffArgs) -> CliResult<std::process::ExitCode> {
    let first = output::read_file(&args.first)?;
    let second = output::read_file(&args.second)?;
    let diff = diff_pack(&first, &second)?;
    print_json(&diff)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_inspect(args: &InspectArgs) -> CliResult<std::process::ExitCode> {
    let archive = output::read_file(&args.archive)?;
    let summary = inspect_pack(&archive)?;
    print_json(&summary)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_receipt(args: &InspectArgs) -> CliResult<std::process::ExitCode> {
    let archive = output::read_file(&args.archive)?;
    let summary = inspect_pack(&archive)?;
    match summary {
        InspectSummary::Run(run) => {
            print_json(&serde_json::json!({
                "run_id": run.run_id,
                "tool_calls": run.intent_tool_names,
                "verdicts": run.trace_verdicts,
            }))?;
            Ok(std::process::ExitCode::SUCCESS)
        }
        other => Err(CliError::Usage(format!("receipt requires a run pack, found {other:?}"))),
    }
}
