// gait-cli/src/commands/regress.rs
// ============================================================================
// Module: Regress Command Group
// Description: `gait regress {init,run,bootstrap}`.
// Purpose: 1:1 CLI surface over `gait_regress`'s capture/replay pipeline,
// with an optional `--junit` flag to render CI-consumable output alongside
// the JSON report.
// Dependencies: gait-regress, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_regress::RegressConfig;
use gait_regress::bootstrap;
use gait_regress::init;
use gait_regress::render;
use gait_regress::run;

use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait regress` subcommands.
#[derive(Subcommand, Debug)]
pub enum RegressCommand {
    /// Captures a fixture from a runpack archive and declares it.
    Init(InitArgs),
    /// Replays every declared fixture and reports outcomes.
    Run(RunArgs),
    /// Captures a fixture and immediately replays it as a self-check.
    Bootstrap(InitArgs),
}

/// Arguments shared by `regress init` and `regress bootstrap`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory fixtures are captured under.
    #[arg(long)]
    fixtures_root: PathBuf,
    /// Path to the regression config file to declare the fixture in.
    #[arg(long)]
    config: PathBuf,
    /// Run ID to capture the fixture under.
    #[arg(long)]
    run_id: String,
    /// Path to the runpack archive to capture.
    archive: PathBuf,
}

/// Arguments to `regress run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory fixtures are replayed from.
    #[arg(long)]
    fixtures_root: PathBuf,
    /// Path to the regression config file declaring fixtures to replay.
    #[arg(long)]
    config: PathBuf,
    /// Also render the report as JUnit XML to this path.
    #[arg(long)]
    junit: Option<PathBuf>,
}

/// Dispatches a `regress` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(_ctx: &CliContext, command: RegressCommand) -> CliResult<std::process::ExitCode> {
    match command {
        RegressCommand::Init(args) => command_init(&args),
        RegressCommand::Run(args) => command_run(&args),
        RegressCommand::Bootstrap(args) => command_bootstrap(&args),
    }
}

fn command_init(args: &InitArgs) -> CliResult<std::process::ExitCode> {
    let archive = output::read_file(&args.archive)?;
    let fixture = init(&args.fixtures_root, &args.config, &args.run_id, &archive)?;
    print_json(&fixture)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_bootstrap(args: &InitArgs) -> CliResult<std::process::ExitCode> {
    let archive = output::read_file(&args.archive)?;
    let (fixture, report) = bootstrap(&args.fixtures_root, &args.config, &args.run_id, &archive)?;
    let exit_code = report.exit_code();
    print_json(&serde_json::json!({"fixture": fixture, "report": report}))?;
    Ok(std::process::ExitCode::from(u8::try_from(exit_code).unwrap_or(1)))
}

fn command_run(args: &RunArgs) -> CliResult<std::process::ExitCode> {
    let config = RegressConfig::load(&args.config)?;
    let report = run(&args.fixtures_root, &config)?;
    if let Some(junit_path) = &args.junit {
        std::fs::write(junit_path, render(&report)).map_err(|err| crate::CliError::Usage(format!("failed to write {}: {err}", junit_path.display())))?;
    }
    let exit_code = report.exit_code();
    print_json(&report)?;
    Ok(std::process::ExitCode::from(u8::try_from(exit_code).unwrap_or(1)))
}
