// gait-cli/src/main.rs
// ============================================================================
// Module: Gait CLI Entry Point
// Description: Command dispatcher binding the stable CLI surface (spec.md
// §6) to the gait-* library crates.
// Purpose: Stay a thin wiring layer: every subcommand body parses its
// arguments, calls one library function, and maps the result to the stable
// exit-code table.
// Dependencies: clap, gait-core, gait-jobs, gait-ledger, gait-pack,
// gait-policy, gait-regress, gait-registry, gait-schema, gait-service, tokio
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-cli::main` (`Parser`/
//! `Subcommand` dispatch, one `command_*` function per subcommand, a single
//! error wrapper mapped to an [`std::process::ExitCode`] at the boundary).
//! Unlike the teacher, this crate carries no i18n catalog: `spec.md` §1's
//! Non-goals put argument parsing and help text for this surface out of
//! core scope, and a localization layer would be the opposite of thin
//! wiring. Every [`CliError`] instead classifies itself through
//! [`gait_core::GaitError`] the same way every library error already does,
//! so the exit-code table in `spec.md` §6/§7 is enforced in exactly one
//! place: [`CliError::exit_code`].

mod commands;
mod context;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use gait_core::GaitError;
use thiserror::Error;

use crate::commands::gate;
use crate::commands::incident;
use crate::commands::job;
use crate::commands::keys;
use crate::commands::ledger;
use crate::commands::mcp;
use crate::commands::pack;
use crate::commands::policy;
use crate::commands::regress;
use crate::commands::registry;
use crate::commands::run;
use crate::commands::stub;
use crate::context::CliContext;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "gait", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Path to the Gait config document (falls back to `GAIT_CONFIG`).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Use an ephemeral dev signing key instead of loading a configured one.
    #[arg(long, global = true)]
    dev: bool,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands, per `spec.md` §6.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the bundled end-to-end demo scenario.
    Demo,
    /// Verifies a pack archive's integrity and signature.
    Verify(pack::VerifyArgs),
    /// Runpack recording and inspection utilities.
    Run {
        /// Selected run subcommand.
        #[command(subcommand)]
        command: run::RunCommand,
    },
    /// Deterministic replay fixture management.
    Regress {
        /// Selected regress subcommand.
        #[command(subcommand)]
        command: regress::RegressCommand,
    },
    /// Policy document authoring and validation.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: policy::PolicyCommand,
    },
    /// Policy gate operations.
    Gate {
        /// Selected gate subcommand.
        #[command(subcommand)]
        command: gate::GateCommand,
    },
    /// Mints a signed approval token.
    Approve(ledger::ApproveArgs),
    /// Trace record operations.
    Trace {
        /// Selected trace subcommand.
        #[command(subcommand)]
        command: ledger::TraceCommand,
    },
    /// Pack build/verify/inspect/diff utilities.
    Pack {
        /// Selected pack subcommand.
        #[command(subcommand)]
        command: pack::PackCommand,
    },
    /// Registry client operations.
    Registry {
        /// Selected registry subcommand.
        #[command(subcommand)]
        command: registry::RegistryCommand,
    },
    /// Guard-evidence pack utilities (alias over `pack build --kind
    /// evidence` / `pack verify`; see `DESIGN.md`).
    Guard {
        /// Selected guard subcommand.
        #[command(subcommand)]
        command: pack::GuardCommand,
    },
    /// Incident pack assembly.
    Incident {
        /// Selected incident subcommand.
        #[command(subcommand)]
        command: incident::IncidentCommand,
    },
    /// Durable job lifecycle operations.
    Job {
        /// Selected job subcommand.
        #[command(subcommand)]
        command: job::JobCommand,
    },
    /// MCP server/proxy operations.
    Mcp {
        /// Selected mcp subcommand.
        #[command(subcommand)]
        command: mcp::McpCommand,
    },
    /// Diagnoses the local environment (out of core scope; see `spec.md` §1).
    Doctor,
    /// Signing key lifecycle operations.
    Keys {
        /// Selected keys subcommand.
        #[command(subcommand)]
        command: keys::KeysCommand,
    },
    /// Voice adapter operations (out of core scope; see `spec.md` §1).
    Voice {
        /// Selected voice subcommand.
        #[command(subcommand)]
        command: stub::VoiceCommand,
    },
}

/// Errors raised dispatching a CLI command, wrapping every library error
/// this crate calls into.
#[derive(Debug, Error)]
pub enum CliError {
    /// A policy gate evaluation failed before reaching a verdict.
    #[error(transparent)]
    Gate(#[from] gait_policy::GateError),
    /// A job-runtime operation failed.
    #[error(transparent)]
    Job(#[from] gait_jobs::JobError),
    /// A ledger (approval/delegation/trace) operation failed.
    #[error(transparent)]
    Ledger(#[from] gait_ledger::LedgerError),
    /// A pack build/verify/inspect/diff operation failed.
    #[error(transparent)]
    Pack(#[from] gait_pack::PackError),
    /// A regression fixture operation failed.
    #[error(transparent)]
    Regress(#[from] gait_regress::RegressError),
    /// A registry client operation failed.
    #[error(transparent)]
    Registry(#[from] gait_registry::RegistryError),
    /// A schema parse or validation failed.
    #[error(transparent)]
    Schema(#[from] gait_schema::SchemaError),
    /// Loading the Gait configuration document failed.
    #[error(transparent)]
    Config(#[from] gait_schema::config::ConfigError),
    /// The decision service's HTTP transport failed to bind or serve.
    #[error(transparent)]
    Server(#[from] gait_service::server::ServerError),
    /// A `mcp proxy`/`mcp bridge` evaluation failed outside the gate itself.
    #[error(transparent)]
    Service(#[from] gait_service::ServiceError),
    /// A key-signing primitive failed.
    #[error(transparent)]
    Signing(#[from] gait_core::SigningError),
    /// A plain filesystem or argument error with no richer classification.
    #[error("{0}")]
    Usage(String),
}

impl gait_core::GaitError for CliError {
    fn category(&self) -> gait_core::ErrorCategory {
        match self {
            Self::Gate(err) => err.category(),
            Self::Job(err) => err.category(),
            Self::Ledger(err) => err.category(),
            Self::Pack(err) => err.category(),
            Self::Regress(err) => err.category(),
            Self::Registry(err) => err.category(),
            Self::Schema(err) => err.category(),
            Self::Config(err) => err.category(),
            Self::Server(_) => gait_core::ErrorCategory::Environment,
            Self::Service(err) => err.category(),
            Self::Signing(_) => gait_core::ErrorCategory::Trust,
            Self::Usage(_) => gait_core::ErrorCategory::Input,
        }
    }
}

/// CLI result alias for fallible operations.
pub type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ctx = CliContext::new(cli.config, cli.dev);
    match dispatch(cli.command, &ctx) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("gait: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn dispatch(command: Commands, ctx: &CliContext) -> CliResult<ExitCode> {
    match command {
        Commands::Demo => stub::command_demo(),
        Commands::Verify(args) => pack::command_verify(ctx, &args),
        Commands::Run { command } => run::dispatch(ctx, command),
        Commands::Regress { command } => regress::dispatch(ctx, command),
        Commands::Policy { command } => policy::dispatch(ctx, command),
        Commands::Gate { command } => gate::dispatch(ctx, command),
        Commands::Approve(args) => ledger::command_approve(ctx, &args),
        Commands::Trace { command } => ledger::dispatch_trace(ctx, command),
        Commands::Pack { command } => pack::dispatch(ctx, command),
        Commands::Registry { command } => registry::dispatch(ctx, command),
        Commands::Guard { command } => pack::dispatch_guard(ctx, command),
        Commands::Incident { command } => incident::dispatch(ctx, command),
        Commands::Job { command } => job::dispatch(ctx, command),
        Commands::Mcp { command } => mcp::dispatch(ctx, command),
        Commands::Doctor => stub::command_doctor(),
        Commands::Keys { command } => keys::dispatch(ctx, command),
        Commands::Voice { command } => stub::command_voice(command),
    }
}
