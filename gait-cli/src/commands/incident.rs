// gait-cli/src/commands/incident.rs
// ============================================================================
// Module: Incident Command Group
// Description: `gait incident pack`.
// Purpose: Build an incident bundle referencing prior runpacks plus
// supplemental content, 1:1 over `gait_pack::build_incident_pack`.
// Dependencies: gait-pack, gait-core, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_pack::PackFile;
use gait_pack::RunpackRef;
use gait_pack::build_incident_pack;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait incident` subcommands.
#[derive(Subcommand, Debug)]
pub enum IncidentCommand {
    /// Builds an incident pack referencing prior runpacks.
    Pack(PackArgs),
}

/// Arguments to `incident pack`.
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Run IDs of prior packs this incident references.
    #[arg(long = "ref")]
    refs: Vec<String>,
    /// Paths to supplemental content files to embed.
    #[arg(long = "content")]
    content: Vec<PathBuf>,
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

/// Dispatches an `incident` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(ctx: &CliContext, command: IncidentCommand) -> CliResult<std::process::ExitCode> {
    match command {
        IncidentCommand::Pack(args) => command_pack(ctx, &args),
    }
}

fn command_pack(ctx: &CliContext, args: &PackArgs) -> CliResult<std::process::ExitCode> {
    let mut content = Vec::with_capacity(args.content.len());
    for path in &args.content {
        let bytes = output::read_file(path)?;
        let name = path.file_name().and_then(|name| name.to_str()).ok_or_else(|| CliError::Usage(format!("invalid content file name: {}", path.display())))?;
        content.push(PackFile::binary(name.to_string(), bytes));
    }
    let refs: Vec<RunpackRef> = args
        .refs
        .iter()
        .map(|run_id| RunpackRef {
            ref_id: run_id.clone(),
            content_digest: String::new(),
            kind: "run".to_string(),
        })
        .collect();
    let signing_key = if args.sign { Some(ctx.resolve_key(args.key_file.as_deref(), None)?) } else { None };
    let built = build_incident_pack(&refs, content, signing_key.as_ref())?;
    std::fs::write(&args.out, &built.archive).map_err(|err| CliError::Usage(format!("failed to write {}: {err}", args.out.display())))?;
    print_json(&built.manifest)?;
    Ok(std::process::ExitCode::SUCCESS)
}
