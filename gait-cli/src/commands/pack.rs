// gait-cli/src/commands/pack.rs
// ============================================================================
// Module: Pack Command Group
// Description: Top-level `gait verify`, `gait pack {build,verify,inspect,diff}`,
// and `gait guard {pack,verify}`.
// Purpose: Give every pack type one uniform CLI surface over `gait_pack`'s
// build/verify/inspect/diff pipeline. `guard` is an Open Question alias:
// operators speak of "guarding" a run with evidence, so `guard pack`/
// `guard verify` are documented synonyms for `build_evidence_pack`/
// `verify_pack` rather than a separate mechanism (see DESIGN.md).
// Dependencies: gait-pack, gait-core, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::PublicKey;
use gait_pack::PackFile;
use gait_pack::RunpackRef;
use gait_pack::VerifyOptions;
use gait_pack::build_evidence_pack;
use gait_pack::diff_pack;
use gait_pack::inspect_pack;
use gait_pack::verify_pack;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// Arguments to the top-level `verify` command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to the pack archive to verify.
    archive: PathBuf,
    /// Path to the public key to check the pack's signature against.
    #[arg(long)]
    public_key: Option<PathBuf>,
    /// Fail if the archive carries no signature at all.
    #[arg(long)]
    require_signature: bool,
}

/// `gait pack` subcommands.
#[derive(Subcommand, Debug)]
pub enum PackCommand {
    /// Builds an evidence pack from arbitrary content files.
    Build(BuildArgs),
    /// Verifies a pack archive's integrity and signature.
    Verify(VerifyArgs),
    /// Summarizes a pack archive's contents.
    Inspect(InspectArgs),
    /// Diffs two pack archives of the same type.
    Diff(DiffArgs),
}

/// `gait guard` subcommands, aliasing the evidence-pack pipeline.
#[derive(Subcommand, Debug)]
pub enum GuardCommand {
    /// Builds a guard (evidence) pack from arbitrary content files.
    Pack(BuildArgs),
    /// Verifies a guard (evidence) pack's integrity and signature.
    Verify(VerifyArgs),
}

/// Arguments to `pack build` / `guard pack`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Paths to content files to embed in the pack, each stored under its
    /// own file name.
    #[arg(long = "content")]
    content: Vec<PathBuf>,
    /// Run IDs of prior packs this pack references.
    #[arg(long = "ref")]
    refs: Vec<String>,
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

/// Arguments to `pack inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the pack archive to inspect.
    archive: PathBuf,
}

/// Arguments to `pack diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Path to the first pack archive.
    first: PathBuf,
    /// Path to the second pack archive.
    second: PathBuf,
}

/// Verifies an archive against the top-level `verify` command's arguments.
///
/// # Errors
///
/// Propagates [`gait_pack::PackError`] if verification fails to run, or
/// [`CliError::Usage`] if the integrity check itself fails.
pub fn command_verify(ctx: &CliContext, args: &VerifyArgs) -> CliResult<std::process::ExitCode> {
    verify_archive(ctx, args)
}

/// Dispatches a `pack` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(ctx: &CliContext, command: PackCommand) -> CliResult<std::process::ExitCode> {
    match command {
        PackCommand::Build(args) => build_evidence(ctx, &args),
        PackCommand::Verify(args) => verify_archive(ctx, &args),
        PackCommand::Inspect(args) => command_inspect(&args),
        PackCommand::Diff(args) => command_diff(&args),
    }
}

/// Dispatches a `guard` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch_guard(ctx: &CliContext, command: GuardCommand) -> CliResult<std::process::ExitCode> {
    match command {
        GuardCommand::Pack(args) => build_evidence(ctx, &args),
        GuardCommand::Verify(args) => verify_archive(ctx, &args),
    }
}

fn build_evidence(ctx: &CliContext, args: &BuildArgs) -> CliResult<std::process::ExitCode> {
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
    let built = build_evidence_pack(&refs, content, signing_key.as_ref())?;
    std::fs::write(&args.out, &built.archive).map_err(|err| CliError::Usage(format!("failed to write {}: {err}", args.out.display())))?;
    print_json(&built.manifest)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn verify_archive(ctx: &CliContext, args: &VerifyArgs) -> CliResult<std::process::ExitCode> {
    let _ = ctx;
    let archive = output::read_file(&args.archive)?;
    let public_key = match &args.public_key {
        Some(path) => {
            let encoded = String::from_utf8(output::read_file(path)?).map_err(|err| CliError::Usage(err.to_string()))?;
            Some(PublicKey::from_base64(encoded.trim())?)
        }
        None => None,
    };
    let options = VerifyOptions {
        public_key: public_key.as_ref(),
        require_signature: args.require_signature,
    };
    let report = verify_pack(&archive, options)?;
    let integrity_ok = report.integrity_ok();
    print_json(&report)?;
    if integrity_ok {
        Ok(std::process::ExitCode::SUCCESS)
    } else {
        Ok(std::process::ExitCode::from(gait_core::ErrorCategory::ArtifactIntegrity.exit_code()))
    }
}

fn command_inspect(args: &InspectArgs) -> CliResult<std::process::ExitCode> {
    let archive = output::read_file(&args.archive)?;
    let summary = inspect_pack(&archive)?;
    print_json(&summary)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_diff(args: &DiffArgs) -> CliResult<std::process::ExitCode> {
    let first = output::read_file(&args.first)?;
    let second = output::read_file(&args.second)?;
    let diff = diff_pack(&first, &second)?;
    print_json(&diff)?;
    Ok(std::process::ExitCode::SUCCESS)
}
