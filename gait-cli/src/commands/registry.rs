// gait-cli/src/commands/registry.rs
// ============================================================================
// Module: Registry Command Group
// Description: `gait registry {install,list,verify}`.
// Purpose: 1:1 CLI surface over `gait_registry`'s install/list/verify trust
// chain (publisher allowlist, digest pinning, signature verification).
// Dependencies: gait-registry, gait-core, gait-schema, url, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::PublicKey;
use gait_registry::InstallRequest;
use gait_registry::Source;
use gait_registry::install;
use gait_registry::list;
use gait_registry::verify;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait registry` subcommands.
#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Fetches, trust-verifies, and caches a registry manifest.
    Install(InstallArgs),
    /// Lists cached pack versions.
    List(ListArgs),
    /// Re-verifies a cached manifest against a trust key.
    Verify(RegistryVerifyArgs),
}

/// Arguments to `registry install`.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Local file path to install from.
    #[arg(long, conflicts_with = "url")]
    file: Option<PathBuf>,
    /// Remote HTTPS URL to install from.
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,
    /// Cache directory to persist the installed manifest under.
    #[arg(long)]
    cache_dir: PathBuf,
    /// Path to the trusted public key.
    #[arg(long)]
    public_key: PathBuf,
    /// Hosts a remote source is allowed to resolve to.
    #[arg(long = "allow-host")]
    allow_hosts: Vec<String>,
    /// Publishers accepted for this install.
    #[arg(long = "allow-publisher")]
    publisher_allowlist: Vec<String>,
    /// Digest the installed manifest must match.
    #[arg(long)]
    pin_digest: Option<String>,
    /// Allow installing from a plain-HTTP remote source.
    #[arg(long)]
    allow_insecure_http: bool,
    /// Fall back to the cached copy if the remote fetch fails.
    #[arg(long)]
    cached_fallback: bool,
}

/// Arguments to `registry list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Cache directory to enumerate.
    cache_dir: PathBuf,
}

/// Arguments to `registry verify`.
#[derive(Args, Debug)]
pub struct RegistryVerifyArgs {
    /// Path to the cached manifest to re-verify.
    metadata: PathBuf,
    /// Cache directory to cross-check the recorded pin against.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Path to the trusted public key.
    #[arg(long)]
    public_key: PathBuf,
}

/// Dispatches a `registry` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(_ctx: &CliContext, command: RegistryCommand) -> CliResult<std::process::ExitCode> {
    match command {
        RegistryCommand::Install(args) => command_install(&args),
        RegistryCommand::List(args) => command_list(&args),
        RegistryCommand::Verify(args) => command_verify(&args),
    }
}

fn load_public_key(path: &std::path::Path) -> CliResult<PublicKey> {
    let encoded = String::from_utf8(output::read_file(path)?).map_err(|err| CliError::Usage(err.to_string()))?;
    Ok(PublicKey::from_base64(encoded.trim())?)
}

fn command_install(args: &InstallArgs) -> CliResult<std::process::ExitCode> {
    let source = match (&args.file, &args.url) {
        (Some(path), None) => Source::LocalFile(path.clone()),
        (None, Some(url)) => Source::Remote(url::Url::parse(url).map_err(|err| CliError::Usage(err.to_string()))?),
        _ => return Err(CliError::Usage("exactly one of --file or --url is required".to_string())),
    };
    let public_key = load_public_key(&args.public_key)?;
    let request = InstallRequest {
        source,
        cache_dir: args.cache_dir.clone(),
        allow_hosts: args.allow_hosts.clone(),
        publisher_allowlist: args.publisher_allowlist.clone(),
        pin_digest: args.pin_digest.clone(),
        public_key: &public_key,
        allow_insecure_http: args.allow_insecure_http,
        cached_fallback: args.cached_fallback,
    };
    let report = install(&request)?;
    print_json(&serde_json::json!({
        "manifest": report.manifest,
        "signable_digest": report.signable_digest,
        "cached_path": report.cached_path,
        "fallback_used": report.fallback_used,
    }))?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_list(args: &ListArgs) -> CliResult<std::process::ExitCode> {
    let entries = list(&args.cache_dir)?;
    let rendered: Vec<_> = entries
        .into_iter()
        .map(|entry| {
            serde_json::json!({
                "pack_name": entry.pack_name,
                "pack_version": entry.pack_version,
                "digest": entry.digest,
                "path": entry.path,
                "pin_verified": entry.pin_verified,
            })
        })
        .collect();
    print_json(&rendered)?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_verify(args: &RegistryVerifyArgs) -> CliResult<std::process::ExitCode> {
    let public_key = load_public_key(&args.public_key)?;
    let report = verify(&args.metadata, args.cache_dir.as_deref(), &public_key)?;
    let signature_verified = report.signature_verified;
    print_json(&serde_json::json!({
        "manifest": report.manifest,
        "signable_digest": report.signable_digest,
        "signature_verified": report.signature_verified,
        "pin_verified": report.pin_verified,
    }))?;
    if signature_verified {
        Ok(std::process::ExitCode::SUCCESS)
    } else {
        Ok(std::process::ExitCode::from(gait_core::ErrorCategory::Trust.exit_code()))
    }
}
