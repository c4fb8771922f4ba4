// gait-cli/src/commands/ledger.rs
// ============================================================================
// Module: Ledger Command Group
// Description: `gait approve`, `gait trace verify`.
// Purpose: Mint a signed approval token and verify a signed trace record,
// 1:1 against `gait_ledger`'s mint/verify entry points.
// Dependencies: gait-ledger, gait-core, gait-schema, clap
// ============================================================================

use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::PublicKey;
use gait_core::Timestamp;
use gait_ledger::mint_approval;
use gait_ledger::verify_trace;
use gait_schema::trace::TraceRecord;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// Arguments to the top-level `approve` command.
#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Identifier minted for the new token.
    #[arg(long)]
    token_id: String,
    /// Digest of the intent this approval binds to.
    #[arg(long)]
    intent_digest: String,
    /// Digest of the policy this approval binds to.
    #[arg(long)]
    policy_digest: String,
    /// Scope strings granted by this approval.
    #[arg(long = "scope")]
    scope: Vec<String>,
    /// Identity of the approver minting this token.
    #[arg(long)]
    approver_identity: String,
    /// Reason code recorded on the token.
    #[arg(long)]
    reason_code: String,
    /// RFC 3339 instant the token expires.
    #[arg(long)]
    expires_at: String,
    /// Key file to load the signing key from.
    #[arg(long)]
    key_file: Option<PathBuf>,
}

/// `gait trace` subcommands.
#[derive(Subcommand, Debug)]
pub enum TraceCommand {
    /// Verifies a trace record's signature.
    Verify(TraceVerifyArgs),
}

/// Arguments to `trace verify`.
#[derive(Args, Debug)]
pub struct TraceVerifyArgs {
    /// Path to the trace record JSON document.
    trace: PathBuf,
    /// Path to the base64-encoded public key to verify against.
    #[arg(long)]
    public_key: PathBuf,
}

/// Mints a signed approval token and prints it to stdout.
///
/// # Errors
///
/// Propagates [`gait_ledger::LedgerError`] if minting fails, or
/// [`CliError::Usage`] if `--expires-at` fails to parse.
pub fn command_approve(ctx: &CliContext, args: &ApproveArgs) -> CliResult<std::process::ExitCode> {
    let expires_at = Timestamp::parse(&args.expires_at).map_err(|err| CliError::Usage(err.to_string()))?;
    let signing_key = ctx.resolve_key(args.key_file.as_deref(), None)?;
    let token = mint_approval(
        args.token_id.clone(),
        args.intent_digest.clone(),
        args.policy_digest.clone(),
        args.scope.clone(),
        args.approver_identity.clone(),
        args.reason_code.clone(),
        expires_at,
        &signing_key,
    )?;
    print_json(&token)?;
    Ok(std::process::ExitCode::SUCCESS)
}

/// Dispatches a `trace` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch_trace(_ctx: &CliContext, command: TraceCommand) -> CliResult<std::process::ExitCode> {
    match command {
        TraceCommand::Verify(args) => command_trace_verify(&args),
    }
}

fn command_trace_verify(args: &TraceVerifyArgs) -> CliResult<std::process::ExitCode> {
    let trace = TraceRecord::parse(&output::read_file(&args.trace)?)?;
    let key_base64 = String::from_utf8(output::read_file(&args.public_key)?).map_err(|err| CliError::Usage(err.to_string()))?;
    let public_key = PublicKey::from_base64(key_base64.trim())?;
    match verify_trace(&trace, &public_key) {
        Ok(()) => {
            print_json(&serde_json::json!({"verified": true}))?;
            Ok(std::process::ExitCode::SUCCESS)
        }
        Err(err) => Err(err.into()),
    }
}
