// gait-cli/src/commands/keys.rs
// ============================================================================
// Module: Keys Command Group
// Description: `gait keys {init,rotate,verify}`.
// Purpose: Generate and inspect the ed25519 signing keys that back every
// other command's `--sign`/`--key-file` flags. `init` and `rotate` both
// write a fresh key; `rotate` additionally prints the superseded public key
// so callers can update trust anchors before discarding it.
// Dependencies: gait-core, clap
// ============================================================================

use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;
use gait_core::PrivateKey;

use crate::CliError;
use crate::CliResult;
use crate::context::CliContext;
use crate::output;
use crate::output::print_json;

/// `gait keys` subcommands.
#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Generates a fresh signing key and writes it to a file.
    Init(InitArgs),
    /// Generates a replacement signing key, reporting the key it supersedes.
    Rotate(RotateArgs),
    /// Prints the public key corresponding to a private key file.
    Verify(VerifyArgs),
}

/// Arguments to `keys init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to write the new base64-encoded private key to.
    #[arg(long)]
    out: PathBuf,
}

/// Arguments to `keys rotate`.
#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Path to the existing private key file being superseded.
    #[arg(long)]
    previous: PathBuf,
    /// Path to write the new base64-encoded private key to.
    #[arg(long)]
    out: PathBuf,
}

/// Arguments to `keys verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to the private key file to derive a public key from.
    key_file: PathBuf,
}

/// Dispatches a `keys` subcommand.
///
/// # Errors
///
/// Propagates whatever error the selected subcommand's body returns.
pub fn dispatch(_ctx: &CliContext, command: KeysCommand) -> CliResult<std::process::ExitCode> {
    match command {
        KeysCommand::Init(args) => command_init(&args),
        KeysCommand::Rotate(args) => command_rotate(&args),
        KeysCommand::Verify(args) => command_verify(&args),
    }
}

fn write_private_key(path: &PathBuf, key: &PrivateKey) -> CliResult<()> {
    std::fs::write(path, key.to_base64()).map_err(|err| CliError::Usage(format!("failed to write {}: {err}", path.display())))?;
    std::fs::set_permissions(path, Permissions::from_mode(0o600)).map_err(|err| CliError::Usage(format!("failed to set permissions on {}: {err}", path.display())))?;
    Ok(())
}

fn load_private_key(path: &PathBuf) -> CliResult<PrivateKey> {
    let encoded = String::from_utf8(output::read_file(path)?).map_err(|err| CliError::Usage(err.to_string()))?;
    Ok(PrivateKey::from_base64(encoded.trim())?)
}

fn command_init(args: &InitArgs) -> CliResult<std::process::ExitCode> {
    let key = PrivateKey::generate();
    write_private_key(&args.out, &key)?;
    print_json(&serde_json::json!({"public_key": key.public_key().to_base64()}))?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_rotate(args: &RotateArgs) -> CliResult<std::process::ExitCode> {
    let previous = load_private_key(&args.previous)?;
    let next = PrivateKey::generate();
    write_private_key(&args.out, &next)?;
    print_json(&serde_json::json!({
        "superseded_public_key": previous.public_key().to_base64(),
        "public_key": next.public_key().to_base64(),
    }))?;
    Ok(std::process::ExitCode::SUCCESS)
}

fn command_verify(args: &VerifyArgs) -> CliResult<std::process::ExitCode> {
    let key = load_private_key(&args.key_file)?;
    print_json(&serde_json::json!({"public_key": key.public_key().to_base64()}))?;
    Ok(std::process::ExitCode::SUCCESS)
}
