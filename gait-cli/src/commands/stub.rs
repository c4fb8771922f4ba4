// gait-cli/src/commands/stub.rs
// ============================================================================
// Module: Stub Command Group
// Description: `gait demo`, `gait doctor`, `gait voice {token,pack}`.
// Purpose: These surfaces are explicitly out of core scope (argument
// parsing/help text/config-file loading/doctor diagnostics per `spec.md`
// §1, and the voice-framework adapters are a separate integration this
// crate does not own). Each returns a clear environment/input error rather
// than silently no-opping, so the exit-code contract in §6 stays truthful.
// Dependencies: clap
// ============================================================================

use clap::Subcommand;

use crate::CliError;
use crate::CliResult;

/// `gait voice` subcommands.
#[derive(Subcommand, Debug)]
pub enum VoiceCommand {
    /// Mints a voice-framework session token.
    Token,
    /// Builds a voice-session evidence pack.
    Pack,
}

/// `gait demo` is not implemented by this deployment shape.
///
/// # Errors
///
/// Always returns [`CliError::Usage`].
pub fn command_demo() -> CliResult<std::process::ExitCode> {
    Err(CliError::Usage("gait demo is out of core scope; use gait gate eval against a sample intent and policy instead".to_string()))
}

/// `gait doctor` is not implemented by this deployment shape.
///
/// # Errors
///
/// Always returns [`CliError::Usage`].
pub fn command_doctor() -> CliResult<std::process::ExitCode> {
    Err(CliError::Usage("gait doctor is out of core scope; this build ships no environment diagnostics".to_string()))
}

/// `gait voice` is not implemented by this deployment shape.
///
/// # Errors
///
/// Always returns [`CliError::Usage`].
pub fn command_voice(command: VoiceCommand) -> CliResult<std::process::ExitCode> {
    let surface = match command {
        VoiceCommand::Token => "voice token",
        VoiceCommand::Pack => "voice pack",
    };
    Err(CliError::Usage(format!("gait {surface} is out of core scope; this build ships no voice-framework adapter")))
}
