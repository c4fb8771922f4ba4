// gait-cli/src/output.rs
// ============================================================================
// Module: CLI Output
// Description: Shared stdout helpers for every subcommand's result.
// Purpose: Every subcommand prints exactly one pretty-printed JSON document
// to stdout and returns the process exit code separately, so scripts can
// `| jq` the result without parsing human prose.
// Dependencies: serde_json
// ============================================================================

use crate::CliError;
use crate::CliResult;

/// Writes `value` to stdout as pretty-printed JSON, followed by a newline.
///
/// # Errors
///
/// Returns [`CliError::Usage`] if `value` cannot be serialized.
pub fn print_json(value: &impl serde::Serialize) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| CliError::Usage(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Reads and returns the bytes at `path`, wrapping IO failure in
/// [`CliError::Usage`].
///
/// # Errors
///
/// Returns [`CliError::Usage`] if `path` cannot be read.
pub fn read_file(path: &std::path::Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| CliError::Usage(format!("failed to read {}: {err}", path.display())))
}
