// gait-cli/src/commands.rs
// ============================================================================
// Module: Command Groups
// Description: One submodule per top-level CLI subcommand group.
// Purpose: Mirror the teacher's one-file-per-command-surface convention
// (`decision-gate-cli::main`'s `command_*` functions), split into a module
// per group instead of one flat file, since this crate's command surface is
// considerably wider than the teacher's two-command CLI.
// Dependencies: clap
// ============================================================================

pub mod gate;
pub mod incident;
pub mod job;
pub mod keys;
pub mod ledger;
pub mod mcp;
pub mod pack;
pub mod policy;
pub mod regress;
pub mod registry;
pub mod run;
pub mod stub;
