// gait-cli/src/context.rs
// ============================================================================
// Module: CLI Context
// Description: Global config/key resolution shared across every subcommand.
// Purpose: Keep `--config`/`GAIT_CONFIG` and `--dev`/key-file/key-env
// resolution in exactly one place, matching `gait_schema::config::GaitConfig`
// and `gait_core::signing::resolve_key_mode`'s own precedence rules.
// Dependencies: gait-core, gait-schema
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use gait_core::PrivateKey;
use gait_schema::config::GaitConfig;

use crate::CliResult;

/// Global flags every subcommand resolves against.
pub struct CliContext {
    config_path: Option<PathBuf>,
    dev: bool,
}

impl CliContext {
    /// Builds a context from the top-level `--config`/`--dev` flags.
    #[must_use]
    pub fn new(config_path: Option<PathBuf>, dev: bool) -> Self {
        Self { config_path, dev }
    }

    /// Loads and strict-parses the resolved [`GaitConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if no path resolves or the document
    /// fails to load.
    pub fn load_config(&self) -> CliResult<GaitConfig> {
        let path = GaitConfig::resolve_path(self.config_path.clone())?;
        Ok(GaitConfig::load(&path)?)
    }

    /// Resolves a signing key from `--dev` or an explicit file/env source.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Signing`] if the key source is ambiguous, missing,
    /// or fails to load.
    pub fn resolve_key(&self, key_file: Option<&Path>, key_env_value: Option<String>) -> CliResult<PrivateKey> {
        let mode = gait_core::resolve_key_mode(self.dev, key_file, key_env_value)?;
        Ok(PrivateKey::load(&mode)?)
    }
}
