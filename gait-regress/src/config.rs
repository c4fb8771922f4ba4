// gait-regress/src/config.rs
// ============================================================================
// Module: Regression Config
// Description: The `gait.yaml` document declaring a fixture set to replay.
// Purpose: Implement `spec.md` §4.11's fixture-set declaration file.
// Dependencies: serde_yaml
// ============================================================================

//! ## Overview
//! Mirrors [`gait_schema::config::GaitConfig::load`]'s size-capped, strict
//! YAML load, scoped to the handful of fields a regression run needs: which
//! fixtures to replay and whether to enforce context-conformance.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::RegressError;

/// Maximum size of a `gait.yaml` regression config, matching
/// [`gait_schema::config::MAX_CONFIG_FILE_SIZE`].
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// One fixture declared in a regression config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureRef {
    /// The run ID whose captured fixture this entry replays.
    pub run_id: String,
}

/// A declared set of fixtures to replay, plus replay-wide options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegressConfig {
    /// Directory fixtures are captured under and replayed from, relative to the config file.
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: String,
    /// Declared fixtures, replayed in order.
    #[serde(default)]
    pub fixtures: Vec<FixtureRef>,
    /// Whether replay enforces context-conformance against captured baselines.
    #[serde(default)]
    pub context_conformance: bool,
}

fn default_fixtures_dir() -> String {
    "fixtures".to_string()
}

impl RegressConfig {
    /// Builds an empty config with the default fixtures directory.
    #[must_use]
    pub fn empty() -> Self {
        Self { fixtures_dir: default_fixtures_dir(), fixtures: Vec::new(), context_conformance: false }
    }

    /// Loads and strict-parses a regression config from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegressError::Io`] if the file is missing, too large, or
    /// fails to parse.
    pub fn load(path: &Path) -> Result<Self, RegressError> {
        let metadata = std::fs::metadata(path).map_err(|err| RegressError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RegressError::Io(format!("config at {} exceeds the size limit", path.display())));
        }
        let contents = std::fs::read(path).map_err(|err| RegressError::Io(err.to_string()))?;
        serde_yaml::from_slice(&contents).map_err(|err| RegressError::Io(err.to_string()))
    }

    /// Serializes and writes this config to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegressError::Io`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), RegressError> {
        let text = serde_yaml::to_string(self).map_err(|err| RegressError::Io(err.to_string()))?;
        std::fs::write(path, text).map_err(|err| RegressError::Io(err.to_string()))
    }

    /// Adds a fixture reference if not already declared.
    pub fn declare_fixture(&mut self, run_id: &str) {
        if !self.fixtures.iter().any(|entry| entry.run_id == run_id) {
            self.fixtures.push(FixtureRef { run_id: run_id.to_string() });
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::RegressConfig;

    #[test]
    fn declare_fixture_is_idempotent() {
        let mut config = RegressConfig::empty();
        config.declare_fixture("run-1");
        config.declare_fixture("run-1");
        assert_eq!(config.fixtures.len(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("gait.yaml");
        let mut config = RegressConfig::empty();
        config.declare_fixture("run-1");
        config.context_conformance = true;
        config.save(&path).expect("save");

        let reloaded = RegressConfig::load(&path).expect("load");
        assert_eq!(reloaded.fixtures.len(), 1);
        assert!(reloaded.context_conformance);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("gait.yaml");
        std::fs::write(&path, "fixtures: []\nbogus_field: true\n").expect("write");
        assert!(RegressConfig::load(&path).is_err());
    }
}
