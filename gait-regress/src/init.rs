// gait-regress/src/init.rs
// ============================================================================
// Module: Regression Init
// Description: Captures a new fixture from a built runpack and declares it
// in a `gait.yaml` regression config.
// Purpose: Implement `spec.md` §4.11 Init and Bootstrap.
// Dependencies: gait-core, gait-pack, gait-schema
// ============================================================================

//! ## Overview
//! `init` is the write side of [`crate::fixture::Fixture::capture`]: given
//! an already-built runpack archive, it captures the baseline and declares
//! the fixture in the caller's `gait.yaml`. `bootstrap` composes `init` with
//! an immediate [`crate::run::run`] against the single fixture just
//! captured, so a first-time caller gets one call that both records and
//! self-checks a baseline.

use std::collections::BTreeMap;
use std::path::Path;

use gait_schema::IntentRequest;
use serde_json::Value;

use crate::RegressError;
use crate::config::RegressConfig;
use crate::fixture::Fixture;
use crate::run::RegressReport;

/// Captures a fixture from `archive` and declares it in the regression
/// config at `config_path`, creating the config if it does not exist.
///
/// # Errors
///
/// Returns [`RegressError`] if the archive fails integrity checks, the
/// fixture cannot be written, or `config_path` fails to load or save.
pub fn init(fixtures_root: &Path, config_path: &Path, run_id: &str, archive: &[u8]) -> Result<Fixture, RegressError> {
    let context_fingerprints = capture_context_fingerprints(archive)?;
    let fixture = Fixture::capture(fixtures_root, run_id, archive, context_fingerprints)?;

    let mut config = if config_path.exists() { RegressConfig::load(config_path)? } else { RegressConfig::empty() };
    config.declare_fixture(run_id);
    config.save(config_path)?;
    Ok(fixture)
}

/// Captures a fixture and immediately replays it, returning both the
/// captured fixture and the self-check report.
///
/// # Errors
///
/// Returns [`RegressError`] under the same conditions as [`init`], or if
/// the self-check replay fails.
pub fn bootstrap(fixtures_root: &Path, config_path: &Path, run_id: &str, archive: &[u8]) -> Result<(Fixture, RegressReport), RegressError> {
    let fixture = init(fixtures_root, config_path, run_id, archive)?;
    let mut config = RegressConfig::empty();
    config.declare_fixture(run_id);
    let report = crate::run::run(fixtures_root, &config)?;
    Ok((fixture, report))
}

fn capture_context_fingerprints(archive: &[u8]) -> Result<BTreeMap<String, Value>, RegressError> {
    let entries = gait_core::read_entries(archive, gait_pack::MAX_ENTRY_BYTES)?;
    let mut fingerprints = BTreeMap::new();
    for entry in &entries {
        if !entry.name.starts_with("intents/") {
            continue;
        }
        let intent = IntentRequest::parse(&entry.contents).map_err(|err| RegressError::Io(err.to_string()))?;
        fingerprints.insert(entry.name.clone(), intent.context);
    }
    Ok(fingerprints)
}

#[cfg(test)]
mod tests {
    use gait_core::PrivateKey;
    use gait_schema::IntentRequest;
    use gait_schema::TraceRecord;
    use gait_schema::policy::Verdict;
    use serde_json::json;
    use tempfile::tempdir;

    use super::bootstrap;
    use super::init;
    use crate::config::RegressConfig;

    fn sample_archive() -> Vec<u8> {
        let intent = IntentRequest {
            tool_name: "tool.write".to_string(),
            args: json!({}),
            targets: vec![],
            arg_provenance: vec![],
            context: json!({"risk_class": "low"}),
            delegation: None,
            skill_provenance: None,
        };
        let trace = TraceRecord {
            trace_id: "trace-1".to_string(),
            tool_name: "tool.write".to_string(),
            intent_digest: "abc".to_string(),
            policy_digest: "def".to_string(),
            verdict: Verdict::Allow,
            reason_codes: vec![],
            violations: vec![],
            approval_ref: None,
            delegation_refs: vec![],
            credential_ref: None,
            matched_rule: None,
            decision_latency_ms: 1,
            signature: None,
        };
        let key = PrivateKey::generate();
        gait_pack::build_run_pack("run-1", &[intent], &[trace], Some(&key)).expect("build").archive
    }

    #[test]
    fn init_declares_the_fixture_in_a_fresh_config() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("gait.yaml");
        let archive = sample_archive();
        init(dir.path(), &config_path, "run-1", &archive).expect("init");

        let config = RegressConfig::load(&config_path).expect("load");
        assert_eq!(config.fixtures.len(), 1);
        assert_eq!(config.fixtures[0].run_id, "run-1");
    }

    #[test]
    fn init_captures_intent_context_as_a_fingerprint() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("gait.yaml");
        let archive = sample_archive();
        let fixture = init(dir.path(), &config_path, "run-1", &archive).expect("init");
        assert_eq!(fixture.context_fingerprints.get("intents/000000.json"), Some(&json!({"risk_class": "low"})));
    }

    #[test]
    fn bootstrap_self_checks_the_captured_fixture() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("gait.yaml");
        let archive = sample_archive();
        let (_fixture, report) = bootstrap(dir.path(), &config_path, "run-1", &archive).expect("bootstrap");
        assert!(report.all_passed());
    }
}
