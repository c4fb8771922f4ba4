// gait-regress/src/run.rs
// ============================================================================
// Module: Regression Run
// Description: Replays a declared fixture set and reports digest drift.
// Purpose: Implement `spec.md` §4.11 Run.
// Dependencies: gait-core, gait-pack, gait-schema
// ============================================================================

//! ## Overview
//! A replay recomputes exactly what [`fixture::Fixture::capture`] recorded —
//! [`gait_pack::verify_pack`]'s integrity check plus the per-entry digest
//! map — against the fixture's own saved archive, and, when a fixture
//! carries them, diffs its captured intent `context` objects against the
//! replayed intents' contexts via [`crate::context_conformance`]. A replay
//! never re-evaluates the policy gate: the captured archive already is the
//! evaluation's output, so the question `Run` answers is "does replaying
//! this archive still produce the same bytes and the same verdict trail",
//! not "does the gate still reach the same verdict given fresh inputs".

use std::path::Path;

use gait_schema::IntentRequest;

use crate::RegressError;
use crate::config::RegressConfig;
use crate::context_conformance::ContextDrift;
use crate::context_conformance::classify_drift;
use crate::fixture::Fixture;

/// The outcome of replaying a single fixture.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FixtureOutcome {
    /// The fixture's run ID.
    pub run_id: String,
    /// Whether the fixture replayed cleanly.
    pub passed: bool,
    /// Human-readable detail, empty when `passed` is true.
    pub detail: String,
    /// Context drift observed, present only under context-conformance mode.
    #[serde(default)]
    pub context_drifts: Vec<ContextDrift>,
}

/// The result of replaying an entire declared fixture set.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegressReport {
    /// Per-fixture outcomes, in declared order.
    pub outcomes: Vec<FixtureOutcome>,
}

impl RegressReport {
    /// Returns whether every fixture passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    /// Returns the process exit code this report maps to.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() { crate::EXIT_PASS } else { crate::EXIT_REGRESSION }
    }
}

/// Replays every fixture declared in `config` and returns a [`RegressReport`].
///
/// # Errors
///
/// Returns [`RegressError::UnknownFixture`] if a declared fixture has no
/// captured `fixture.json`, or a lower-level [`RegressError`] if a fixture's
/// archive cannot be read or parsed.
pub fn run(fixtures_root: &Path, config: &RegressConfig) -> Result<RegressReport, RegressError> {
    let mut outcomes = Vec::with_capacity(config.fixtures.len());
    for declared in &config.fixtures {
        outcomes.push(replay_one(fixtures_root, &declared.run_id, config.context_conformance)?);
    }
    Ok(RegressReport { outcomes })
}

fn replay_one(fixtures_root: &Path, run_id: &str, context_conformance: bool) -> Result<FixtureOutcome, RegressError> {
    let fixture = Fixture::load(fixtures_root, run_id).map_err(|_err| RegressError::UnknownFixture(run_id.to_string()))?;
    let archive = fixture.read_runpack(fixtures_root)?;

    if let Some(detail) = check_integrity(&fixture, &archive)? {
        return Ok(FixtureOutcome { run_id: run_id.to_string(), passed: false, detail, context_drifts: vec![] });
    }

    let context_drifts = if context_conformance { check_context_conformance(&fixture, &archive)? } else { Vec::new() };
    let policy_relevant_drift = context_drifts
        .iter()
        .any(|drift| matches!(drift.class, crate::context_conformance::DriftClass::PolicyRelevant));

    if policy_relevant_drift {
        return Ok(FixtureOutcome {
            run_id: run_id.to_string(),
            passed: false,
            detail: "policy-relevant context drift detected".to_string(),
            context_drifts,
        });
    }

    Ok(FixtureOutcome { run_id: run_id.to_string(), passed: true, detail: String::new(), context_drifts })
}

fn check_integrity(fixture: &Fixture, archive: &[u8]) -> Result<Option<String>, RegressError> {
    let report = gait_pack::verify_pack(archive, gait_pack::VerifyOptions::default())?;
    if !report.integrity_ok() {
        return Ok(Some(format!(
            "manifest integrity check failed: missing={:?}, mismatched={:?}",
            report.missing_files, report.hash_mismatches
        )));
    }

    let entries = gait_core::read_entries(archive, gait_pack::MAX_ENTRY_BYTES)?;
    for entry in &entries {
        let digest = gait_core::digest_hex(gait_core::DEFAULT_HASH_ALGORITHM, &entry.contents);
        match fixture.entry_digests.get(&entry.name) {
            Some(expected) if expected == digest.as_str() => {}
            Some(expected) => {
                return Ok(Some(format!("entry {} digest changed: expected {expected}, found {}", entry.name, digest.as_str())));
            }
            None => return Ok(Some(format!("entry {} was not present in the captured baseline", entry.name))),
        }
    }
    if entries.len() != fixture.entry_digests.len() {
        return Ok(Some(format!("entry count changed: baseline had {}, replay has {}", fixture.entry_digests.len(), entries.len())));
    }
    Ok(None)
}

fn check_context_conformance(fixture: &Fixture, archive: &[u8]) -> Result<Vec<ContextDrift>, RegressError> {
    let entries = gait_core::read_entries(archive, gait_pack::MAX_ENTRY_BYTES)?;
    let mut drifts = Vec::new();
    for (path, baseline_context) in &fixture.context_fingerprints {
        let Some(entry) = entries.iter().find(|entry| &entry.name == path) else {
            continue;
        };
        let intent = IntentRequest::parse(&entry.contents).map_err(|err| RegressError::Io(err.to_string()))?;
        drifts.extend(classify_drift(baseline_context, &intent.context));
    }
    Ok(drifts)
}
