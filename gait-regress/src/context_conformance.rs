// gait-regress/src/context_conformance.rs
// ============================================================================
// Module: Context Conformance
// Description: Classifies intent `context` drift between a captured
// baseline and a replayed fixture.
// Purpose: Implement `spec.md` §4.11's `--context-conformance` mode.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! `spec.md` §3 reserves a handful of `context` fields the gate evaluator
//! actually reads (`context_set_digest`, `context_evidence_mode`,
//! `context_age_seconds`, `max_context_age_seconds`, `job_id`,
//! `risk_class`). Drift in one of those is policy-relevant: it could change
//! a verdict. Drift in any other key is runtime noise (timestamps,
//! correlation IDs, client metadata) that a faithful replay is not expected
//! to reproduce.

use serde_json::Value;

/// The reserved `context` fields the policy gate reads. Drift here can
/// change a verdict; drift elsewhere cannot.
pub const POLICY_RELEVANT_CONTEXT_FIELDS: &[&str] =
    &["context_set_digest", "context_evidence_mode", "context_age_seconds", "max_context_age_seconds", "job_id", "risk_class"];

/// Whether a single `context` field's drift could affect a gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftClass {
    /// The field is not read by the gate evaluator.
    Runtime,
    /// The field is one the gate evaluator reads.
    PolicyRelevant,
}

/// One field that differs between a captured baseline and a replayed context.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContextDrift {
    /// The top-level `context` key that differs.
    pub field: String,
    /// Whether this field's drift could affect a verdict.
    pub class: DriftClass,
    /// The value captured at fixture-init time, if the field was present.
    pub baseline: Option<Value>,
    /// The value observed at replay time, if the field is present.
    pub current: Option<Value>,
}

/// Diffs two `context` objects and classifies every field that differs.
///
/// Non-object inputs are treated as having no fields at all, so comparing
/// `context` against itself, or against `null`, never panics.
#[must_use]
pub fn classify_drift(baseline: &Value, current: &Value) -> Vec<ContextDrift> {
    let baseline_obj = baseline.as_object();
    let current_obj = current.as_object();

    let mut fields: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
    if let Some(map) = baseline_obj {
        fields.extend(map.keys().map(String::as_str));
    }
    if let Some(map) = current_obj {
        fields.extend(map.keys().map(String::as_str));
    }

    let mut drifts = Vec::new();
    for field in fields {
        let baseline_value = baseline_obj.and_then(|map| map.get(field));
        let current_value = current_obj.and_then(|map| map.get(field));
        if baseline_value == current_value {
            continue;
        }
        let class = if POLICY_RELEVANT_CONTEXT_FIELDS.contains(&field) { DriftClass::PolicyRelevant } else { DriftClass::Runtime };
        drifts.push(ContextDrift {
            field: field.to_string(),
            class,
            baseline: baseline_value.cloned(),
            current: current_value.cloned(),
        });
    }
    drifts
}
