// gait-schema/src/intent.rs
// ============================================================================
// Module: Intent Request
// Description: The normalized tool call evaluated by the policy gate.
// Purpose: Strict-parse and validate `IntentRequest` per `spec.md` §3.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`IntentRequest`] is the unit the policy gate (C6) evaluates. Parsing
//! is strict: unknown top-level fields fail, `tool_name` must be non-empty,
//! and every target's `value` must be non-empty.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::SchemaError;

/// Where an intent argument's value originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSource {
    /// Supplied directly by the caller.
    Direct,
    /// Derived from prior tool output.
    Derived,
    /// Injected by a skill or template.
    SkillProvenance,
}

/// Provenance of a single argument path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgProvenance {
    /// Dotted path into `args` this provenance entry describes.
    pub arg_path: String,
    /// Where the value came from.
    pub source: ArgSource,
}

/// A dispatch target named by an intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Target kind, e.g. `"file"`, `"url"`, `"process"`.
    pub kind: String,
    /// Target value; must be non-empty.
    pub value: String,
    /// Operation performed against the target, e.g. `"write"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Endpoint classification, e.g. `"internal"`, `"external"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_class: Option<String>,
    /// Whether this target is considered destructive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive: Option<bool>,
}

/// Risk classification reserved under `context.risk_class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

/// Evidence freshness requirement reserved under `context.context_evidence_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextEvidenceMode {
    /// Evidence is attached when available but its absence is not fatal.
    BestEffort,
    /// Evidence must be attached and fresh.
    Required,
}

/// Delegation metadata carried on an intent requesting delegated authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationRef {
    /// Identity of the original requester at the root of the chain.
    pub requester_identity: String,
    /// Ordered chain of delegation token digests, root to leaf.
    #[serde(default)]
    pub chain: Vec<String>,
    /// References to delegation tokens to verify.
    #[serde(default)]
    pub token_refs: Vec<String>,
}

/// The normalized tool call evaluated by the policy gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentRequest {
    /// Normalized tool name, e.g. `"tool.write"`.
    pub tool_name: String,
    /// Arbitrary tool arguments.
    pub args: Value,
    /// Targets this intent acts upon.
    pub targets: Vec<Target>,
    /// Provenance of each argument, keyed by path.
    #[serde(default)]
    pub arg_provenance: Vec<ArgProvenance>,
    /// Free-form context, including the reserved fields in `spec.md` §3.
    #[serde(default)]
    pub context: Value,
    /// Delegation metadata, present when this intent claims delegated authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation: Option<DelegationRef>,
    /// Provenance of the skill that generated this intent, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_provenance: Option<Value>,
}

impl IntentRequest {
    /// Strict-parses an intent from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON, an unknown top-level
    /// field, or a failed [`IntentRequest::validate`] check.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let intent: Self = serde_json::from_slice(bytes)?;
        intent.validate()?;
        Ok(intent)
    }

    /// Validates the invariants `spec.md` §3 places on an intent.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] if `tool_name` is empty or any
    /// target's `value` is empty.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.tool_name.trim().is_empty() {
            return Err(SchemaError::Invalid("tool_name must be non-empty".to_string()));
        }
        for (idx, target) in self.targets.iter().enumerate() {
            if target.value.trim().is_empty() {
                return Err(SchemaError::Invalid(format!("targets[{idx}].value must be non-empty")));
            }
        }
        Ok(())
    }

    /// Returns `context.job_id` when present and a string.
    #[must_use]
    pub fn context_job_id(&self) -> Option<&str> {
        self.context.get("job_id").and_then(Value::as_str)
    }

    /// Returns `context.risk_class` when present and a recognized value.
    #[must_use]
    pub fn context_risk_class(&self) -> Option<RiskClass> {
        let raw = self.context.get("risk_class")?.as_str()?;
        match raw {
            "low" => Some(RiskClass::Low),
            "medium" => Some(RiskClass::Medium),
            "high" => Some(RiskClass::High),
            _ => None,
        }
    }

    /// Returns `skill_provenance.publisher` when present and a string.
    #[must_use]
    pub fn skill_publisher(&self) -> Option<&str> {
        self.skill_provenance.as_ref()?.get("publisher")?.as_str()
    }

    /// Returns `skill_provenance.source` when present and a string.
    #[must_use]
    pub fn skill_source(&self) -> Option<&str> {
        self.skill_provenance.as_ref()?.get("source")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::IntentRequest;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "tool_name": "tool.write",
            "args": {"path": "/tmp/a"},
            "targets": [{"kind": "file", "value": "/tmp/a"}],
        })
    }

    #[test]
    fn parses_minimal_valid_intent() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let intent = IntentRequest::parse(&bytes).expect("parse");
        assert_eq!(intent.tool_name, "tool.write");
    }

    #[test]
    fn rejects_empty_tool_name() {
        let mut value = sample();
        value["tool_name"] = json!("");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(IntentRequest::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_empty_target_value() {
        let mut value = sample();
        value["targets"] = json!([{"kind": "file", "value": ""}]);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(IntentRequest::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_unknown_top_level_field() {
        let mut value = sample();
        value["unexpected"] = json!(true);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(IntentRequest::parse(&bytes).is_err());
    }
}
