// gait-schema/src/policy.rs
// ============================================================================
// Module: Policy Document
// Description: The YAML policy document evaluated by the gate.
// Purpose: Strict-parse and validate `Policy` per `spec.md` §3/§4.6.
// Dependencies: serde, serde_yaml
// ============================================================================

//! ## Overview
//! A [`Policy`] is an ordered list of [`PolicyRule`]s plus a default
//! verdict. Matching is the gate's (`gait-policy`) job; this module only
//! owns parsing and structural validation, adapted from the teacher's
//! `decision-gate-config::policy` rule/effect vocabulary and generalized to
//! the richer match/constraint shape `spec.md` requires.

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;

/// The decision a gate evaluation can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The intent is permitted.
    Allow,
    /// The intent is blocked.
    Block,
    /// The intent requires an approval token before it may proceed.
    RequireApproval,
    /// The intent is evaluated but not dispatched.
    DryRun,
}

impl Verdict {
    /// Returns the stable CLI/service exit code for this verdict, per
    /// `spec.md` §4.6 step 8.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Allow | Self::DryRun => 0,
            Self::Block => 3,
            Self::RequireApproval => 4,
        }
    }
}

/// The effect a matching rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEffect {
    /// Permit the intent outright.
    Allow,
    /// Block the intent.
    Block,
    /// Require an approval token.
    RequireApproval,
    /// Evaluate but do not dispatch.
    DryRun,
}

impl From<PolicyEffect> for Verdict {
    fn from(effect: PolicyEffect) -> Self {
        match effect {
            PolicyEffect::Allow => Self::Allow,
            PolicyEffect::Block => Self::Block,
            PolicyEffect::RequireApproval => Self::RequireApproval,
            PolicyEffect::DryRun => Self::DryRun,
        }
    }
}

/// Fail-closed precondition configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailClosed {
    /// Whether fail-closed preconditions are active.
    #[serde(default)]
    pub enabled: bool,
    /// Risk classes this precondition applies to.
    #[serde(default)]
    pub risk_classes: Vec<String>,
    /// Context fields that must be present for the listed risk classes.
    #[serde(default)]
    pub required_fields: Vec<String>,
}

/// The set of intent attributes a rule matches against. An empty vector in
/// any field means "match any value" for that attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleMatch {
    /// Tool names to match, compared case-sensitively.
    #[serde(default)]
    pub tool_names: Vec<String>,
    /// Target kinds to match, compared case-insensitively.
    #[serde(default)]
    pub target_kinds: Vec<String>,
    /// Target values to match.
    #[serde(default)]
    pub target_values: Vec<String>,
    /// Risk classes to match.
    #[serde(default)]
    pub risk_classes: Vec<String>,
    /// Endpoint classes to match, compared case-insensitively.
    #[serde(default)]
    pub endpoint_classes: Vec<String>,
    /// Skill publisher names to match.
    #[serde(default)]
    pub skill_publishers: Vec<String>,
    /// Skill source identifiers to match.
    #[serde(default)]
    pub skill_sources: Vec<String>,
}

/// One ordered policy rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    /// Human-readable rule name, used in traces as `matched_rule`.
    pub name: String,
    /// Ascending evaluation priority; ties broken by declaration order.
    pub priority: i64,
    /// Effect applied when this rule matches and its constraints pass.
    pub effect: PolicyEffect,
    /// Match criteria.
    #[serde(rename = "match", default)]
    pub match_criteria: RuleMatch,
    /// Requires at least one valid approval token.
    #[serde(default)]
    pub require_approval: bool,
    /// Requires a credential broker grant.
    #[serde(default)]
    pub require_broker_credential: bool,
    /// Broker reference name to request a credential from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_reference: Option<String>,
    /// Scopes requested from the broker.
    #[serde(default)]
    pub broker_scopes: Vec<String>,
    /// Requires a verified delegation chain.
    #[serde(default)]
    pub require_delegation: bool,
    /// Scopes the delegation chain must grant.
    #[serde(default)]
    pub delegation_scopes: Vec<String>,
    /// Requires `context.context_set_digest` evidence.
    #[serde(default)]
    pub require_context_evidence: bool,
    /// Minimum evidence mode required, `best_effort` or `required`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_context_evidence_mode: Option<String>,
    /// Maximum allowed `context.context_age_seconds`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_context_age_seconds: Option<u64>,
    /// Reason codes to surface verbatim when this rule matches.
    #[serde(default)]
    pub reason_codes: Vec<String>,
    /// Violation descriptions to surface when this rule matches.
    #[serde(default)]
    pub violations: Vec<String>,
}

/// A parsed policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Verdict applied when no rule matches.
    pub default_verdict: Verdict,
    /// Fail-closed preconditions, if any.
    #[serde(default)]
    pub fail_closed: Option<FailClosed>,
    /// Ordered rule set.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl Policy {
    /// Strict-parses a policy document from YAML bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed YAML, an unknown top-level
    /// field, or a failed [`Policy::validate`] check.
    pub fn parse_yaml(bytes: &[u8]) -> Result<Self, SchemaError> {
        let policy: Self = serde_yaml::from_slice(bytes)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Validates structural invariants: rule names non-empty, broker rules
    /// name a broker reference, at most one effect-`require_approval` path
    /// per rule is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] on the first violation found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(SchemaError::Invalid(format!("rules[{idx}].name must be non-empty")));
            }
            if rule.require_broker_credential && rule.broker_reference.is_none() {
                return Err(SchemaError::Invalid(format!(
                    "rules[{idx}] requires a broker credential but names no broker_reference"
                )));
            }
        }
        Ok(())
    }
}
