// gait-policy/src/evaluator.rs
// ============================================================================
// Module: Gate Evaluation Algorithm
// Description: The deterministic, order-preserving evaluation described in
// `spec.md` §4.6.
// Purpose: Turn an intent, a policy, and optional tokens/broker/registry
// into a `GateResult` and a signed `TraceRecord`.
// Dependencies: gait-core, gait-schema, crate::{broker, reason, script}
// ============================================================================

//! ## Overview
//! [`evaluate`] strict-parses nothing itself (that is `gait-schema`'s job);
//! it assumes a valid [`gait_schema::IntentRequest`] and [`gait_schema::Policy`]
//! and walks the eight-step algorithm from `spec.md` §4.6 exactly in order,
//! short-circuiting at the first constraint failure within the first
//! matching rule.

use gait_core::HashAlgorithm;
use gait_core::PrivateKey;
use gait_core::Timestamp;
use gait_schema::IntentRequest;
use gait_schema::Policy;
use gait_schema::PolicyRule;
use gait_schema::Verdict;
use gait_schema::policy::RuleMatch;
use gait_schema::tokens::ApprovalToken;
use gait_schema::tokens::DelegationToken;
use gait_schema::trace::TraceRecord;
use thiserror::Error;

use crate::broker::CredentialBroker;
use crate::reason;
use crate::script::ApprovedScriptRegistry;

/// Errors raised before a verdict can be reached.
#[derive(Debug, Error)]
pub enum GateError {
    /// A precondition required by the policy profile was not met, e.g. a
    /// rule requires a broker but none is configured in `oss-prod`.
    #[error("policy precondition failed: {0}")]
    Precondition(String),

    /// Digesting the intent or policy failed.
    #[error("failed to digest record: {0}")]
    Digest(String),

    /// Signing the resulting trace record failed.
    #[error("failed to sign trace record: {0}")]
    Sign(String),
}

impl gait_core::GaitError for GateError {
    fn category(&self) -> gait_core::ErrorCategory {
        gait_core::ErrorCategory::Input
    }
}

/// The inputs to one gate evaluation.
pub struct GateInputs<'a> {
    /// The intent under evaluation.
    pub intent: &'a IntentRequest,
    /// The policy to evaluate against.
    pub policy: &'a Policy,
    /// Approval tokens supplied alongside the intent.
    pub approval_tokens: &'a [ApprovalToken],
    /// Delegation tokens supplied alongside the intent.
    pub delegation_tokens: &'a [DelegationToken],
    /// Credential broker, when a broker is configured.
    pub broker: Option<&'a dyn CredentialBroker>,
    /// Whether a broker precondition failure is a hard precondition error
    /// (the `oss-prod` profile) rather than a degrade-to-block.
    pub broker_required_by_profile: bool,
    /// Approved-script registry, when one is configured.
    pub approved_scripts: Option<&'a dyn ApprovedScriptRegistry>,
    /// Key used to sign the resulting trace record, when tracing is signed.
    pub signing_key: Option<&'a PrivateKey>,
    /// The current evaluation instant, used for expiry checks.
    pub now: Timestamp,
    /// Wall-clock milliseconds spent evaluating, recorded on the trace.
    pub decision_latency_ms: u64,
    /// Identifier assigned to the resulting trace record.
    pub trace_id: String,
}

/// One stage boundary an evaluation crosses, per `spec.md` §6's SSE event
/// names. Delivered to an optional sink so streaming transports can emit
/// one event per stage instead of waiting for the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStage {
    /// Evaluation began; digests are about to be computed.
    Started,
    /// A rule matched the intent and its constraints are about to run.
    RuleMatched,
    /// The matched rule's constraint pipeline finished.
    ConstraintEvaluated,
    /// A verdict was reached and the trace record built.
    Completed,
}

impl DecisionStage {
    /// The wire name `spec.md` §6 assigns this stage's SSE event.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Started => "decision_started",
            Self::RuleMatched => "rule_matched",
            Self::ConstraintEvaluated => "constraint_evaluated",
            Self::Completed => "decision_completed",
        }
    }
}

/// The outcome of one gate evaluation.
#[derive(Debug, Clone)]
pub struct GateResult {
    /// The verdict reached.
    pub verdict: Verdict,
    /// Reason codes accumulated during evaluation.
    pub reason_codes: Vec<String>,
    /// Violation descriptions accumulated during evaluation.
    pub violations: Vec<String>,
    /// Name of the rule that matched, if any.
    pub matched_rule: Option<String>,
    /// Token ID of the approval that satisfied this evaluation, if any.
    pub approval_ref: Option<String>,
    /// References to delegation tokens verified during this evaluation.
    pub delegation_refs: Vec<String>,
    /// Reference to a credential granted by the broker, if any.
    pub credential_ref: Option<String>,
    /// Digest of the evaluated intent.
    pub intent_digest: String,
    /// Digest of the evaluated policy.
    pub policy_digest: String,
    /// Whether the approved-script fast path produced this result.
    pub pre_approved: bool,
}

impl GateResult {
    /// Returns the stable CLI/service exit code for this result's verdict.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.verdict.exit_code()
    }
}

/// Evaluates `inputs.intent` against `inputs.policy`, returning a
/// [`GateResult`] and the [`TraceRecord`] emitted for this evaluation.
///
/// # Errors
///
/// Returns [`GateError::Digest`] if either record fails to canonicalize,
/// [`GateError::Precondition`] if a broker-requiring rule matches with no
/// broker configured under a profile that treats this as fatal, or
/// [`GateError::Sign`] if a signing key was supplied but signing failed.
pub fn evaluate(inputs: &GateInputs<'_>) -> Result<(GateResult, TraceRecord), GateError> {
    evaluate_inner(inputs, &mut |_stage| {})
}

/// Evaluates `inputs.intent` against `inputs.policy`, calling `sink` once
/// per [`DecisionStage`] boundary crossed, for transports that stream one
/// event per decision stage (`spec.md` §6's SSE/ndjson surfaces).
///
/// # Errors
///
/// Same as [`evaluate`].
pub fn evaluate_with_stages(
    inputs: &GateInputs<'_>,
    mut sink: impl FnMut(DecisionStage),
) -> Result<(GateResult, TraceRecord), GateError> {
    evaluate_inner(inputs, &mut sink)
}

fn evaluate_inner(inputs: &GateInputs<'_>, sink: &mut dyn FnMut(DecisionStage)) -> Result<(GateResult, TraceRecord), GateError> {
    sink(DecisionStage::Started);

    let intent_digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, inputs.intent)
        .map_err(|err| GateError::Digest(err.to_string()))?
        .to_string();
    let policy_digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, inputs.policy)
        .map_err(|err| GateError::Digest(err.to_string()))?
        .to_string();

    if let Some(result) = try_approved_script_fast_path(inputs, &intent_digest, &policy_digest) {
        let trace = build_trace(inputs, &result)?;
        sink(DecisionStage::Completed);
        return Ok((result, trace));
    }

    if let Some(block) = check_fail_closed(inputs) {
        let result = GateResult {
            verdict: Verdict::Block,
            reason_codes: vec![block.to_string()],
            violations: Vec::new(),
            matched_rule: None,
            approval_ref: None,
            delegation_refs: Vec::new(),
            credential_ref: None,
            intent_digest,
            policy_digest,
            pre_approved: false,
        };
        let trace = build_trace(inputs, &result)?;
        sink(DecisionStage::Completed);
        return Ok((result, trace));
    }

    let mut ordered_rules: Vec<(usize, &PolicyRule)> = inputs.policy.rules.iter().enumerate().collect();
    ordered_rules.sort_by(|(idx_a, rule_a), (idx_b, rule_b)| rule_a.priority.cmp(&rule_b.priority).then(idx_a.cmp(idx_b)));

    for (_, rule) in ordered_rules {
        if !rule_matches(&rule.match_criteria, inputs.intent) {
            continue;
        }
        sink(DecisionStage::RuleMatched);
        let result = evaluate_constraints(inputs, rule, intent_digest.clone(), policy_digest.clone())?;
        sink(DecisionStage::ConstraintEvaluated);
        let trace = build_trace(inputs, &result)?;
        sink(DecisionStage::Completed);
        return Ok((result, trace));
    }

    let result = GateResult {
        verdict: inputs.policy.default_verdict,
        reason_codes: Vec::new(),
        violations: Vec::new(),
        matched_rule: None,
        approval_ref: None,
        delegation_refs: Vec::new(),
        credential_ref: None,
        intent_digest,
        policy_digest,
        pre_approved: false,
    };
    let trace = build_trace(inputs, &result)?;
    sink(DecisionStage::Completed);
    Ok((result, trace))
}

fn try_approved_script_fast_path(
    inputs: &GateInputs<'_>,
    intent_digest: &str,
    policy_digest: &str,
) -> Option<GateResult> {
    if inputs.intent.tool_name != "script.run" {
        return None;
    }
    let registry = inputs.approved_scripts?;
    let script_digest = inputs.intent.args.get("script_digest")?.as_str()?;
    let matched = registry.lookup(script_digest, policy_digest)?;
    Some(GateResult {
        verdict: Verdict::Allow,
        reason_codes: vec![reason::PRE_APPROVED_SCRIPT.to_string(), matched.pattern_id, matched.registry_reason],
        violations: Vec::new(),
        matched_rule: None,
        approval_ref: None,
        delegation_refs: Vec::new(),
        credential_ref: None,
        intent_digest: intent_digest.to_string(),
        policy_digest: policy_digest.to_string(),
        pre_approved: true,
    })
}

fn check_fail_closed(inputs: &GateInputs<'_>) -> Option<&'static str> {
    let fail_closed = inputs.policy.fail_closed.as_ref()?;
    if !fail_closed.enabled {
        return None;
    }
    let risk_class = risk_class_str(inputs.intent.context_risk_class()?);
    if !fail_closed.risk_classes.iter().any(|class| class == risk_class) {
        return None;
    }
    let context_object = inputs.intent.context.as_object();
    for field in &fail_closed.required_fields {
        let present = context_object.is_some_and(|object| object.contains_key(field));
        if !present {
            return Some(reason::FAIL_CLOSED_MISSING_FIELD);
        }
    }
    None
}

fn rule_matches(criteria: &RuleMatch, intent: &IntentRequest) -> bool {
    matches_exact(&criteria.tool_names, &intent.tool_name)
        && matches_case_insensitive_any(&criteria.target_kinds, intent.targets.iter().map(|target| target.kind.as_str()))
        && matches_exact_any(&criteria.target_values, intent.targets.iter().map(|target| target.value.as_str()))
        && matches_optional_exact(&criteria.risk_classes, intent.context_risk_class().map(risk_class_str))
        && matches_case_insensitive_any(
            &criteria.endpoint_classes,
            intent.targets.iter().filter_map(|target| target.endpoint_class.as_deref()),
        )
        && matches_optional_exact(&criteria.skill_publishers, intent.skill_publisher())
        && matches_optional_exact(&criteria.skill_sources, intent.skill_source())
}

fn risk_class_str(risk_class: gait_schema::intent::RiskClass) -> &'static str {
    match risk_class {
        gait_schema::intent::RiskClass::Low => "low",
        gait_schema::intent::RiskClass::Medium => "medium",
        gait_schema::intent::RiskClass::High => "high",
    }
}

fn matches_exact(configured: &[String], value: &str) -> bool {
    configured.is_empty() || configured.iter().any(|candidate| candidate == value)
}

fn matches_exact_any<'a>(configured: &[String], mut values: impl Iterator<Item = &'a str>) -> bool {
    configured.is_empty() || values.any(|value| configured.iter().any(|candidate| candidate == value))
}

fn matches_case_insensitive_any<'a>(configured: &[String], mut values: impl Iterator<Item = &'a str>) -> bool {
    if configured.is_empty() {
        return true;
    }
    values.any(|value| configured.iter().any(|candidate| candidate.eq_ignore_ascii_case(value)))
}

/// Matches a single optional intent attribute (risk class, skill publisher,
/// skill source) against a rule's configured candidates. An absent value
/// fails to match any non-empty configured list, since a rule scoped by
/// that attribute should not fire for an intent that carries none.
fn matches_optional_exact(configured: &[String], value: Option<&str>) -> bool {
    if configured.is_empty() {
        return true;
    }
    value.is_some_and(|value| configured.iter().any(|candidate| candidate == value))
}

fn evaluate_constraints(
    inputs: &GateInputs<'_>,
    rule: &PolicyRule,
    intent_digest: String,
    policy_digest: String,
) -> Result<GateResult, GateError> {
    let mut credential_ref = None;
    let mut delegation_refs = Vec::new();

    if rule.require_context_evidence {
        if let Some(reason_code) = check_context_evidence(inputs, rule) {
            return Ok(blocked_result(rule, reason_code, intent_digest, policy_digest));
        }
    }

    if rule.require_delegation {
        match verify_delegation(inputs) {
            Ok(refs) => delegation_refs = refs,
            Err(reason_code) => return Ok(blocked_result(rule, reason_code, intent_digest, policy_digest)),
        }
    }

    if rule.require_broker_credential {
        let reference = rule.broker_reference.as_deref().ok_or_else(|| {
            GateError::Precondition("rule requires a broker credential but names no broker_reference".to_string())
        })?;
        match inputs.broker {
            None if inputs.broker_required_by_profile => {
                return Err(GateError::Precondition(format!(
                    "rule {} requires a broker credential but no broker is configured",
                    rule.name
                )));
            }
            None => return Ok(blocked_result(rule, reason::BROKER_CREDENTIAL_MISSING, intent_digest, policy_digest)),
            Some(broker) => match broker.grant(reference, &rule.broker_scopes) {
                Ok(grant) => credential_ref = Some(grant.credential_ref),
                Err(_err) => {
                    return Ok(blocked_result(rule, reason::BROKER_CREDENTIAL_MISSING, intent_digest, policy_digest));
                }
            },
        }
    }

    let requires_approval = rule.require_approval || matches!(rule.effect, gait_schema::policy::PolicyEffect::RequireApproval);
    let approval_ref = if requires_approval {
        match find_valid_approval(inputs, &intent_digest, &policy_digest, rule) {
            Some(token_id) => Some(token_id),
            None => {
                let reason_code = if inputs.approval_tokens.is_empty() {
                    reason::APPROVAL_TOKEN_MISSING
                } else {
                    reason::APPROVAL_TOKEN_INTENT_MISMATCH
                };
                let mut result = GateResult {
                    verdict: Verdict::RequireApproval,
                    reason_codes: vec![reason_code.to_string()],
                    violations: rule.violations.clone(),
                    matched_rule: Some(rule.name.clone()),
                    approval_ref: None,
                    delegation_refs,
                    credential_ref,
                    intent_digest,
                    policy_digest,
                    pre_approved: false,
                };
                result.reason_codes.extend(rule.reason_codes.iter().cloned());
                return Ok(result);
            }
        }
    } else {
        None
    };

    let mut reason_codes = rule.reason_codes.clone();
    if approval_ref.is_some() {
        reason_codes.push(reason::APPROVAL_GRANTED.to_string());
    }

    Ok(GateResult {
        verdict: rule.effect.into(),
        reason_codes,
        violations: rule.violations.clone(),
        matched_rule: Some(rule.name.clone()),
        approval_ref,
        delegation_refs,
        credential_ref,
        intent_digest,
        policy_digest,
        pre_approved: false,
    })
}

fn blocked_result(rule: &PolicyRule, reason_code: &str, intent_digest: String, policy_digest: String) -> GateResult {
    let mut reason_codes = vec![reason_code.to_string()];
    reason_codes.extend(rule.reason_codes.iter().cloned());
    GateResult {
        verdict: Verdict::Block,
        reason_codes,
        violations: rule.violations.clone(),
        matched_rule: Some(rule.name.clone()),
        approval_ref: None,
        delegation_refs: Vec::new(),
        credential_ref: None,
        intent_digest,
        policy_digest,
        pre_approved: false,
    }
}

fn check_context_evidence(inputs: &GateInputs<'_>, rule: &PolicyRule) -> Option<&'static str> {
    let context = inputs.intent.context.as_object()?;
    let digest = context.get("context_set_digest").and_then(|value| value.as_str());
    if digest.is_none_or(str::is_empty) {
        return Some(reason::CONTEXT_SET_DIGEST_MISSING);
    }
    if let Some(required_mode) = &rule.required_context_evidence_mode {
        let mode = context.get("context_evidence_mode").and_then(|value| value.as_str()).unwrap_or("best_effort");
        let satisfied = match required_mode.as_str() {
            "required" => mode == "required",
            _ => true,
        };
        if !satisfied {
            return Some(reason::CONTEXT_EVIDENCE_MODE_MISMATCH);
        }
    }
    if let Some(max_age) = rule.max_context_age_seconds {
        let age = context.get("context_age_seconds").and_then(serde_json::Value::as_u64);
        match age {
            Some(age) if age <= max_age => {}
            Some(_) => return Some(reason::CONTEXT_FRESHNESS_EXCEEDED),
            None => return Some(reason::CONTEXT_EVIDENCE_MISSING),
        }
    }
    None
}

fn verify_delegation(inputs: &GateInputs<'_>) -> Result<Vec<String>, &'static str> {
    let Some(delegation) = &inputs.intent.delegation else {
        return Err(reason::DELEGATION_MISSING);
    };
    if inputs.delegation_tokens.is_empty() {
        return Err(reason::DELEGATION_MISSING);
    }
    gait_schema::tokens::validate_chain_linkage(inputs.delegation_tokens).map_err(|_err| reason::DELEGATION_INVALID)?;
    let Some(first) = inputs.delegation_tokens.first() else {
        return Err(reason::DELEGATION_MISSING);
    };
    if first.delegator_identity != delegation.requester_identity {
        return Err(reason::DELEGATION_INVALID);
    }
    for token in inputs.delegation_tokens {
        if token.is_expired(inputs.now) {
            return Err(reason::DELEGATION_INVALID);
        }
    }
    Ok(inputs.delegation_tokens.iter().map(|token| token.delegate_identity.clone()).collect())
}

fn find_valid_approval(
    inputs: &GateInputs<'_>,
    intent_digest: &str,
    policy_digest: &str,
    rule: &PolicyRule,
) -> Option<String> {
    inputs
        .approval_tokens
        .iter()
        .find(|token| {
            token.binds(intent_digest, policy_digest)
                && !token.is_expired(inputs.now)
                && token.grants_tool(&inputs.intent.tool_name)
                && rule.effect != gait_schema::policy::PolicyEffect::Block
        })
        .map(|token| token.token_id.clone())
}

fn build_trace(inputs: &GateInputs<'_>, result: &GateResult) -> Result<TraceRecord, GateError> {
    let mut trace = TraceRecord {
        trace_id: inputs.trace_id.clone(),
        tool_name: inputs.intent.tool_name.clone(),
        intent_digest: result.intent_digest.clone(),
        policy_digest: result.policy_digest.clone(),
        verdict: result.verdict,
        reason_codes: result.reason_codes.clone(),
        violations: result.violations.clone(),
        approval_ref: result.approval_ref.clone(),
        delegation_refs: result.delegation_refs.clone(),
        credential_ref: result.credential_ref.clone(),
        matched_rule: result.matched_rule.clone(),
        decision_latency_ms: inputs.decision_latency_ms,
        signature: None,
    };
    if let Some(key) = inputs.signing_key {
        let digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &trace.unsigned())
            .map_err(|err| GateError::Sign(err.to_string()))?;
        let signature = key.sign_digest(&digest).map_err(|err| GateError::Sign(err.to_string()))?;
        trace.signature = Some(signature.to_base64());
    }
    Ok(trace)
}
