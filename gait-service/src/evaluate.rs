// gait-service/src/evaluate.rs
// ============================================================================
// Module: Evaluate Request Handling
// Description: Wires one HTTP evaluate request through stop preemption, the
// policy gate, HTTP status mapping, and optional pack emission.
// Purpose: Implement the request body of spec.md §4.12's /v1/evaluate family.
// Dependencies: gait-core, gait-jobs, gait-pack, gait-policy, gait-schema
// ============================================================================

//! ## Overview
//! [`evaluate_request`] is the one function every transport (plain JSON,
//! SSE, ndjson) calls. It never dispatches the underlying tool call; per
//! `spec.md` §4.12 the service only ever returns a decision. Stop
//! preemption is checked first by attempting
//! [`gait_jobs::JobRuntime::record_blocked_dispatch`]: if the referenced
//! job is `emergency_stopped` that call succeeds and records the blocked
//! dispatch in the same step, short-circuiting the policy gate entirely;
//! any other outcome (no such job, job not stopped) falls through to
//! [`gait_policy::evaluate`] unchanged.

use gait_core::HashAlgorithm;
use gait_core::JobId;
use gait_core::Timestamp;
use gait_jobs::BlockedDispatchOptions;
use gait_jobs::JobError;
use gait_schema::IntentRequest;
use gait_schema::TraceRecord;
use gait_schema::config::EmitPackMode;
use gait_schema::config::HttpVerdictStatus;
use gait_schema::policy::Verdict;
use serde::Deserialize;
use serde::Serialize;

use crate::ServiceError;
use crate::state::ServiceState;
use crate::state::SuppliedTokens;

/// Reason code recorded when a dispatch is preempted by an emergency-stopped job.
pub const EMERGENCY_STOP_REASON: &str = "emergency_stop_preempted";

/// One `/v1/evaluate` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    /// The intent to evaluate.
    pub intent: IntentRequest,
    /// Approval/delegation tokens presented alongside the intent.
    #[serde(default)]
    pub tokens: SuppliedTokens,
}

/// One `/v1/evaluate` response body: the gate decision plus the exit code a
/// CLI caller would have produced for the same verdict.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    /// The verdict reached.
    pub verdict: Verdict,
    /// Reason codes accumulated during evaluation.
    pub reason_codes: Vec<String>,
    /// Violation descriptions accumulated during evaluation.
    pub violations: Vec<String>,
    /// Name of the rule that matched, if any.
    pub matched_rule: Option<String>,
    /// Stable CLI/service exit code for this verdict.
    pub exit_code: u8,
    /// The signed trace record emitted for this evaluation.
    pub trace: TraceRecord,
    /// Identifier of the call pack written for this request, if one was emitted.
    pub pack_id: Option<String>,
}

/// Evaluates one request against `state`, honoring stop preemption and
/// auto-pack emission.
///
/// # Errors
///
/// Returns [`ServiceError::Gate`] if the policy gate fails to digest or
/// sign its result, or [`ServiceError::Pack`] if auto-pack emission fails.
pub fn evaluate_request(state: &ServiceState, request: &EvaluateRequest, trace_id: String) -> Result<EvaluateResponse, ServiceError> {
    evaluate_request_with_stages(state, request, trace_id, |_stage| {})
}

/// Evaluates one request exactly as [`evaluate_request`] does, additionally
/// calling `sink` once per [`gait_policy::DecisionStage`] boundary crossed —
/// the hook `handle_evaluate_sse`/`handle_evaluate_stream` use to emit one
/// event per decision stage. Stop preemption short-circuits the gate
/// entirely, so it reports only `Started` and `Completed`.
///
/// # Errors
///
/// Same as [`evaluate_request`].
pub fn evaluate_request_with_stages(
    state: &ServiceState,
    request: &EvaluateRequest,
    trace_id: String,
    mut sink: impl FnMut(gait_policy::DecisionStage),
) -> Result<EvaluateResponse, ServiceError> {
    sink(gait_policy::DecisionStage::Started);

    if let Some(response) = try_stop_preemption(state, request, &trace_id)? {
        sink(gait_policy::DecisionStage::Completed);
        return Ok(response);
    }

    let inputs = gait_policy::GateInputs {
        intent: &request.intent,
        policy: &state.policy,
        approval_tokens: &request.tokens.approval_tokens,
        delegation_tokens: &request.tokens.delegation_tokens,
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: state.signing_key.as_ref(),
        now: Timestamp::now(),
        decision_latency_ms: 0,
        trace_id,
    };
    let (result, trace) = gait_policy::evaluate_with_stages(&inputs, |stage| {
        if stage != gait_policy::DecisionStage::Started {
            sink(stage);
        }
    })
    .map_err(ServiceError::Gate)?;

    let pack_id = maybe_emit_pack(state, request, &result, &trace)?;

    let exit_code = result.exit_code();
    Ok(EvaluateResponse {
        verdict: result.verdict,
        reason_codes: result.reason_codes,
        violations: result.violations,
        matched_rule: result.matched_rule,
        exit_code,
        trace,
        pack_id,
    })
}

/// Checks whether `request.intent.context.job_id` names a job currently
/// `emergency_stopped`. If so, records the blocked dispatch and returns a
/// synthetic `block` response without consulting the policy gate.
fn try_stop_preemption(state: &ServiceState, request: &EvaluateRequest, trace_id: &str) -> Result<Option<EvaluateResponse>, ServiceError> {
    let Some(job_id) = request.intent.context_job_id() else {
        return Ok(None);
    };
    let job_id = JobId::new(job_id);
    let opts = BlockedDispatchOptions { tool_name: request.intent.tool_name.clone(), intent_id: None };
    match state.jobs.record_blocked_dispatch(&job_id, opts) {
        Ok(()) => {
            let intent_digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &request.intent)
                .map_err(|err| ServiceError::Gate(gait_policy::GateError::Digest(err.to_string())))?
                .to_string();
            let policy_digest = gait_core::hash_canonical_json(HashAlgorithm::Sha256, &state.policy)
                .map_err(|err| ServiceError::Gate(gait_policy::GateError::Digest(err.to_string())))?
                .to_string();
            let trace = TraceRecord {
                trace_id: trace_id.to_string(),
                tool_name: request.intent.tool_name.clone(),
                intent_digest,
                policy_digest,
                verdict: Verdict::Block,
                reason_codes: vec![EMERGENCY_STOP_REASON.to_string()],
                violations: Vec::new(),
                approval_ref: None,
                delegation_refs: Vec::new(),
                credential_ref: None,
                matched_rule: None,
                decision_latency_ms: 0,
                signature: None,
            };
            Ok(Some(EvaluateResponse {
                verdict: Verdict::Block,
                reason_codes: vec![EMERGENCY_STOP_REASON.to_string()],
                violations: Vec::new(),
                matched_rule: None,
                exit_code: Verdict::Block.exit_code(),
                trace,
                pack_id: None,
            }))
        }
        Err(JobError::InvalidTransition { .. } | JobError::Store(_) | JobError::Schema(_)) => Ok(None),
        Err(err) => Err(ServiceError::Job(err)),
    }
}

/// Builds a call pack for this request when `emit_pack` is `state_changing`
/// and the verdict is `allow` on a destructive target.
fn maybe_emit_pack(
    state: &ServiceState,
    request: &EvaluateRequest,
    result: &gait_policy::GateResult,
    trace: &TraceRecord,
) -> Result<Option<String>, ServiceError> {
    if state.config.emit_pack != EmitPackMode::StateChanging {
        return Ok(None);
    }
    if result.verdict != Verdict::Allow {
        return Ok(None);
    }
    let is_destructive = request.intent.targets.iter().any(|target| target.destructive == Some(true));
    if !is_destructive {
        return Ok(None);
    }
    let run_id = trace.trace_id.clone();
    let built = gait_pack::build_call_pack(&run_id, &request.intent, trace, None, &[], state.signing_key.as_ref()).map_err(ServiceError::Pack)?;
    std::fs::create_dir_all(&state.pack_dir).map_err(|err| ServiceError::Io(err.to_string()))?;
    let path = state.pack_dir.join(format!("{}.zip", built.manifest.pack_id));
    gait_core::write_file_atomic(&path, &built.archive).map_err(ServiceError::Fs)?;
    Ok(Some(built.manifest.pack_id))
}

/// Maps a verdict onto an HTTP status code per `state.config.http_verdict_status`.
#[must_use]
pub fn verdict_status(mode: HttpVerdictStatus, verdict: Verdict) -> u16 {
    match mode {
        HttpVerdictStatus::Lenient => 200,
        HttpVerdictStatus::Strict => match verdict {
            Verdict::Allow | Verdict::DryRun => 200,
            Verdict::RequireApproval => 402,
            Verdict::Block => 403,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gait_schema::Target;
    use gait_schema::config::ServiceConfig;
    use gait_schema::policy::Policy;
    use serde_json::json;
    use tempfile::tempdir;

    use super::EvaluateRequest;
    use super::evaluate_request;
    use super::verdict_status;
    use crate::state::ServiceState;
    use gait_schema::config::HttpVerdictStatus;
    use gait_schema::policy::Verdict;

    fn open_policy() -> Policy {
        Policy::parse_yaml(b"default_verdict: allow\nrules: []\n").expect("parse")
    }

    fn state_with_policy(policy: Policy) -> ServiceState {
        ServiceState::new(ServiceConfig::default(), policy, None, PathBuf::from("/tmp/gait-service-unused-jobs-root"))
    }

    fn intent(tool_name: &str, context: serde_json::Value) -> gait_schema::IntentRequest {
        gait_schema::IntentRequest {
            tool_name: tool_name.to_string(),
            args: json!({}),
            targets: vec![],
            arg_provenance: vec![],
            context,
            delegation: None,
            skill_provenance: None,
        }
    }

    #[test]
    fn default_policy_allows_an_unmatched_intent() {
        let state = state_with_policy(open_policy());
        let request = EvaluateRequest { intent: intent("tool.read", json!({})), tokens: Default::default() };
        let response = evaluate_request(&state, &request, "trace-1".to_string()).expect("evaluate");
        assert_eq!(response.verdict, Verdict::Allow);
        assert_eq!(response.exit_code, 0);
    }

    #[test]
    fn job_id_referencing_an_emergency_stopped_job_preempts_the_gate() {
        let dir = tempdir().expect("tempdir");
        let state = ServiceState::new(ServiceConfig::default(), open_policy(), None, dir.path().to_path_buf());
        let job_id = gait_core::JobId::new("job-stop-1");
        state.jobs.submit(&job_id, gait_jobs::SubmitOptions::default()).expect("submit");
        state.jobs.emergency_stop(&job_id, None).expect("stop");

        let request = EvaluateRequest { intent: intent("tool.write", json!({"job_id": "job-stop-1"})), tokens: Default::default() };
        let response = evaluate_request(&state, &request, "trace-2".to_string()).expect("evaluate");
        assert_eq!(response.verdict, Verdict::Block);
        assert_eq!(response.reason_codes, vec![super::EMERGENCY_STOP_REASON.to_string()]);
    }

    #[test]
    fn job_id_referencing_a_running_job_does_not_preempt() {
        let dir = tempdir().expect("tempdir");
        let state = ServiceState::new(ServiceConfig::default(), open_policy(), None, dir.path().to_path_buf());
        let job_id = gait_core::JobId::new("job-run-1");
        state.jobs.submit(&job_id, gait_jobs::SubmitOptions::default()).expect("submit");

        let request = EvaluateRequest { intent: intent("tool.write", json!({"job_id": "job-run-1"})), tokens: Default::default() };
        let response = evaluate_request(&state, &request, "trace-3".to_string()).expect("evaluate");
        assert_eq!(response.verdict, Verdict::Allow);
    }

    #[test]
    fn strict_mode_maps_block_to_403() {
        assert_eq!(verdict_status(HttpVerdictStatus::Strict, Verdict::Block), 403);
        assert_eq!(verdict_status(HttpVerdictStatus::Strict, Verdict::RequireApproval), 402);
        assert_eq!(verdict_status(HttpVerdictStatus::Strict, Verdict::Allow), 200);
    }

    #[test]
    fn lenient_mode_always_returns_200() {
        assert_eq!(verdict_status(HttpVerdictStatus::Lenient, Verdict::Block), 200);
    }

    #[test]
    fn non_destructive_allow_does_not_emit_a_pack() {
        let mut config = ServiceConfig::default();
        config.emit_pack = gait_schema::config::EmitPackMode::StateChanging;
        let mut state = state_with_policy(open_policy());
        state.config = config;
        let request = EvaluateRequest { intent: intent("tool.read", json!({})), tokens: Default::default() };
        let response = evaluate_request(&state, &request, "trace-4".to_string()).expect("evaluate");
        assert_eq!(response.pack_id, None);
    }

    #[test]
    fn evaluate_request_with_stages_reports_started_rule_matched_and_completed() {
        let state = state_with_policy(open_policy());
        let request = EvaluateRequest { intent: intent("tool.read", json!({})), tokens: Default::default() };
        let mut stages = Vec::new();
        let response = super::evaluate_request_with_stages(&state, &request, "trace-stages".to_string(), |stage| stages.push(stage)).expect("evaluate");
        assert_eq!(response.verdict, Verdict::Allow);
        assert_eq!(stages.first(), Some(&gait_policy::DecisionStage::Started));
        assert_eq!(stages.last(), Some(&gait_policy::DecisionStage::Completed));
    }

    #[test]
    fn stop_preemption_reports_only_started_and_completed() {
        let dir = tempdir().expect("tempdir");
        let state = ServiceState::new(ServiceConfig::default(), open_policy(), None, dir.path().to_path_buf());
        let job_id = gait_core::JobId::new("job-stop-stages");
        state.jobs.submit(&job_id, gait_jobs::SubmitOptions::default()).expect("submit");
        state.jobs.emergency_stop(&job_id, None).expect("stop");

        let request = EvaluateRequest { intent: intent("tool.write", json!({"job_id": "job-stop-stages"})), tokens: Default::default() };
        let mut stages = Vec::new();
        let response = super::evaluate_request_with_stages(&state, &request, "trace-stop-stages".to_string(), |stage| stages.push(stage)).expect("evaluate");
        assert_eq!(response.verdict, Verdict::Block);
        assert_eq!(stages, vec![gait_policy::DecisionStage::Started, gait_policy::DecisionStage::Completed]);
    }

    #[test]
    fn destructive_allow_emits_a_pack_when_configured() {
        let mut config = ServiceConfig::default();
        config.emit_pack = gait_schema::config::EmitPackMode::StateChanging;
        let dir = tempdir().expect("tempdir");
        config.pack_dir = Some(dir.path().join("packs"));
        let state = ServiceState::new(config, open_policy(), None, dir.path().join("jobs"));
        let mut request_intent = intent("tool.write", json!({}));
        request_intent.targets = vec![Target { kind: "file".to_string(), value: "/tmp/x".to_string(), operation: Some("write".to_string()), endpoint_class: None, destructive: Some(true) }];
        let request = EvaluateRequest { intent: request_intent, tokens: Default::default() };
        let response = evaluate_request(&state, &request, "trace-5".to_string()).expect("evaluate");
        assert!(response.pack_id.is_some());
    }
}
