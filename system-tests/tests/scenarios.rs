// system-tests/tests/scenarios.rs
// ============================================================================
// Module: End-to-End Scenario Tests
// Description: Drives the six concrete scenarios from spec.md §8 straight
// through the library crates, without going through the CLI binary.
// Purpose: Exercise the decision pipeline (gate, ledger, jobs, registry,
// regress) the way gait-service's own handlers compose them.
// Dependencies: gait-core, gait-jobs, gait-ledger, gait-pack, gait-policy,
// gait-registry, gait-regress, gait-schema, gait-service, tempfile
// ============================================================================

//! Drives the six concrete scenarios from spec.md §8 through the library crates.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use gait_core::JobId;
use gait_core::KeyMode;
use gait_core::PrivateKey;
use gait_core::Timestamp;
use gait_jobs::BlockedDispatchOptions;
use gait_jobs::JobRuntime;
use gait_jobs::SubmitOptions;
use gait_policy::GateInputs;
use gait_schema::IntentRequest;
use gait_schema::Policy;
use gait_schema::intent::Target;
use gait_schema::policy::Verdict;

fn intent(tool_name: &str, target_value: &str) -> IntentRequest {
    IntentRequest {
        tool_name: tool_name.to_string(),
        args: serde_json::json!({}),
        targets: vec![Target {
            kind: "host".to_string(),
            value: target_value.to_string(),
            operation: Some("write".to_string()),
            endpoint_class: Some("external".to_string()),
            destructive: None,
        }],
        arg_provenance: Vec::new(),
        context: serde_json::json!({}),
        delegation: None,
        skill_provenance: None,
    }
}

fn intent_with_job(tool_name: &str, job_id: &str) -> IntentRequest {
    IntentRequest {
        tool_name: tool_name.to_string(),
        args: serde_json::json!({}),
        targets: vec![Target { kind: "file".to_string(), value: "/tmp/x".to_string(), operation: None, endpoint_class: None, destructive: None }],
        arg_provenance: Vec::new(),
        context: serde_json::json!({ "job_id": job_id }),
        delegation: None,
        skill_provenance: None,
    }
}

fn block_external_policy() -> Policy {
    let yaml = "default_verdict: allow\n\
rules:\n\
  - name: block-external-write\n\
    priority: 1\n\
    effect: block\n\
    match:\n\
      tool_names: [tool.write]\n\
      target_kinds: [host]\n\
    reason_codes: [blocked_external]\n";
    Policy::parse_yaml(yaml.as_bytes()).expect("parse block-external policy")
}

fn require_approval_policy() -> Policy {
    let yaml = "default_verdict: allow\n\
rules:\n\
  - name: require-approval-write\n\
    priority: 1\n\
    effect: require_approval\n\
    match:\n\
      tool_names: [tool.write]\n";
    Policy::parse_yaml(yaml.as_bytes()).expect("parse require-approval policy")
}

// Scenario 1: a write targeting an external host is blocked outright, and
// the resulting trace record verifies against the signing key's public half.
#[test]
fn scenario_block_on_external_target() {
    let intent = intent("tool.write", "api.external.com");
    let policy = block_external_policy();
    let key = PrivateKey::load(&KeyMode::Dev).unwrap();

    let inputs = GateInputs {
        intent: &intent,
        policy: &policy,
        approval_tokens: &[],
        delegation_tokens: &[],
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: Some(&key),
        now: Timestamp::now(),
        decision_latency_ms: 3,
        trace_id: "trace_scenario_1".to_string(),
    };
    let (result, trace) = gait_policy::evaluate(&inputs).expect("evaluate");

    assert_eq!(result.verdict, Verdict::Block);
    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.reason_codes, vec!["blocked_external".to_string()]);
    assert_eq!(result.matched_rule.as_deref(), Some("block-external-write"));

    gait_ledger::verify_trace(&trace, &key.public_key()).expect("trace verifies against its own signer");
}

// Scenario 2: the same write, this time with a valid approval token bound to
// the exact digests the gate computes, is allowed.
#[test]
fn scenario_require_approval_happy_path() {
    let intent = intent("tool.write", "api.external.com");
    let policy = require_approval_policy();
    let key = PrivateKey::load(&KeyMode::Dev).unwrap();

    let intent_digest = gait_core::hash_canonical_json(gait_core::HashAlgorithm::Sha256, &intent).unwrap().to_string();
    let policy_digest = gait_core::hash_canonical_json(gait_core::HashAlgorithm::Sha256, &policy).unwrap().to_string();
    let approval = gait_ledger::mint_approval(
        "tok_scenario_2",
        intent_digest,
        policy_digest,
        vec!["tool:tool.write".to_string()],
        "alice",
        "manual_review",
        Timestamp::parse("2030-01-01T00:00:00Z").unwrap(),
        &key,
    )
    .expect("mint approval");

    let inputs = GateInputs {
        intent: &intent,
        policy: &policy,
        approval_tokens: std::slice::from_ref(&approval),
        delegation_tokens: &[],
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: Some(&key),
        now: Timestamp::now(),
        decision_latency_ms: 4,
        trace_id: "trace_scenario_2".to_string(),
    };
    let (result, _trace) = gait_policy::evaluate(&inputs).expect("evaluate");

    assert_eq!(result.verdict, Verdict::Allow);
    assert_eq!(result.exit_code(), 0);
    assert!(result.reason_codes.contains(&"approval_granted".to_string()));
    assert_eq!(result.approval_ref.as_deref(), Some("tok_scenario_2"));
}

// Scenario 3: a token minted against a different intent does not bind, and
// the gate stops at require_approval rather than silently allowing.
#[test]
fn scenario_approval_mismatch() {
    let intent = intent("tool.write", "api.external.com");
    let policy = require_approval_policy();
    let key = PrivateKey::load(&KeyMode::Dev).unwrap();
    let policy_digest = gait_core::hash_canonical_json(gait_core::HashAlgorithm::Sha256, &policy).unwrap().to_string();

    let approval = gait_ledger::mint_approval(
        "tok_scenario_3",
        "a-digest-for-a-different-intent",
        policy_digest,
        vec!["tool:tool.write".to_string()],
        "alice",
        "manual_review",
        Timestamp::parse("2030-01-01T00:00:00Z").unwrap(),
        &key,
    )
    .expect("mint approval");

    let inputs = GateInputs {
        intent: &intent,
        policy: &policy,
        approval_tokens: std::slice::from_ref(&approval),
        delegation_tokens: &[],
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: Some(&key),
        now: Timestamp::now(),
        decision_latency_ms: 4,
        trace_id: "trace_scenario_3".to_string(),
    };
    let (result, _trace) = gait_policy::evaluate(&inputs).expect("evaluate");

    assert_eq!(result.verdict, Verdict::RequireApproval);
    assert_eq!(result.exit_code(), 4);
    assert!(result.reason_codes.contains(&"approval_token_intent_mismatch".to_string()));
    assert!(result.approval_ref.is_none());
}

// Scenario 4: a job that has been emergency-stopped preempts any further
// dispatch against it, independent of what the policy would otherwise say.
#[test]
fn scenario_emergency_stop_preemption() {
    let jobs_dir = tempfile::tempdir().expect("tempdir");
    let runtime = JobRuntime::new(jobs_dir.path());
    let job_id = JobId::new("job_scenario_4");
    runtime
        .submit(
            &job_id,
            SubmitOptions { identity: Some("agent-alpha".to_string()), safety_invariant_version: "v1".to_string(), ..Default::default() },
        )
        .expect("submit");
    runtime.emergency_stop(&job_id, Some("operator requested shutdown".to_string())).expect("emergency stop");

    let policy = require_approval_policy();
    let intent = intent_with_job("tool.write", job_id.as_str());
    let key = PrivateKey::load(&KeyMode::Dev).unwrap();
    let state = gait_service::state::ServiceState::new(Default::default(), policy, Some(key), jobs_dir.path().to_path_buf());
    let request = gait_service::evaluate::EvaluateRequest { intent, tokens: Default::default() };
    let response = gait_service::evaluate::evaluate_request(&state, &request, "trace_scenario_4".to_string()).expect("evaluate_request");

    assert_eq!(response.verdict, Verdict::Block);
    assert_eq!(response.exit_code, 3);
    assert!(response.reason_codes.contains(&"emergency_stop_preempted".to_string()));

    let blocked = runtime.record_blocked_dispatch(&job_id, BlockedDispatchOptions { tool_name: "tool.write".to_string(), intent_id: None });
    assert!(blocked.is_ok(), "dispatches against a stopped job keep recording dispatch_blocked events");
    let events = runtime.events(&job_id).expect("events");
    let blocked_events = events.iter().filter(|event| event.reason_code == "emergency_stop_preempted").count();
    assert!(blocked_events >= 2);
}

// Scenario 5: installing a manifest whose actual digest does not match a
// caller-supplied pin fails closed with `PinMismatch`, never silently
// installing the wrong version.
#[test]
fn scenario_registry_pin_mismatch() {
    use gait_registry::InstallRequest;
    use gait_registry::RegistryError;
    use gait_registry::Source;
    use gait_schema::ManifestSignature;
    use gait_schema::RegistryManifest;

    let source_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let key = PrivateKey::generate();

    let unsigned = RegistryManifest { pack_name: "demo-pack".to_string(), pack_version: "1.0.0".to_string(), publisher: "Acme Corp".to_string(), digest: "d".repeat(64), signatures: Vec::new() };
    let digest = gait_core::hash_canonical_json(gait_core::HashAlgorithm::Sha256, &unsigned).unwrap();
    let signature = key.sign_digest(&digest).unwrap();
    let manifest = RegistryManifest {
        signatures: vec![ManifestSignature { alg: "ed25519".to_string(), key_id: "irrelevant-to-pin-check".to_string(), sig: signature.to_base64(), signed_digest: digest.as_str().to_string() }],
        ..unsigned
    };
    let manifest_path = source_dir.path().join("manifest.json");
    std::fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

    let request = InstallRequest {
        source: Source::LocalFile(manifest_path),
        cache_dir: cache_dir.path().to_path_buf(),
        allow_hosts: Vec::new(),
        publisher_allowlist: vec!["acme corp".to_string()],
        pin_digest: Some("e".repeat(64)),
        public_key: &key.public_key(),
        allow_insecure_http: false,
        cached_fallback: false,
    };
    let result = gait_registry::install(&request);
    match result {
        Err(RegistryError::PinMismatch { expected, found }) => {
            assert_eq!(expected, "e".repeat(64));
            assert_eq!(found, "d".repeat(64));
        }
        other => panic!("expected PinMismatch, got {other:?}"),
    }
}

// Scenario 6: a fixture whose replayed archive no longer matches its
// captured digest baseline reports a failed, not-passed outcome rather than
// a panic or a silent pass.
#[test]
fn scenario_regress_forced_drift() {
    let intent_a = intent("tool.read", "internal-host");
    let trace_a = sample_trace("trace_fixture_a", "allow");
    let built_a = gait_pack::build_run_pack("run-drift-001", &[intent_a.clone()], &[trace_a], None).expect("build pack a");

    let intent_b = intent("tool.read", "a-completely-different-target");
    let trace_b = sample_trace("trace_fixture_b", "block");
    let built_b = gait_pack::build_run_pack("run-drift-001", &[intent_b], &[trace_b], None).expect("build pack b");

    let root = tempfile::tempdir().expect("tempdir");
    let fixtures_root = root.path().join("fixtures");
    std::fs::create_dir_all(&fixtures_root).expect("create fixtures root");
    let config_path = root.path().join("gait.yaml");

    let fixture = gait_regress::init::init(&fixtures_root, &config_path, "run-drift-001", &built_a.archive).expect("init fixture");
    let runpack_path = fixtures_root.join("run-drift-001").join(&fixture.runpack_file);
    std::fs::write(&runpack_path, &built_b.archive).expect("overwrite runpack with drifted content");

    let config = gait_regress::config::RegressConfig::load(&config_path).expect("load config");
    let report = gait_regress::run::run(&fixtures_root, &config).expect("run regress");

    assert!(!report.all_passed());
    assert_eq!(report.exit_code(), gait_regress::EXIT_REGRESSION);
    assert!(!report.outcomes[0].passed);
}

fn sample_trace(trace_id: &str, verdict: &str) -> gait_schema::trace::TraceRecord {
    let verdict = match verdict {
        "allow" => Verdict::Allow,
        "block" => Verdict::Block,
        other => panic!("unsupported verdict {other}"),
    };
    gait_schema::trace::TraceRecord {
        trace_id: trace_id.to_string(),
        tool_name: "tool.read".to_string(),
        intent_digest: "deadbeef".to_string(),
        policy_digest: "feedface".to_string(),
        verdict,
        reason_codes: Vec::new(),
        violations: Vec::new(),
        approval_ref: None,
        delegation_refs: Vec::new(),
        credential_ref: None,
        matched_rule: None,
        decision_latency_ms: 1,
        signature: None,
    }
}
