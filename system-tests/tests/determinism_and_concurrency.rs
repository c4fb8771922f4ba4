// system-tests/tests/determinism_and_concurrency.rs
// ============================================================================
// Module: Determinism and Concurrency Harness Tests
// Description: Exercises spec.md §8's determinism and concurrency
// properties: byte-identical pack builds, byte-identical gate traces given
// fixed inputs, and race-free concurrent writers/installers.
// Purpose: Catch nondeterminism (unsorted maps, wall-clock leakage,
// unguarded concurrent writes) that a single-threaded functional test would
// never observe.
// Dependencies: base64, gait-core, gait-pack, gait-policy, gait-registry,
// gait-schema, tempfile
// ============================================================================

//! Exercises spec.md §8's determinism and concurrency properties.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use gait_core::KeyMode;
use gait_core::PrivateKey;
use gait_core::Timestamp;
use gait_policy::GateInputs;
use gait_schema::IntentRequest;
use gait_schema::Policy;
use gait_schema::intent::Target;
use gait_schema::trace::TraceRecord;

fn fixed_intent() -> IntentRequest {
    IntentRequest {
        tool_name: "tool.read".to_string(),
        args: serde_json::json!({}),
        targets: vec![Target { kind: "file".to_string(), value: "/tmp/determinism".to_string(), operation: None, endpoint_class: None, destructive: None }],
        arg_provenance: Vec::new(),
        context: serde_json::json!({}),
        delegation: None,
        skill_provenance: None,
    }
}

fn fixed_policy() -> Policy {
    Policy::parse_yaml(b"default_verdict: allow\nrules: []\n").expect("parse")
}

// Two independent pack builds from identical inputs must produce
// byte-identical archives: the manifest is sorted by path and the ZIP
// writer never embeds a timestamp or per-run entropy.
#[test]
fn pack_build_is_byte_for_byte_deterministic() {
    let intent = fixed_intent();
    let trace = sample_trace();

    let first = gait_pack::build_run_pack("run-determinism-001", &[intent.clone()], &[trace.clone()], None).expect("build first");
    let second = gait_pack::build_run_pack("run-determinism-001", &[intent], &[trace], None).expect("build second");

    assert_eq!(first.archive, second.archive, "identical inputs must build byte-identical archives");
}

// Two gate evaluations against identical inputs, with `now` and
// `trace_id` both pinned by the caller, must emit byte-identical traces:
// the signature is deterministic ed25519 over the same canonical bytes.
#[test]
fn gate_eval_is_deterministic_given_fixed_clock_and_trace_id() {
    let intent = fixed_intent();
    let policy = fixed_policy();
    let key = PrivateKey::load(&KeyMode::Dev).unwrap();
    let now = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();

    let build_inputs = || GateInputs {
        intent: &intent,
        policy: &policy,
        approval_tokens: &[],
        delegation_tokens: &[],
        broker: None,
        broker_required_by_profile: false,
        approved_scripts: None,
        signing_key: Some(&key),
        now,
        decision_latency_ms: 7,
        trace_id: "trace_determinism".to_string(),
    };

    let (_result_a, trace_a) = gait_policy::evaluate(&build_inputs()).expect("evaluate a");
    let (_result_b, trace_b) = gait_policy::evaluate(&build_inputs()).expect("evaluate b");

    let json_a = serde_json::to_string(&trace_a).expect("serialize a");
    let json_b = serde_json::to_string(&trace_b).expect("serialize b");
    assert_eq!(json_a, json_b, "identical inputs at a fixed instant must produce byte-identical traces");
}

// 200 threads append a line to the same job journal concurrently, guarded
// by gait_core::append_line_locked. Every line must parse as JSON and no
// writer may observe a torn or partial line from another.
#[test]
fn concurrent_journal_writers_never_tear_a_line() {
    const WRITER_COUNT: usize = 200;

    let dir = tempfile::tempdir().expect("tempdir");
    let journal_path = dir.path().join("events.jsonl");
    let barrier = Arc::new(Barrier::new(WRITER_COUNT));

    let handles: Vec<_> = (0..WRITER_COUNT)
        .map(|index| {
            let path = journal_path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let line = serde_json::json!({"writer": index, "reason_code": "concurrent_write"}).to_string();
                gait_core::fsutil::append_line_locked(&path, &line).expect("append line");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let contents = std::fs::read_to_string(&journal_path).expect("read journal");
    let lines: Vec<&str> = contents.lines().filter(|line| !line.is_empty()).collect();
    assert_eq!(lines.len(), WRITER_COUNT, "every writer's line must land intact, none dropped or merged");

    let mut seen_writers = std::collections::HashSet::new();
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap_or_else(|err| panic!("line failed to parse as json ({err}): {line}"));
        let writer = value["writer"].as_u64().expect("writer field");
        assert!(seen_writers.insert(writer), "writer id {writer} appeared more than once");
    }
}

// 8 concurrent installs of the same signed local manifest must all
// succeed and converge on the same cached file and pin, never racing to a
// half-written cache entry.
#[test]
fn concurrent_installs_converge_on_the_same_cache_entry() {
    use gait_registry::InstallRequest;
    use gait_registry::Source;
    use gait_schema::ManifestSignature;
    use gait_schema::RegistryManifest;

    const INSTALLER_COUNT: usize = 8;

    let source_dir = tempfile::tempdir().expect("tempdir");
    let cache_dir = tempfile::tempdir().expect("tempdir");
    let key = PrivateKey::generate();

    let unsigned = RegistryManifest { pack_name: "concurrent-pack".to_string(), pack_version: "1.0.0".to_string(), publisher: "Acme Corp".to_string(), digest: "c".repeat(64), signatures: Vec::new() };
    let digest = gait_core::hash_canonical_json(gait_core::HashAlgorithm::Sha256, &unsigned).unwrap();
    let signature = key.sign_digest(&digest).unwrap();
    let manifest = RegistryManifest {
        signatures: vec![ManifestSignature { alg: "ed25519".to_string(), key_id: registry_key_id(&key.public_key()), sig: signature.to_base64(), signed_digest: digest.as_str().to_string() }],
        ..unsigned
    };
    let manifest_path = source_dir.path().join("manifest.json");
    std::fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

    let barrier = Arc::new(Barrier::new(INSTALLER_COUNT));
    let handles: Vec<_> = (0..INSTALLER_COUNT)
        .map(|_| {
            let manifest_path = manifest_path.clone();
            let cache_dir = cache_dir.path().to_path_buf();
            let public_key = key.public_key();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let request = InstallRequest {
                    source: Source::LocalFile(manifest_path),
                    cache_dir,
                    allow_hosts: Vec::new(),
                    publisher_allowlist: vec!["acme corp".to_string()],
                    pin_digest: None,
                    public_key: &public_key,
                    allow_insecure_http: false,
                    cached_fallback: false,
                };
                gait_registry::install(&request)
            })
        })
        .collect();

    let reports: Vec<_> = handles.into_iter().map(|handle| handle.join().expect("installer thread panicked")).collect();
    for report in &reports {
        assert!(report.is_ok(), "every concurrent installer must succeed, got {:?}", report.as_ref().err());
    }

    let cached_paths: std::collections::HashSet<_> = reports.iter().map(|report| report.as_ref().unwrap().cached_path.clone()).collect();
    assert_eq!(cached_paths.len(), 1, "all installers must converge on the same cache path");

    let pin_path = cache_dir.path().join("pins").join("concurrent-pack.pin");
    assert!(pin_path.exists());
    let pin_contents = std::fs::read_to_string(&pin_path).expect("read pin");
    assert!(pin_contents.starts_with("sha256:"));
}

fn registry_key_id(public_key: &gait_core::signing::PublicKey) -> String {
    use base64::Engine as _;
    let raw = base64::engine::general_purpose::STANDARD.decode(public_key.to_base64()).unwrap_or_default();
    gait_core::hashing::digest_hex(gait_core::hashing::DEFAULT_HASH_ALGORITHM, &raw).as_str().chars().take(16).collect()
}

fn sample_trace() -> TraceRecord {
    TraceRecord {
        trace_id: "trace_determinism_pack".to_string(),
        tool_name: "tool.read".to_string(),
        intent_digest: "deadbeef".to_string(),
        policy_digest: "feedface".to_string(),
        verdict: gait_schema::policy::Verdict::Allow,
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
