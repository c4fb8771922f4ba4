// gait-cli/tests/gate_commands.rs
// ============================================================================
// Module: Gate Command Tests
// Description: Integration tests for `gait gate eval` and `gait policy`.
// Purpose: Ensure the binary's gate/policy surfaces reach the verdicts and
// exit codes `gait_policy::evaluate` itself computes.
// Dependencies: gait binary, serde_json
// ============================================================================

//! Integration tests for `gait gate eval` and `gait policy`.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::print_stdout,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;
use serde_json::json;

fn gait_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gait"))
}

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("gait-cli-{label}-{nanos}"));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn cleanup(path: &Path) {
    let _ = fs::remove_dir_all(path);
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_vec_pretty(value).expect("serialize")).expect("write json");
}

fn sample_intent(tool_name: &str) -> Value {
    json!({
        "tool_name": tool_name,
        "args": {},
        "targets": [{"kind": "file", "value": "/tmp/example.txt"}],
        "arg_provenance": [],
        "context": {},
    })
}

fn allow_policy_yaml() -> String {
    "default_verdict: block\nrules:\n  - name: allow_reads\n    priority: 10\n    effect: allow\n    match:\n      tool_names: [\"tool.read\"]\n".to_string()
}

#[test]
fn gate_eval_allows_matching_intent_and_exits_zero() {
    let root = temp_root("gate-allow");
    let intent_path = root.join("intent.json");
    let policy_path = root.join("policy.yaml");
    write_json(&intent_path, &sample_intent("tool.read"));
    fs::write(&policy_path, allow_policy_yaml()).expect("write policy");

    let output = Command::new(gait_bin())
        .args([
            "gate",
            "eval",
            "--intent",
            intent_path.to_string_lossy().as_ref(),
            "--policy",
            policy_path.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("gate eval");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout: Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(stdout["verdict"], "allow");
    assert_eq!(stdout["exit_code"], 0);
    assert_eq!(stdout["matched_rule"], "allow_reads");

    cleanup(&root);
}

#[test]
fn gate_eval_blocks_unmatched_intent_with_exit_code_three() {
    let root = temp_root("gate-block");
    let intent_path = root.join("intent.json");
    let policy_path = root.join("policy.yaml");
    write_json(&intent_path, &sample_intent("tool.delete"));
    fs::write(&policy_path, allow_policy_yaml()).expect("write policy");

    let output = Command::new(gait_bin())
        .args([
            "gate",
            "eval",
            "--intent",
            intent_path.to_string_lossy().as_ref(),
            "--policy",
            policy_path.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("gate eval");

    assert_eq!(output.status.code(), Some(3));
    let stdout: Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(stdout["verdict"], "block");

    cleanup(&root);
}

#[test]
fn gate_eval_rejects_malformed_intent_with_input_exit_code() {
    let root = temp_root("gate-bad-intent");
    let intent_path = root.join("intent.json");
    let policy_path = root.join("policy.yaml");
    fs::write(&intent_path, "{}").expect("write malformed intent");
    fs::write(&policy_path, allow_policy_yaml()).expect("write policy");

    let output = Command::new(gait_bin())
        .args([
            "gate",
            "eval",
            "--intent",
            intent_path.to_string_lossy().as_ref(),
            "--policy",
            policy_path.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("gate eval");

    assert_eq!(output.status.code(), Some(6));

    cleanup(&root);
}

#[test]
fn policy_init_writes_fail_closed_template_that_validates() {
    let root = temp_root("policy-init");
    let policy_path = root.join("policy.yaml");

    let init_output = Command::new(gait_bin()).args(["policy", "init", policy_path.to_string_lossy().as_ref()]).output().expect("policy init");
    assert!(init_output.status.success());

    let validate_output = Command::new(gait_bin()).args(["policy", "validate", policy_path.to_string_lossy().as_ref()]).output().expect("policy validate");
    assert!(validate_output.status.success(), "stderr: {}", String::from_utf8_lossy(&validate_output.stderr));
    let stdout: Value = serde_json::from_slice(&validate_output.stdout).expect("parse json");
    assert_eq!(stdout["default_verdict"], "block");

    cleanup(&root);
}

#[test]
fn policy_simulate_reports_matched_rule_rank() {
    let root = temp_root("policy-simulate");
    let intent_path = root.join("intent.json");
    let policy_path = root.join("policy.yaml");
    write_json(&intent_path, &sample_intent("tool.read"));
    fs::write(&policy_path, allow_policy_yaml()).expect("write policy");

    let output = Command::new(gait_bin())
        .args([
            "policy",
            "simulate",
            "--policy",
            policy_path.to_string_lossy().as_ref(),
            "--intent",
            intent_path.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("policy simulate");

    assert!(output.status.success());
    let stdout: Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(stdout["matched_rule_rank"], 0);

    cleanup(&root);
}
