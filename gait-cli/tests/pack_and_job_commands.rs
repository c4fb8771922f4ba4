// gait-cli/tests/pack_and_job_commands.rs
// ============================================================================
// Module: Pack and Job Command Tests
// Description: Integration tests for `gait pack`, `gait keys`, and
// `gait job` command groups.
// Purpose: Exercise a build-then-verify pack round trip and a submit
// through resume job lifecycle against the actual binary.
// Dependencies: gait binary, serde_json
// ============================================================================

//! Integration tests for `gait pack`, `gait keys`, and `gait job` command groups.

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
use std::process::Output;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;

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

fn run(args: &[&str]) -> Output {
    Command::new(gait_bin()).args(args).output().expect("run gait")
}

fn json_stdout(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| panic!("invalid json stdout ({err}): {}", String::from_utf8_lossy(&output.stdout)))
}

#[test]
fn keys_init_then_pack_build_and_verify_round_trip() {
    let root = temp_root("pack-roundtrip");
    let key_path = root.join("signing.key");
    let content_path = root.join("evidence.txt");
    let archive_path = root.join("evidence.gaitpack");
    fs::write(&content_path, b"observed behavior during the run").expect("write content");

    let init_output = run(&["keys", "init", "--out", key_path.to_string_lossy().as_ref()]);
    assert!(init_output.status.success(), "stderr: {}", String::from_utf8_lossy(&init_output.stderr));
    let init_json = json_stdout(&init_output);
    let public_key_b64 = init_json["public_key"].as_str().expect("public_key string").to_string();
    let public_key_path = root.join("signing.pub");
    fs::write(&public_key_path, &public_key_b64).expect("write public key");

    let build_output = run(&[
        "pack",
        "build",
        "--content",
        content_path.to_string_lossy().as_ref(),
        "--out",
        archive_path.to_string_lossy().as_ref(),
        "--sign",
        "--key-file",
        key_path.to_string_lossy().as_ref(),
    ]);
    assert!(build_output.status.success(), "stderr: {}", String::from_utf8_lossy(&build_output.stderr));
    assert!(archive_path.exists(), "archive was not written");

    let verify_output = run(&[
        "pack",
        "verify",
        archive_path.to_string_lossy().as_ref(),
        "--public-key",
        public_key_path.to_string_lossy().as_ref(),
        "--require-signature",
    ]);
    assert!(verify_output.status.success(), "stderr: {}", String::from_utf8_lossy(&verify_output.stderr));

    cleanup(&root);
}

#[test]
fn pack_verify_reports_signature_failure_for_the_wrong_key() {
    let root = temp_root("pack-wrong-key");
    let signing_key_path = root.join("signing.key");
    let other_key_path = root.join("other.key");
    let content_path = root.join("evidence.txt");
    let archive_path = root.join("evidence.gaitpack");
    fs::write(&content_path, b"observed behavior during the run").expect("write content");

    run(&["keys", "init", "--out", signing_key_path.to_string_lossy().as_ref()]);
    let other_init = run(&["keys", "init", "--out", other_key_path.to_string_lossy().as_ref()]);
    let other_public_b64 = json_stdout(&other_init)["public_key"].as_str().expect("public_key string").to_string();
    let other_public_path = root.join("other.pub");
    fs::write(&other_public_path, &other_public_b64).expect("write public key");

    run(&[
        "pack",
        "build",
        "--content",
        content_path.to_string_lossy().as_ref(),
        "--out",
        archive_path.to_string_lossy().as_ref(),
        "--sign",
        "--key-file",
        signing_key_path.to_string_lossy().as_ref(),
    ]);

    let verify_output = run(&[
        "pack",
        "verify",
        archive_path.to_string_lossy().as_ref(),
        "--public-key",
        other_public_path.to_string_lossy().as_ref(),
        "--require-signature",
    ]);
    assert!(verify_output.status.success(), "integrity itself is intact even though the signature does not verify");
    let report = json_stdout(&verify_output);
    assert_eq!(report["signature_status"], "failed");
    assert_eq!(report["signatures_valid"], false);

    cleanup(&root);
}

#[test]
fn job_lifecycle_submit_checkpoint_pause_and_approve() {
    let root = temp_root("job-lifecycle");
    let jobs_root = root.join("jobs");
    fs::create_dir_all(&jobs_root).expect("create jobs root");
    let job_id = "job-lifecycle-001";
    let jobs_root_str = jobs_root.to_string_lossy().into_owned();

    let submit_output = run(&["job", "submit", "--jobs-root", &jobs_root_str, job_id, "--identity", "agent-alpha", "--safety-invariant", "no-destructive-writes"]);
    assert!(submit_output.status.success(), "stderr: {}", String::from_utf8_lossy(&submit_output.stderr));
    assert_eq!(json_stdout(&submit_output)["status"], "running");

    let checkpoint_output = run(&[
        "job",
        "checkpoint",
        "--jobs-root",
        &jobs_root_str,
        job_id,
        "--checkpoint-id",
        "cp-1",
        "--checkpoint-type",
        "progress",
        "--summary",
        "halfway through the migration",
        "--reason-code",
        "on_track",
    ]);
    assert!(checkpoint_output.status.success(), "stderr: {}", String::from_utf8_lossy(&checkpoint_output.stderr));

    let pause_output = run(&["job", "pause", "--jobs-root", &jobs_root_str, job_id]);
    assert!(pause_output.status.success());
    assert_eq!(json_stdout(&pause_output)["status"], "paused");

    let approve_output = run(&[
        "job",
        "approve",
        "--jobs-root",
        &jobs_root_str,
        job_id,
        "--identity",
        "agent-alpha",
        "--current-environment-fingerprint",
        "env-a",
        "--allow-env-mismatch",
        "--reason",
        "resuming on a fresh sandbox host",
    ]);
    assert!(approve_output.status.success(), "stderr: {}", String::from_utf8_lossy(&approve_output.stderr));
    assert_eq!(json_stdout(&approve_output)["status"], "running");

    let inspect_output = run(&["job", "inspect", "--jobs-root", &jobs_root_str, job_id]);
    assert!(inspect_output.status.success());
    let inspect_json = json_stdout(&inspect_output);
    assert!(inspect_json["events"].as_array().expect("events array").len() >= 4);

    let stop_output = run(&["job", "stop", "--jobs-root", &jobs_root_str, job_id, "--reason", "operator requested shutdown"]);
    assert!(stop_output.status.success());
    assert_eq!(json_stdout(&stop_output)["status"], "emergency_stopped");

    cleanup(&root);
}

#[test]
fn job_status_on_unknown_job_fails_with_nonzero_exit() {
    let root = temp_root("job-unknown");
    let jobs_root = root.join("jobs");
    fs::create_dir_all(&jobs_root).expect("create jobs root");
    let jobs_root_str = jobs_root.to_string_lossy().into_owned();

    let output = run(&["job", "status", "--jobs-root", &jobs_root_str, "does-not-exist"]);
    assert!(!output.status.success());

    cleanup(&root);
}
