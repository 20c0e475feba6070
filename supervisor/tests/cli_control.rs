//! CLI tests for the supervisor binary.
//!
//! Spawns the binary and verifies exit codes match expected values for
//! success, state conflicts, unknown runs, and invalid payloads.

use std::process::{Command, Stdio};

use supervisor::exit_codes;
use supervisor::test_support::{DEFAULT_TEST_POLICY, write_policy};

fn supervisor_cmd(root: &std::path::Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_supervisor"));
    cmd.arg("--root").arg(root).args(args);
    cmd
}

#[test]
fn lifecycle_commands_report_stable_exit_codes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    write_policy(root, DEFAULT_TEST_POLICY).expect("policy");

    let status = supervisor_cmd(root, &["create", "run-1"])
        .status()
        .expect("create");
    assert_eq!(status.code(), Some(exit_codes::OK));

    let status = supervisor_cmd(root, &["start", "run-1"])
        .status()
        .expect("start");
    assert_eq!(status.code(), Some(exit_codes::OK));

    // Starting again conflicts with the active loop.
    let status = supervisor_cmd(root, &["start", "run-1"])
        .status()
        .expect("double start");
    assert_eq!(status.code(), Some(exit_codes::CONFLICT));

    let status = supervisor_cmd(root, &["show", "run-9"])
        .status()
        .expect("show unknown");
    assert_eq!(status.code(), Some(exit_codes::NOT_FOUND));

    let status = supervisor_cmd(root, &["stop", "run-1", "--reason", "done testing"])
        .status()
        .expect("stop");
    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn record_accepts_report_file_and_rejects_garbage() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    write_policy(root, DEFAULT_TEST_POLICY).expect("policy");

    supervisor_cmd(root, &["create", "run-1"])
        .status()
        .expect("create");
    supervisor_cmd(root, &["start", "run-1"])
        .status()
        .expect("start");

    let report_path = root.join("report.json");
    std::fs::write(
        &report_path,
        r#"{
            "iteration": 1,
            "commandResults": [{ "cmd": "cargo test", "exitCode": 0 }],
            "passed": true,
            "completionTokenFound": true
        }"#,
    )
    .expect("write report");

    let output = supervisor_cmd(
        root,
        &["record", "run-1", "--report", report_path.to_str().expect("utf8")],
    )
    .stdout(Stdio::piped())
    .output()
    .expect("record");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json response");
    assert_eq!(body["nextAction"], "complete");
    assert_eq!(body["runStatus"], "COMPLETED");

    let garbage_path = root.join("garbage.json");
    std::fs::write(&garbage_path, "not json").expect("write garbage");
    let status = supervisor_cmd(
        root,
        &["record", "run-1", "--report", garbage_path.to_str().expect("utf8")],
    )
    .status()
    .expect("record garbage");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}
