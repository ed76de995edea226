// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-level checks through the real binary.

use crate::prelude::*;
use assert_cmd::Command;
use std::os::unix::fs::PermissionsExt;

fn write_script(scenario: &Scenario, name: &str, body: &str) -> std::path::PathBuf {
    let path = scenario.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn validate_accepts_a_well_formed_prd() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("A", &[], "junior")]));
    let output = Command::cargo_bin("brigade")
        .unwrap()
        .arg("validate")
        .arg(scenario.prd_path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok: 1 tasks"));
}

#[test]
fn validate_rejects_a_cyclic_prd() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([
        task("A", &["B"], "junior"),
        task("B", &["A"], "junior"),
    ]));
    let output = Command::cargo_bin("brigade")
        .unwrap()
        .arg("validate")
        .arg(scenario.prd_path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("dependency cycle"));
}

#[test]
fn run_executes_a_linear_prd_via_env_config() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([
        task("A", &[], "junior"),
        task("B", &["A"], "junior"),
    ]));
    let worker = write_script(&scenario, "worker.sh", r#"echo "<promise>COMPLETE</promise>""#);

    let output = Command::cargo_bin("brigade")
        .unwrap()
        .arg("run")
        .arg(scenario.prd_path())
        .env("LINE_COMMAND", worker.display().to_string())
        .env("QUIET", "1")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("done: 2/2 tasks"));

    // The state file landed next to the PRD.
    assert!(brigade_storage::state_path_for(&scenario.prd_path()).exists());
}

#[test]
fn single_task_mode_mirrors_worker_exit_codes() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("A", &[], "junior")]));
    let worker = write_script(&scenario, "worker.sh", "exit 33");

    let output = Command::cargo_bin("brigade")
        .unwrap()
        .args(["run", "--task", "A"])
        .arg(scenario.prd_path())
        .env("LINE_COMMAND", worker.display().to_string())
        .env("QUIET", "1")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(33));
}

#[test]
fn status_prints_progress() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("A", &[], "junior")]));
    let output = Command::cargo_bin("brigade")
        .unwrap()
        .arg("status")
        .arg(scenario.prd_path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("progress: 0/1"));
}

#[test]
fn run_without_worker_commands_fails_helpfully() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("A", &[], "junior")]));
    let output = Command::cargo_bin("brigade")
        .unwrap()
        .arg("run")
        .arg(scenario.prd_path())
        .env_remove("LINE_COMMAND")
        .env_remove("SOUS_COMMAND")
        .env_remove("EXECUTIVE_COMMAND")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("LINE_COMMAND"));
}
