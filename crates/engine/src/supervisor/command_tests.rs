// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn reader(dir: &tempfile::TempDir) -> CommandReader {
    CommandReader::new(dir.path().join("command.json"), Duration::from_millis(20))
}

fn write_command(dir: &tempfile::TempDir, decision: &str, action: &str) {
    std::fs::write(
        dir.path().join("command.json"),
        format!(r#"{{"decision":"{decision}","action":"{action}","guidance":"use stubs"}}"#),
    )
    .unwrap();
}

#[test]
fn take_consumes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write_command(&dir, "dcn-1", "retry");
    let reader = reader(&dir);
    let command = reader.take().unwrap();
    assert_eq!(command.decision, "dcn-1");
    assert_eq!(command.action, CommandAction::Retry);
    assert_eq!(command.guidance.as_deref(), Some("use stubs"));
    assert!(!dir.path().join("command.json").exists());
    assert!(reader.take().is_none());
}

#[test]
fn malformed_command_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("command.json"), "{nope").unwrap();
    let reader = reader(&dir);
    assert!(reader.take().is_none());
    assert!(!dir.path().join("command.json").exists());
}

#[tokio::test]
async fn wait_for_matches_the_decision_id() {
    let dir = tempfile::tempdir().unwrap();
    write_command(&dir, "dcn-42", "skip");
    let reader = reader(&dir);
    let command = reader
        .wait_for("dcn-42", Some(Duration::from_secs(2)), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(command.action, CommandAction::Skip);
}

#[tokio::test]
async fn mismatched_command_is_written_back() {
    let dir = tempfile::tempdir().unwrap();
    write_command(&dir, "dcn-other", "abort");
    let reader = reader(&dir);
    let result = reader
        .wait_for("dcn-mine", Some(Duration::from_millis(150)), &CancellationToken::new())
        .await;
    assert!(result.is_none());
    // The foreign command survived the wait.
    let text = std::fs::read_to_string(dir.path().join("command.json")).unwrap();
    assert!(text.contains("dcn-other"));
}

#[tokio::test]
async fn wait_times_out_without_a_command() {
    let dir = tempfile::tempdir().unwrap();
    let reader = reader(&dir);
    let started = std::time::Instant::now();
    let result = reader
        .wait_for("dcn-1", Some(Duration::from_millis(100)), &CancellationToken::new())
        .await;
    assert!(result.is_none());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn wait_observes_a_late_command() {
    let dir = tempfile::tempdir().unwrap();
    let reader = reader(&dir);
    let path = dir.path().join("command.json");
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&path, r#"{"decision":"dcn-late","action":"retry"}"#).unwrap();
    });
    let command = reader
        .wait_for("dcn-late", Some(Duration::from_secs(2)), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(command.action, CommandAction::Retry);
}

#[tokio::test]
async fn cancellation_ends_the_wait() {
    let dir = tempfile::tempdir().unwrap();
    let reader = reader(&dir);
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };
    let result = reader.wait_for("dcn-1", None, &cancel).await;
    assert!(result.is_none());
    handle.await.unwrap();
}
