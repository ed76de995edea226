// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn heartbeats_name_the_current_task() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.log");
    let log = ActivityLog::new(path.clone(), "add-auth".to_string(), Duration::from_millis(30));
    log.set_current("US-003", Tier::Sous);
    log.start();
    tokio::time::sleep(Duration::from_millis(120)).await;
    log.stop();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("add-auth/US-003: sous working ("), "got: {text}");
    // Timestamped like [12:34:56]
    assert!(text.starts_with('['));
}

#[tokio::test]
async fn idle_heartbeat_without_a_task() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.log");
    let log = ActivityLog::new(path.clone(), "add-auth".to_string(), Duration::from_millis(30));
    log.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    log.stop();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("IDLE add-auth"));
}

#[tokio::test]
async fn transitions_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.log");
    let log = ActivityLog::new(path.clone(), "add-auth".to_string(), Duration::from_secs(3600));
    log.record("SERVICE_START");
    log.record("ESCALATION");
    log.record("SERVICE_END");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("SERVICE_START add-auth"));
    assert!(text.contains("ESCALATION add-auth"));
    assert!(text.contains("SERVICE_END add-auth"));
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let log = ActivityLog::new(
        dir.path().join("activity.log"),
        "p".to_string(),
        Duration::from_secs(3600),
    );
    log.start();
    log.start();
    log.stop();
    log.stop();
}
