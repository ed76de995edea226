// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: independent line tasks run as one concurrent batch, and a
//! polling reader never observes a torn state file.

use crate::prelude::*;
use brigade_core::Tier;
use std::time::Duration;

#[tokio::test]
async fn concurrent_batch_isolation() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([
        task("A", &[], "junior"),
        task("B", &[], "junior"),
        task("C", &[], "junior"),
    ]));
    // Record an overlap window: started markers pile up before the first
    // worker finishes its sleep.
    let worker = scenario.write_worker(
        "worker.sh",
        r#"echo started >> "$SELF_DIR/starts.log"
sleep 1
echo "<promise>COMPLETE</promise>""#,
    );

    let workers =
        scenario.workers(&[(Tier::Line, worker.as_path())], Duration::from_secs(30));
    let mut config = scenario.config();
    config.max_parallel = 3;
    let orch = scenario.orchestrator(config, workers).await;

    // Poll the state file while the batch runs; every observed version
    // must parse as a complete document.
    let state_path = brigade_storage::state_path_for(&scenario.prd_path());
    let poller = tokio::spawn(async move {
        let mut observed = 0usize;
        for _ in 0..100 {
            if let Ok(text) = std::fs::read_to_string(&state_path) {
                let parsed: Result<brigade_core::SessionState, _> =
                    serde_json::from_str(&text);
                assert!(parsed.is_ok(), "torn state file observed");
                observed += 1;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        observed
    });

    let summary = orch.run().await.unwrap();
    assert_eq!((summary.done, summary.total), (3, 3));
    let observed = poller.await.unwrap();
    assert!(observed > 0, "the poller never saw the state file");

    // All three workers started before any could have finished.
    let starts = std::fs::read_to_string(scenario.path().join("starts.log")).unwrap();
    assert_eq!(starts.lines().count(), 3);

    let types = scenario.event_types();
    assert_eq!(types.iter().filter(|t| *t == "task_start").count(), 3);
    assert_eq!(types.iter().filter(|t| *t == "task_complete").count(), 3);

    let state = scenario.state();
    assert_eq!(state.completed_ids().len(), 3);
}
