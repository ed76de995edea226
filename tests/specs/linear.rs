// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: linear PRD, all green.

use crate::prelude::*;
use brigade_core::state::TaskStatus;
use brigade_core::Tier;
use std::time::Duration;

#[tokio::test]
async fn linear_prd_all_green() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([
        task("A", &[], "junior"),
        task("B", &["A"], "junior"),
        task("C", &["B"], "junior"),
    ]));
    let worker = scenario.write_worker(
        "worker.sh",
        r#"echo "<backlog>tidy the fixtures</backlog>"
echo "<promise>COMPLETE</promise>""#,
    );

    let workers =
        scenario.workers(&[(Tier::Line, worker.as_path())], Duration::from_secs(10));
    let orch = scenario.orchestrator(scenario.config(), workers).await;
    let summary = orch.run().await.unwrap();
    assert_eq!((summary.done, summary.total), (3, 3));

    assert_eq!(
        scenario.event_types(),
        vec![
            "service_start",
            "task_start",
            "task_complete",
            "task_start",
            "task_complete",
            "task_start",
            "task_complete",
            "service_complete",
        ]
    );

    // task_start A precedes task_complete A precedes task_start B, so
    // dependencies were done before dependents started.
    let events = scenario.events();
    let ordered: Vec<(String, String)> = events
        .iter()
        .filter(|v| v["type"] == "task_start" || v["type"] == "task_complete")
        .map(|v| {
            (v["type"].as_str().unwrap().to_string(), v["taskId"].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(
        ordered,
        vec![
            ("task_start".to_string(), "A".to_string()),
            ("task_complete".to_string(), "A".to_string()),
            ("task_start".to_string(), "B".to_string()),
            ("task_complete".to_string(), "B".to_string()),
            ("task_start".to_string(), "C".to_string()),
            ("task_complete".to_string(), "C".to_string()),
        ]
    );

    let final_event = events.last().unwrap();
    assert_eq!(final_event["data"]["done"], 3);
    assert_eq!(final_event["data"]["total"], 3);

    // Backlog items filed by the worker ride the completion events.
    for complete in events.iter().filter(|v| v["type"] == "task_complete") {
        assert_eq!(complete["data"]["backlog"][0], "tidy the fixtures");
    }

    let state = scenario.state();
    assert_eq!(state.task_history.len(), 3);
    assert!(state.task_history.iter().all(|h| h.status == TaskStatus::Complete));
    assert!(state.escalations.is_empty());
}
