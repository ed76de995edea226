// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a worker discovers its task was absorbed by another.

use crate::prelude::*;
use brigade_core::state::TaskStatus;
use brigade_core::Tier;
use std::time::Duration;

#[tokio::test]
async fn absorbed_by_marks_passes_without_completion() {
    let scenario = Scenario::new();
    let mut c = task("C", &[], "junior");
    c["verification"] = serde_json::json!(["exit 1"]); // would fail if run
    scenario.write_prd(serde_json::json!([c]));
    let worker = scenario
        .write_worker("worker.sh", r#"echo "<promise>ABSORBED_BY:A</promise>""#);

    let workers =
        scenario.workers(&[(Tier::Line, worker.as_path())], Duration::from_secs(10));
    let orch = scenario.orchestrator(scenario.config(), workers).await;
    let summary = orch.run().await.unwrap();
    assert_eq!(summary.done, 1);

    let state = scenario.state();
    assert_eq!(state.absorptions.len(), 1);
    assert_eq!(state.absorptions[0].task_id, "C");
    assert_eq!(state.absorptions[0].absorbed_by, "A");
    assert!(!state
        .task_history
        .iter()
        .any(|h| h.task_id == "C" && h.status == TaskStatus::Complete));

    // No verification ran for the absorbed task.
    assert!(!scenario.event_types().iter().any(|t| t == "verification"));
}

#[tokio::test]
async fn exit_code_34_needs_the_tag_for_the_absorber() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("C", &[], "junior")]));
    // Exit 34 with the tag: absorbed. The orchestrator must read the id
    // from the tag, not invent one.
    let worker = scenario.write_worker(
        "worker.sh",
        r#"echo "<promise>ABSORBED_BY:US-001</promise>"
exit 34"#,
    );
    let workers =
        scenario.workers(&[(Tier::Line, worker.as_path())], Duration::from_secs(10));
    let orch = scenario.orchestrator(scenario.config(), workers).await;
    orch.run().await.unwrap();
    assert_eq!(scenario.state().absorptions[0].absorbed_by, "US-001");
}
