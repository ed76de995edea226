// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: walkaway SKIP after timeouts exhaust the tiers.

use crate::prelude::*;
use brigade_core::state::TaskStatus;
use brigade_core::Tier;
use std::time::Duration;

#[tokio::test]
async fn timeouts_escalate_then_walkaway_skips() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([
        task("B", &[], "junior"),
        task("C", &["B"], "junior"),
    ]));
    // Task B hangs; task C completes. One script serves both tiers.
    let hang = scenario.write_worker(
        "hang.sh",
        r#"case "$*" in
  *"Task C"*) echo "<promise>COMPLETE</promise>" ;;
  *) sleep 30 ;;
esac"#,
    );
    let executive =
        scenario.write_worker("executive.sh", r#"echo "<decision>SKIP</decision>""#);

    let workers = scenario.workers(
        &[
            (Tier::Line, hang.as_path()),
            (Tier::Sous, hang.as_path()),
            (Tier::Executive, executive.as_path()),
        ],
        Duration::from_millis(300),
    );
    let mut config = scenario.config();
    config.walkaway_override = Some(true);
    config.escalation_after = 3;
    config.max_iterations = 3;
    config.walkaway_max_skips = 3;
    let orch = scenario.orchestrator(config, workers).await;
    let summary = orch.run().await.unwrap();
    assert_eq!((summary.done, summary.total), (1, 2));

    let state = scenario.state();
    // Three line timeouts, then the escalation, then one sous timeout.
    let b_timeouts: Vec<_> = state
        .task_history
        .iter()
        .filter(|h| h.task_id == "B" && h.error.as_deref() == Some("worker timeout"))
        .collect();
    assert_eq!(b_timeouts.len(), 4);
    assert_eq!(b_timeouts.iter().filter(|h| h.worker == Tier::Line).count(), 3);
    assert_eq!(b_timeouts.iter().filter(|h| h.worker == Tier::Sous).count(), 1);

    assert_eq!(state.escalations.len(), 1);
    assert_eq!(state.escalations[0].reason, "worker timeout");
    assert_eq!(state.escalations[0].to, Tier::Sous);

    // B is skipped, not passed; C still ran because skips satisfy
    // dependents' readiness.
    assert!(state
        .task_history
        .iter()
        .any(|h| h.task_id == "B" && h.status == TaskStatus::Skipped));
    assert!(!state.is_done("B"));
    assert!(state.is_done("C"));

    let types = scenario.event_types();
    assert!(types.iter().any(|t| t == "decision_needed"));
    assert!(types.iter().any(|t| t == "decision_received"));
}
