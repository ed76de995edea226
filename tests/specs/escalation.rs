// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: repeated failures at line escalate to sous.

use crate::prelude::*;
use brigade_core::state::TaskStatus;
use brigade_core::{Category, Tier};
use std::time::Duration;

#[tokio::test]
async fn two_line_failures_then_sous_succeeds() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("A", &[], "junior")]));
    let line = scenario.write_worker(
        "line.sh",
        r#"echo "SyntaxError: x" >&2
exit 1"#,
    );
    let sous = scenario.write_worker("sous.sh", r#"echo "<promise>COMPLETE</promise>""#);

    let workers = scenario.workers(
        &[(Tier::Line, line.as_path()), (Tier::Sous, sous.as_path())],
        Duration::from_secs(10),
    );
    let mut config = scenario.config();
    config.escalation_after = 2;
    let orch = scenario.orchestrator(config, workers).await;
    let summary = orch.run().await.unwrap();
    assert_eq!(summary.done, 1);

    let state = scenario.state();
    let line_failures: Vec<_> = state
        .task_history
        .iter()
        .filter(|h| h.worker == Tier::Line && h.status == TaskStatus::Failed)
        .collect();
    assert_eq!(line_failures.len(), 2);
    assert!(line_failures.iter().all(|h| h.category == Some(Category::Syntax)));
    assert!(line_failures
        .iter()
        .all(|h| h.error.as_deref() == Some("SyntaxError: x")));

    assert_eq!(state.escalations.len(), 1);
    assert_eq!(state.escalations[0].from, Tier::Line);
    assert_eq!(state.escalations[0].to, Tier::Sous);

    let last = state.task_history.last().unwrap();
    assert_eq!(last.worker, Tier::Sous);
    assert_eq!(last.status, TaskStatus::Complete);

    // Escalations are strictly monotone and timestamped.
    let types = scenario.event_types();
    assert_eq!(types.iter().filter(|t| *t == "escalation").count(), 1);
    assert_eq!(types.iter().filter(|t| *t == "task_start").count(), 3);
}
