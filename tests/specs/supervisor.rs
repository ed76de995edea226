// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a supervisor command takes precedence over walkaway.

use crate::prelude::*;
use brigade_core::Tier;
use std::time::Duration;

#[tokio::test]
async fn supervisor_retry_command_beats_walkaway() {
    let scenario = Scenario::new();
    scenario.write_prd(serde_json::json!([task("A", &[], "junior")]));

    // First call fails, later calls complete; every prompt is logged.
    let line = scenario.write_worker(
        "line.sh",
        r#"case "$*" in
  *"use stubs"*) echo "with_guidance" >> "$SELF_DIR/prompts.log" ;;
  *) echo "plain" >> "$SELF_DIR/prompts.log" ;;
esac
COUNT_FILE="$SELF_DIR/count"
COUNT=$(cat "$COUNT_FILE" 2>/dev/null || echo 0)
COUNT=$((COUNT + 1))
echo "$COUNT" > "$COUNT_FILE"
if [ "$COUNT" -le 1 ]; then
  echo "assertion failed: x" >&2
  exit 1
fi
echo "<promise>COMPLETE</promise>""#,
    );
    // Walkaway would abort; it must never be consulted.
    let executive =
        scenario.write_worker("executive.sh", r#"echo "<decision>ABORT</decision>""#);

    let workers = scenario.workers(
        &[(Tier::Line, line.as_path()), (Tier::Executive, executive.as_path())],
        Duration::from_secs(10),
    );
    let command_path = scenario.path().join("command.json");
    let mut config = scenario.config();
    config.walkaway_override = Some(true);
    config.escalation_after = 10;
    config.max_iterations = 1;
    config.command_file = Some(command_path.clone());
    config.command_poll = Duration::from_millis(20);
    config.command_wait = Some(Duration::from_secs(5));
    let orch = scenario.orchestrator(config, workers).await;

    // Supervisor side: watch events for the decision id, then answer.
    let events_path = scenario.path().join("events.jsonl");
    let answerer = tokio::spawn(async move {
        for _ in 0..200 {
            if let Ok(text) = std::fs::read_to_string(&events_path) {
                for line in text.lines() {
                    let v: serde_json::Value = serde_json::from_str(line).unwrap();
                    if v["type"] == "decision_needed" {
                        let id = v["data"]["decisionId"].as_str().unwrap();
                        std::fs::write(
                            &command_path,
                            format!(
                                r#"{{"decision":"{id}","action":"retry","guidance":"use stubs"}}"#
                            ),
                        )
                        .unwrap();
                        return;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("never saw decision_needed");
    });

    let summary = orch.run().await.unwrap();
    answerer.await.unwrap();
    assert_eq!(summary.done, 1);

    // The command was consumed and the guidance reached the next prompt.
    assert!(!scenario.path().join("command.json").exists());
    let prompts = std::fs::read_to_string(scenario.path().join("prompts.log")).unwrap();
    let lines: Vec<&str> = prompts.lines().collect();
    assert_eq!(lines, vec!["plain", "with_guidance"]);

    let received: Vec<serde_json::Value> = scenario
        .events()
        .into_iter()
        .filter(|v| v["type"] == "decision_received")
        .collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["data"]["source"], "supervisor");
    assert_eq!(received[0]["data"]["action"], "retry");
}
