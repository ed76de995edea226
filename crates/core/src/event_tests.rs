// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn vocabulary_matches_event_type_strings() {
    let events = vec![
        Event::ServiceStart { prd: "p".into(), total: 3 },
        Event::TaskStart {
            prd: "p".into(),
            task_id: "A".into(),
            worker: Tier::Line,
            attempt: 1,
        },
        Event::TaskComplete {
            prd: "p".into(),
            task_id: "A".into(),
            worker: Tier::Line,
            duration_seconds: 10,
            backlog: Vec::new(),
        },
        Event::TaskBlocked {
            prd: "p".into(),
            task_id: "A".into(),
            worker: Tier::Line,
            reason: "r".into(),
        },
        Event::Escalation {
            prd: "p".into(),
            task_id: "A".into(),
            from: Tier::Line,
            to: Tier::Sous,
            reason: "r".into(),
        },
        Event::Review { prd: "p".into(), task_id: "A".into(), passed: true, reason: "".into() },
        Event::Verification { prd: "p".into(), task_id: "A".into(), passed: true, commands: 2 },
        Event::Attention { prd: "p".into(), task_id: None, reason: "r".into() },
        Event::DecisionNeeded {
            prd: "p".into(),
            task_id: "A".into(),
            decision_id: "d".into(),
            reason: "r".into(),
            attempts: 5,
        },
        Event::DecisionReceived {
            prd: "p".into(),
            task_id: "A".into(),
            decision_id: "d".into(),
            action: "retry".into(),
            source: "supervisor".into(),
        },
        Event::ScopeDecision {
            prd: "p".into(),
            task_id: "A".into(),
            question: "q".into(),
            decision: "d".into(),
        },
        Event::ServiceComplete { prd: "p".into(), done: 3, total: 3 },
    ];
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, EVENT_TYPES);
}

#[test]
fn envelope_has_uniform_shape() {
    let event = Event::TaskStart {
        prd: "add-auth".into(),
        task_id: "US-001".into(),
        worker: Tier::Sous,
        attempt: 2,
    };
    let envelope = event.envelope("2026-08-01T10:00:00+00:00");
    assert_eq!(envelope["type"], "task_start");
    assert_eq!(envelope["timestamp"], "2026-08-01T10:00:00+00:00");
    assert_eq!(envelope["prd"], "add-auth");
    assert_eq!(envelope["taskId"], "US-001");
    assert_eq!(envelope["worker"], "sous");
    assert_eq!(envelope["data"]["attempt"], 2);
}

#[test]
fn service_events_omit_task_and_worker() {
    let envelope =
        Event::ServiceStart { prd: "p".into(), total: 5 }.envelope("2026-08-01T10:00:00+00:00");
    assert!(envelope.get("taskId").is_none());
    assert!(envelope.get("worker").is_none());
    assert_eq!(envelope["data"]["total"], 5);
}

#[test]
fn task_complete_data_carries_backlog() {
    let envelope = Event::TaskComplete {
        prd: "p".into(),
        task_id: "A".into(),
        worker: Tier::Line,
        duration_seconds: 10,
        backlog: vec!["extract a shared fixture".to_string()],
    }
    .envelope("2026-08-01T10:00:00+00:00");
    assert_eq!(envelope["data"]["durationSeconds"], 10);
    assert_eq!(envelope["data"]["backlog"][0], "extract a shared fixture");
}

#[test]
fn escalation_data_carries_tiers() {
    let envelope = Event::Escalation {
        prd: "p".into(),
        task_id: "A".into(),
        from: Tier::Line,
        to: Tier::Sous,
        reason: "worker timeout".into(),
    }
    .envelope("2026-08-01T10:00:00+00:00");
    assert_eq!(envelope["data"]["from"], "line");
    assert_eq!(envelope["data"]["to"], "sous");
    assert_eq!(envelope["worker"], "sous");
}

#[test]
fn review_data_maps_passed_to_result() {
    let envelope = Event::Review {
        prd: "p".into(),
        task_id: "A".into(),
        passed: false,
        reason: "criteria 2 unmet".into(),
    }
    .envelope("2026-08-01T10:00:00+00:00");
    assert_eq!(envelope["data"]["result"], "fail");
    assert_eq!(envelope["data"]["reason"], "criteria 2 unmet");
}
