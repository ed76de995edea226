// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer events: a closed sum serialized through a uniform envelope
//! `{type, timestamp, prd?, taskId?, worker?, data}`.
//!
//! The envelope keeps the JSONL stream and the module protocol stable
//! while event payloads stay type-safe in process.

use serde_json::{json, Value};

use crate::tier::Tier;

/// Every event type the core emits, in the order observers usually see
/// them. Modules declare subscriptions against this vocabulary.
pub const EVENT_TYPES: &[&str] = &[
    "service_start",
    "task_start",
    "task_complete",
    "task_blocked",
    "escalation",
    "review",
    "verification",
    "attention",
    "decision_needed",
    "decision_received",
    "scope_decision",
    "service_complete",
];

/// A state transition reported to observer channels and modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ServiceStart {
        prd: String,
        total: usize,
    },
    TaskStart {
        prd: String,
        task_id: String,
        worker: Tier,
        attempt: usize,
    },
    TaskComplete {
        prd: String,
        task_id: String,
        worker: Tier,
        duration_seconds: u64,
        /// Backlog items the worker filed while completing the task.
        backlog: Vec<String>,
    },
    TaskBlocked {
        prd: String,
        task_id: String,
        worker: Tier,
        reason: String,
    },
    Escalation {
        prd: String,
        task_id: String,
        from: Tier,
        to: Tier,
        reason: String,
    },
    Review {
        prd: String,
        task_id: String,
        passed: bool,
        reason: String,
    },
    Verification {
        prd: String,
        task_id: String,
        passed: bool,
        commands: usize,
    },
    Attention {
        prd: String,
        task_id: Option<String>,
        reason: String,
    },
    DecisionNeeded {
        prd: String,
        task_id: String,
        decision_id: String,
        reason: String,
        attempts: usize,
    },
    DecisionReceived {
        prd: String,
        task_id: String,
        decision_id: String,
        action: String,
        source: String,
    },
    ScopeDecision {
        prd: String,
        task_id: String,
        question: String,
        decision: String,
    },
    ServiceComplete {
        prd: String,
        done: usize,
        total: usize,
    },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStart { .. } => "service_start",
            Self::TaskStart { .. } => "task_start",
            Self::TaskComplete { .. } => "task_complete",
            Self::TaskBlocked { .. } => "task_blocked",
            Self::Escalation { .. } => "escalation",
            Self::Review { .. } => "review",
            Self::Verification { .. } => "verification",
            Self::Attention { .. } => "attention",
            Self::DecisionNeeded { .. } => "decision_needed",
            Self::DecisionReceived { .. } => "decision_received",
            Self::ScopeDecision { .. } => "scope_decision",
            Self::ServiceComplete { .. } => "service_complete",
        }
    }

    pub fn prd(&self) -> &str {
        match self {
            Self::ServiceStart { prd, .. }
            | Self::TaskStart { prd, .. }
            | Self::TaskComplete { prd, .. }
            | Self::TaskBlocked { prd, .. }
            | Self::Escalation { prd, .. }
            | Self::Review { prd, .. }
            | Self::Verification { prd, .. }
            | Self::Attention { prd, .. }
            | Self::DecisionNeeded { prd, .. }
            | Self::DecisionReceived { prd, .. }
            | Self::ScopeDecision { prd, .. }
            | Self::ServiceComplete { prd, .. } => prd,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::ServiceStart { .. } | Self::ServiceComplete { .. } => None,
            Self::Attention { task_id, .. } => task_id.as_deref(),
            Self::TaskStart { task_id, .. }
            | Self::TaskComplete { task_id, .. }
            | Self::TaskBlocked { task_id, .. }
            | Self::Escalation { task_id, .. }
            | Self::Review { task_id, .. }
            | Self::Verification { task_id, .. }
            | Self::DecisionNeeded { task_id, .. }
            | Self::DecisionReceived { task_id, .. }
            | Self::ScopeDecision { task_id, .. } => Some(task_id),
        }
    }

    pub fn worker(&self) -> Option<Tier> {
        match self {
            Self::TaskStart { worker, .. }
            | Self::TaskComplete { worker, .. }
            | Self::TaskBlocked { worker, .. } => Some(*worker),
            Self::Escalation { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Event-specific payload for the envelope's `data` field.
    pub fn data(&self) -> Value {
        match self {
            Self::ServiceStart { total, .. } => json!({ "total": total }),
            Self::TaskStart { attempt, .. } => json!({ "attempt": attempt }),
            Self::TaskComplete { duration_seconds, backlog, .. } => {
                json!({ "durationSeconds": duration_seconds, "backlog": backlog })
            }
            Self::TaskBlocked { reason, .. } => json!({ "reason": reason }),
            Self::Escalation { from, to, reason, .. } => {
                json!({ "from": from, "to": to, "reason": reason })
            }
            Self::Review { passed, reason, .. } => {
                json!({ "result": if *passed { "pass" } else { "fail" }, "reason": reason })
            }
            Self::Verification { passed, commands, .. } => {
                json!({ "passed": passed, "commands": commands })
            }
            Self::Attention { reason, .. } => json!({ "reason": reason }),
            Self::DecisionNeeded { decision_id, reason, attempts, .. } => {
                json!({ "decisionId": decision_id, "reason": reason, "attempts": attempts })
            }
            Self::DecisionReceived { decision_id, action, source, .. } => {
                json!({ "decisionId": decision_id, "action": action, "source": source })
            }
            Self::ScopeDecision { question, decision, .. } => {
                json!({ "question": question, "decision": decision })
            }
            Self::ServiceComplete { done, total, .. } => {
                json!({ "done": done, "total": total })
            }
        }
    }

    /// The full wire envelope with the given RFC 3339 timestamp.
    pub fn envelope(&self, timestamp: &str) -> Value {
        let mut envelope = json!({
            "type": self.event_type(),
            "timestamp": timestamp,
            "prd": self.prd(),
            "data": self.data(),
        });
        if let Some(map) = envelope.as_object_mut() {
            if let Some(task_id) = self.task_id() {
                map.insert("taskId".to_string(), json!(task_id));
            }
            if let Some(worker) = self.worker() {
                map.insert("worker".to_string(), json!(worker));
            }
        }
        envelope
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
