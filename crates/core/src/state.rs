// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable session state document, persisted next to its PRD.
//!
//! One state file per PRD. Mutated only by the process holding the service
//! lock; observers read the derived status/events files instead. Optional
//! arrays carry `#[serde(default)]` so documents written by older versions
//! load cleanly and are filled in on the next save.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::classify::Category;
use crate::tier::Tier;

/// Task execution status as recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
    Blocked,
    Failed,
    Skipped,
    Absorbed,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Complete => "complete",
        Blocked => "blocked",
        Failed => "failed",
        Skipped => "skipped",
        Absorbed => "absorbed",
    }
}

/// One attempt outcome for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistoryEntry {
    pub task_id: String,
    pub worker: Tier,
    pub status: TaskStatus,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// A recorded move to a strictly higher tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    pub task_id: String,
    pub from: Tier,
    pub to: Tier,
    pub reason: String,
    pub timestamp: String,
}

/// Executive review verdict for one task attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub task_id: String,
    pub result: ReviewResult,
    pub reason: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewResult {
    Pass,
    Fail,
}

/// A task found to have been completed by another task's work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absorption {
    pub task_id: String,
    pub absorbed_by: String,
    pub timestamp: String,
}

/// Review of a whole phase of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReview {
    pub phase: String,
    pub result: ReviewResult,
    pub reason: String,
    pub timestamp: String,
}

/// One entry in the bounded cross-task failure tail, fed back into
/// prompts so retries avoid strategies that just failed elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFailure {
    pub task_id: String,
    pub category: Category,
    pub error: String,
    pub timestamp: String,
}

/// The state document for one PRD execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub started_at: String,
    pub last_start_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default)]
    pub task_history: Vec<TaskHistoryEntry>,
    #[serde(default)]
    pub escalations: Vec<Escalation>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub absorptions: Vec<Absorption>,
    #[serde(default)]
    pub phase_reviews: Vec<PhaseReview>,
    #[serde(default)]
    pub session_failures: Vec<SessionFailure>,
    #[serde(default)]
    pub consecutive_skips: u32,
}

impl SessionState {
    /// Create a fresh state for a new session.
    ///
    /// The session id is timestamp + pid, for human debugging only.
    pub fn new(now: chrono::DateTime<chrono::Utc>) -> Self {
        let stamp = now.format("%Y%m%d-%H%M%S");
        let rfc = now.to_rfc3339();
        Self {
            session_id: format!("{}-{}", stamp, std::process::id()),
            started_at: rfc.clone(),
            last_start_at: rfc,
            current_task: None,
            task_history: Vec::new(),
            escalations: Vec::new(),
            reviews: Vec::new(),
            absorptions: Vec::new(),
            phase_reviews: Vec::new(),
            session_failures: Vec::new(),
            consecutive_skips: 0,
        }
    }

    /// Task ids done for good: history `complete` or an absorption entry.
    pub fn completed_ids(&self) -> HashSet<String> {
        let mut done: HashSet<String> = self
            .task_history
            .iter()
            .filter(|h| h.status == TaskStatus::Complete)
            .map(|h| h.task_id.clone())
            .collect();
        done.extend(self.absorptions.iter().map(|a| a.task_id.clone()));
        done
    }

    /// Task ids excluded from selection after a walkaway SKIP.
    ///
    /// Skipped is not success: these satisfy dependents' readiness but are
    /// never counted as passing.
    pub fn skipped_ids(&self) -> HashSet<String> {
        self.task_history
            .iter()
            .filter(|h| h.status == TaskStatus::Skipped)
            .map(|h| h.task_id.clone())
            .collect()
    }

    pub fn is_done(&self, task_id: &str) -> bool {
        self.completed_ids().contains(task_id)
    }

    /// Total attempts recorded for a task (skips and absorptions are not
    /// attempts).
    pub fn attempts(&self, task_id: &str) -> usize {
        self.task_history
            .iter()
            .filter(|h| h.task_id == task_id)
            .filter(|h| !matches!(h.status, TaskStatus::Skipped | TaskStatus::Absorbed))
            .count()
    }

    /// Attempts for a task at a specific tier.
    pub fn attempts_at(&self, task_id: &str, tier: Tier) -> usize {
        self.task_history
            .iter()
            .filter(|h| h.task_id == task_id && h.worker == tier)
            .filter(|h| !matches!(h.status, TaskStatus::Skipped | TaskStatus::Absorbed))
            .count()
    }

    /// The highest tier this task has been escalated to, if any.
    pub fn escalated_tier(&self, task_id: &str) -> Option<Tier> {
        self.escalations
            .iter()
            .filter(|e| e.task_id == task_id)
            .map(|e| e.to)
            .max()
    }

    /// Recent approaches declared for a task, oldest first, bounded.
    pub fn approaches_for(&self, task_id: &str, limit: usize) -> Vec<&str> {
        let all: Vec<&str> = self
            .task_history
            .iter()
            .filter(|h| h.task_id == task_id)
            .filter_map(|h| h.approach.as_deref())
            .collect();
        let skip = all.len().saturating_sub(limit);
        all.into_iter().skip(skip).collect()
    }

    /// Approaches tried at tiers below `tier`, for escalation context.
    pub fn approaches_below(&self, task_id: &str, tier: Tier, limit: usize) -> Vec<&str> {
        let all: Vec<&str> = self
            .task_history
            .iter()
            .filter(|h| h.task_id == task_id && h.worker < tier)
            .filter_map(|h| h.approach.as_deref())
            .collect();
        let skip = all.len().saturating_sub(limit);
        all.into_iter().skip(skip).collect()
    }

    /// Append a history entry. Completion resets the consecutive-skip
    /// counter; a skip increments it.
    pub fn record_history(&mut self, entry: TaskHistoryEntry) {
        match entry.status {
            TaskStatus::Complete => self.consecutive_skips = 0,
            TaskStatus::Skipped => self.consecutive_skips += 1,
            _ => {}
        }
        self.task_history.push(entry);
    }

    pub fn record_escalation(&mut self, escalation: Escalation) {
        self.escalations.push(escalation);
    }

    pub fn record_review(&mut self, review: Review) {
        self.reviews.push(review);
    }

    pub fn record_absorption(&mut self, absorption: Absorption) {
        self.absorptions.push(absorption);
    }

    /// Most recent failed review for a task, used as review feedback on
    /// the next attempt.
    pub fn last_failed_review(&self, task_id: &str) -> Option<&Review> {
        self.reviews
            .iter()
            .rev()
            .find(|r| r.task_id == task_id && r.result == ReviewResult::Fail)
    }

    /// Append a session failure, evicting the oldest past `max`.
    pub fn push_session_failure(&mut self, failure: SessionFailure, max: usize) {
        self.session_failures.push(failure);
        while self.session_failures.len() > max {
            self.session_failures.remove(0);
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
