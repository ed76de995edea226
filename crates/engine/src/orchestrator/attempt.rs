// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task execution: the attempt loop and outcome routing.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use brigade_adapters::{ExecContext, WorkerResult};
use brigade_core::classify::extract_error_message;
use brigade_core::prd::Task;
use brigade_core::signal::{Promise, ReviewVerdict};
use brigade_core::state::{
    Absorption, Review, ReviewResult, TaskHistoryEntry, TaskStatus,
};
use brigade_core::{Event, Tier};

use super::decision::{select_tier, Directive};
use super::{Orchestrator, TaskOutcome};
use crate::error::EngineError;
use crate::prompt::TaskPromptInputs;

/// Cap on stored error messages.
const ERROR_MESSAGE_MAX: usize = 200;

impl Orchestrator {
    /// Drive one task to a terminal outcome.
    pub(crate) async fn execute_task(
        self: &Arc<Self>,
        task_id: String,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome, EngineError> {
        let mut review_feedback: Option<String> = None;
        let mut guidance: Option<String> = None;
        let mut last_was_blocked = false;

        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let Some(task) = self.prd.lock().task(&task_id).cloned() else {
                return Err(EngineError::UnknownTask(task_id));
            };
            let tier = select_tier(&self.state.lock(), &task);
            let worker = self
                .workers
                .get(&tier)
                .cloned()
                .ok_or_else(|| {
                    brigade_adapters::WorkerError::EmptyCommand(tier.to_string())
                })?;

            let attempt = self.state.lock().attempts(&task_id) + 1;
            {
                let mut state = self.state.lock();
                state.current_task = Some(task_id.clone());
            }
            *self.running.lock() = Some((task_id.clone(), tier));
            self.save_state();
            self.update_status();
            if let Some(ref activity) = self.activity {
                activity.set_current(&task_id, tier);
            }
            self.emit(Event::TaskStart {
                prd: self.prefix.clone(),
                task_id: task_id.clone(),
                worker: tier,
                attempt,
            });

            let escalated_from = {
                let state = self.state.lock();
                state
                    .escalations
                    .iter()
                    .rfind(|e| e.task_id == task_id && e.to == tier)
                    .map(|e| e.from)
            };
            let prompt = {
                let prd = self.prd.lock();
                let state = self.state.lock();
                self.prompts.task_prompt(&TaskPromptInputs {
                    prd: &prd,
                    task: &task,
                    tier,
                    state: &state,
                    review_feedback: review_feedback.as_deref(),
                    guidance: guidance.as_deref(),
                    escalated_from,
                })
            };
            guidance = None;

            let result = self.run_attempt(&worker, &task, tier, &prompt, &cancel).await?;
            self.harvest_side_signals(&task_id, &result);

            match result.promise() {
                Some(Promise::Complete) => {
                    match self.accept_completion(&task, tier, &result, &cancel).await? {
                        Ok(()) => {
                            self.finish_task(&task_id);
                            return Ok(TaskOutcome::Completed);
                        }
                        Err(feedback) => {
                            review_feedback = Some(feedback);
                            last_was_blocked = false;
                            match self
                                .route_failure(&task, tier, "acceptance gate failed")
                                .await?
                            {
                                Directive::Retry(g) => {
                                    if g.is_some() {
                                        guidance = g;
                                    }
                                }
                                Directive::Escalated => {}
                                Directive::Skip => {
                                    return self.skip_task(&task_id, last_was_blocked)
                                }
                                Directive::Abort(reason) => {
                                    return Err(EngineError::Aborted { task: task_id, reason })
                                }
                            }
                            continue;
                        }
                    }
                }
                Some(Promise::AlreadyDone) => {
                    self.record_absorption(&task_id, task_id.clone());
                    self.finish_task(&task_id);
                    return Ok(TaskOutcome::AlreadyDone);
                }
                Some(Promise::AbsorbedBy(by)) => {
                    self.record_absorption(&task_id, by.clone());
                    self.finish_task(&task_id);
                    return Ok(TaskOutcome::Absorbed(by));
                }
                Some(Promise::Blocked) => {
                    last_was_blocked = true;
                    let reason = extract_error_message(&result.output, ERROR_MESSAGE_MAX);
                    self.emit(Event::TaskBlocked {
                        prd: self.prefix.clone(),
                        task_id: task_id.clone(),
                        worker: tier,
                        reason: reason.clone(),
                    });
                    self.record_attempt(&task, tier, TaskStatus::Blocked, &result, None);
                    match self.escalate_or_decide(&task, tier, "worker blocked").await? {
                        Directive::Retry(g) => guidance = g,
                        Directive::Escalated => {}
                        Directive::Skip => return self.skip_task(&task_id, last_was_blocked),
                        Directive::Abort(reason) => {
                            return Err(EngineError::Aborted { task: task_id, reason })
                        }
                    }
                }
                None if result.timeout || result.crashed => {
                    last_was_blocked = false;
                    let reason =
                        if result.timeout { "worker timeout" } else { "worker crashed" };
                    self.record_attempt(&task, tier, TaskStatus::Failed, &result, None);
                    match self.route_failure(&task, tier, reason).await? {
                        Directive::Retry(g) => {
                            if g.is_some() {
                                guidance = g;
                            }
                        }
                        Directive::Escalated => {}
                        Directive::Skip => return self.skip_task(&task_id, last_was_blocked),
                        Directive::Abort(reason) => {
                            return Err(EngineError::Aborted { task: task_id, reason })
                        }
                    }
                }
                None => {
                    // Needs iteration or a plain error exit.
                    last_was_blocked = false;
                    let category = self.classifier.classify(&result.output);
                    self.record_attempt(
                        &task,
                        tier,
                        TaskStatus::Failed,
                        &result,
                        Some(category),
                    );

                    if let Some(ref question) = result.signals.scope_question {
                        if let Some(answer) = self.decide_scope(&task, question).await {
                            guidance = Some(answer);
                        }
                    }

                    match self.route_iteration(&task, tier, category, &result).await? {
                        Directive::Retry(g) => {
                            if g.is_some() {
                                guidance = g;
                            }
                        }
                        Directive::Escalated => {}
                        Directive::Skip => return self.skip_task(&task_id, last_was_blocked),
                        Directive::Abort(reason) => {
                            return Err(EngineError::Aborted { task: task_id, reason })
                        }
                    }
                }
            }
        }
    }

    /// One worker invocation with the attention watchdog running.
    async fn run_attempt(
        self: &Arc<Self>,
        worker: &Arc<dyn brigade_adapters::Worker>,
        task: &Task,
        tier: Tier,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<WorkerResult, EngineError> {
        *self.last_output.lock() = Instant::now();
        let watchdog = self.spawn_attention_watchdog(task.id.clone(), tier);

        let ctx = ExecContext {
            cancel: cancel.clone(),
            log_path: self.config.worker_log_dir.as_ref().map(|dir| {
                dir.join(format!("{}-{}.log", self.prefix, task.id))
            }),
            quiet: self.config.quiet,
            last_output: Some(Arc::clone(&self.last_output)),
        };
        let result = worker.execute(prompt, &ctx).await;

        watchdog.abort();
        self.set_attention(false);
        let result = result?;
        tracing::debug!(
            task = %task.id,
            tier = %tier,
            exit = ?result.exit_code,
            timeout = result.timeout,
            crashed = result.crashed,
            "worker finished"
        );
        Ok(result)
    }

    /// Raise attention when a long-running worker has gone quiet.
    fn spawn_attention_watchdog(
        self: &Arc<Self>,
        task_id: String,
        tier: Tier,
    ) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        let threshold = self.config.attention_after;
        let expected = tier.default_timeout() / 2;
        tokio::spawn(async move {
            let started = Instant::now();
            let mut raised = false;
            let mut ticker = tokio::time::interval(threshold / 4);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let quiet_for = this.last_output.lock().elapsed();
                if !raised && quiet_for > threshold && started.elapsed() > expected {
                    raised = true;
                    this.set_attention(true);
                    this.emit(Event::Attention {
                        prd: this.prefix.clone(),
                        task_id: Some(task_id.clone()),
                        reason: format!(
                            "no worker output for {}s",
                            quiet_for.as_secs()
                        ),
                    });
                    this.update_status();
                }
            }
        })
    }

    /// COMPLETE path: verification, then optional executive review.
    /// Returns `Ok(Ok(()))` to accept, `Ok(Err(feedback))` to demote the
    /// attempt to iteration.
    #[allow(clippy::type_complexity)]
    async fn accept_completion(
        self: &Arc<Self>,
        task: &Task,
        tier: Tier,
        result: &WorkerResult,
        cancel: &CancellationToken,
    ) -> Result<Result<(), String>, EngineError> {
        if !task.verification.is_empty() && !task.manual_verification {
            let outcome = self.verifier.verify_task(task, cancel).await;
            self.emit(Event::Verification {
                prd: self.prefix.clone(),
                task_id: task.id.clone(),
                passed: outcome.passed,
                commands: outcome.results.len(),
            });
            if !outcome.passed {
                let summary = outcome.failure_summary();
                self.record_failed_verification(task, tier, result, &summary);
                return Ok(Err(summary));
            }
        }

        let review_applies = self.config.executive_review
            && !(self.config.review_junior_only && tier > Tier::Line);
        if review_applies {
            if let Some(verdict) = self.run_executive_review(task, result).await {
                let (passed, reason) = match verdict {
                    ReviewVerdict::Pass => (true, String::new()),
                    ReviewVerdict::Fail(reason) => (false, reason),
                };
                {
                    let mut state = self.state.lock();
                    state.record_review(Review {
                        task_id: task.id.clone(),
                        result: if passed { ReviewResult::Pass } else { ReviewResult::Fail },
                        reason: reason.clone(),
                        timestamp: chrono::Utc::now().to_rfc3339(),
                    });
                }
                self.emit(Event::Review {
                    prd: self.prefix.clone(),
                    task_id: task.id.clone(),
                    passed,
                    reason: reason.clone(),
                });
                if !passed {
                    let mut state = self.state.lock();
                    state.record_history(TaskHistoryEntry {
                        task_id: task.id.clone(),
                        worker: tier,
                        status: TaskStatus::Failed,
                        timestamp: chrono::Utc::now().to_rfc3339(),
                        duration_seconds: Some(result.duration.as_secs()),
                        approach: result.signals.approach.clone(),
                        error: Some("review failed".to_string()),
                        category: None,
                    });
                    drop(state);
                    return Ok(Err(reason));
                }
            }
        }

        let duration = result.duration.as_secs();
        {
            let mut state = self.state.lock();
            state.record_history(TaskHistoryEntry {
                task_id: task.id.clone(),
                worker: tier,
                status: TaskStatus::Complete,
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_seconds: Some(duration),
                approach: result.signals.approach.clone(),
                error: None,
                category: None,
            });
        }
        self.prd.lock().mark_passes(&task.id);
        self.emit(Event::TaskComplete {
            prd: self.prefix.clone(),
            task_id: task.id.clone(),
            worker: tier,
            duration_seconds: duration,
            backlog: result.signals.backlog.clone(),
        });
        Ok(Ok(()))
    }

    async fn run_executive_review(
        self: &Arc<Self>,
        task: &Task,
        result: &WorkerResult,
    ) -> Option<ReviewVerdict> {
        let worker = self.workers.get(&Tier::Executive)?;
        let prompt = {
            let prd = self.prd.lock();
            self.prompts.executive_review(&prd, task, &result.output)
        };
        let ctx = ExecContext::new(self.cancel.clone());
        match worker.execute(&prompt, &ctx).await {
            Ok(review_result) => review_result.signals.review,
            Err(error) => {
                tracing::warn!(%error, task = %task.id, "executive review failed to run");
                None
            }
        }
    }

    /// Iteration route: session-failure bookkeeping, then threshold checks.
    async fn route_iteration(
        self: &Arc<Self>,
        task: &Task,
        tier: Tier,
        category: brigade_core::Category,
        result: &WorkerResult,
    ) -> Result<Directive, EngineError> {
        let error_message = extract_error_message(&result.output, ERROR_MESSAGE_MAX);
        if !error_message.is_empty() {
            let mut state = self.state.lock();
            let max = self.config.session_failures_max;
            state.push_session_failure(
                brigade_core::SessionFailure {
                    task_id: task.id.clone(),
                    category,
                    error: error_message,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                },
                max,
            );
        }

        if !category.is_retryable() {
            // Environment failures hit the same wall at every tier.
            return self.decide(task, "environment failure", self.attempts_of(&task.id)).await;
        }

        self.route_failure(task, tier, &format!("repeated {category} failures")).await
    }

    /// Shared failure routing: escalation thresholds first, then the
    /// iteration cap, otherwise retry at the same tier.
    async fn route_failure(
        self: &Arc<Self>,
        task: &Task,
        tier: Tier,
        reason: &str,
    ) -> Result<Directive, EngineError> {
        let (at_tier, total) = {
            let state = self.state.lock();
            (state.attempts_at(&task.id, tier), state.attempts(&task.id))
        };
        let threshold = match tier {
            Tier::Line => Some(self.config.escalation_after),
            Tier::Sous if self.config.escalation_to_exec => {
                Some(self.config.escalation_to_exec_after)
            }
            _ => None,
        };
        if let Some(threshold) = threshold {
            if at_tier >= threshold {
                return self.escalate_or_decide(task, tier, reason).await;
            }
        }
        if total >= self.config.max_iterations {
            return self.decide(task, "max iterations reached", total).await;
        }
        Ok(Directive::Retry(None))
    }

    fn attempts_of(&self, task_id: &str) -> usize {
        self.state.lock().attempts(task_id)
    }

    pub(crate) fn record_attempt(
        &self,
        task: &Task,
        tier: Tier,
        status: TaskStatus,
        result: &WorkerResult,
        category: Option<brigade_core::Category>,
    ) {
        let error = if result.timeout {
            Some("worker timeout".to_string())
        } else if result.crashed {
            Some("worker crashed".to_string())
        } else {
            let message = extract_error_message(&result.output, ERROR_MESSAGE_MAX);
            (!message.is_empty()).then_some(message)
        };
        let mut state = self.state.lock();
        state.record_history(TaskHistoryEntry {
            task_id: task.id.clone(),
            worker: tier,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_seconds: Some(result.duration.as_secs()),
            approach: result.signals.approach.clone(),
            error,
            category,
        });
    }

    fn record_failed_verification(
        &self,
        task: &Task,
        tier: Tier,
        result: &WorkerResult,
        summary: &str,
    ) {
        let category = self.classifier.classify(summary);
        let mut state = self.state.lock();
        state.record_history(TaskHistoryEntry {
            task_id: task.id.clone(),
            worker: tier,
            status: TaskStatus::Failed,
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_seconds: Some(result.duration.as_secs()),
            approach: result.signals.approach.clone(),
            error: Some("verification failed".to_string()),
            category: Some(category),
        });
    }

    fn record_absorption(&self, task_id: &str, absorbed_by: String) {
        let mut state = self.state.lock();
        state.record_absorption(Absorption {
            task_id: task_id.to_string(),
            absorbed_by,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        drop(state);
        self.prd.lock().mark_passes(task_id);
    }

    /// Clear per-task bookkeeping after a terminal outcome.
    fn finish_task(&self, task_id: &str) {
        {
            let mut state = self.state.lock();
            if state.current_task.as_deref() == Some(task_id) {
                state.current_task = None;
            }
        }
        *self.running.lock() = None;
        if let Some(ref activity) = self.activity {
            activity.clear_current();
        }
        self.save_state();
        self.update_status();
    }

    fn skip_task(
        &self,
        task_id: &str,
        was_blocked: bool,
    ) -> Result<TaskOutcome, EngineError> {
        {
            let mut state = self.state.lock();
            let tier = state.escalated_tier(task_id).unwrap_or(Tier::Line);
            state.record_history(TaskHistoryEntry {
                task_id: task_id.to_string(),
                worker: tier,
                status: TaskStatus::Skipped,
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_seconds: None,
                approach: None,
                error: None,
                category: None,
            });
        }
        self.finish_task(task_id);
        if was_blocked {
            Ok(TaskOutcome::Blocked)
        } else {
            Ok(TaskOutcome::Skipped)
        }
    }

    /// Learnings and backlog tags are side signals on any outcome.
    fn harvest_side_signals(&self, task_id: &str, result: &WorkerResult) {
        if !result.signals.learnings.is_empty() {
            if let Some(ref path) = self.config.team_learnings {
                use std::io::Write;
                let appended = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .and_then(|mut f| {
                        for learning in &result.signals.learnings {
                            writeln!(f, "- {learning}")?;
                        }
                        Ok(())
                    });
                if let Err(error) = appended {
                    tracing::warn!(%error, "failed to append team learnings");
                }
            }
        }
        for item in &result.signals.backlog {
            tracing::info!(task = %task_id, backlog = %item, "worker filed a backlog item");
        }
    }
}
