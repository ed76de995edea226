// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Escalation and decision points: who runs a task next, and what to do
//! when a task has defeated every tier it is allowed to reach.
//!
//! Decision precedence: a supervisor command within the wait timeout,
//! then the walkaway autonomous decision, then an interactive prompt.

use std::io::IsTerminal;
use std::sync::Arc;

use brigade_adapters::ExecContext;
use brigade_core::prd::Task;
use brigade_core::signal::{strip_tags, WalkawayAction};
use brigade_core::state::Escalation;
use brigade_core::{Event, SessionState, Tier};

use super::Orchestrator;
use crate::error::EngineError;
use crate::supervisor::CommandAction;

/// What the attempt loop should do next.
#[derive(Debug)]
pub(crate) enum Directive {
    /// Re-run the task, optionally with fresh guidance for the prompt.
    Retry(Option<String>),
    /// An escalation was recorded; re-run at the new tier.
    Escalated,
    Skip,
    Abort(String),
}

/// Tier for a task: recorded escalations win, else complexity maps it.
pub(crate) fn select_tier(state: &SessionState, task: &Task) -> Tier {
    state
        .escalated_tier(&task.id)
        .unwrap_or_else(|| task.complexity.starting_tier())
}

impl Orchestrator {
    /// Move the task one tier up, or fall through to a decision point
    /// when no higher tier is reachable.
    pub(crate) async fn escalate_or_decide(
        self: &Arc<Self>,
        task: &Task,
        tier: Tier,
        reason: &str,
    ) -> Result<Directive, EngineError> {
        let next = match tier.next() {
            Some(Tier::Executive) if !self.config.escalation_to_exec => None,
            other => other,
        };
        let Some(next) = next else {
            let attempts = self.state.lock().attempts(&task.id);
            return self.decide(task, reason, attempts).await;
        };

        tracing::info!(task = %task.id, from = %tier, to = %next, reason, "escalating");
        {
            let mut state = self.state.lock();
            state.record_escalation(Escalation {
                task_id: task.id.clone(),
                from: tier,
                to: next,
                reason: reason.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            });
        }
        self.emit(Event::Escalation {
            prd: self.prefix.clone(),
            task_id: task.id.clone(),
            from: tier,
            to: next,
            reason: reason.to_string(),
        });
        if let Some(ref activity) = self.activity {
            activity.record("ESCALATION");
        }
        self.save_state();
        Ok(Directive::Escalated)
    }

    /// A decision point: the task has hit its iteration cap or exhausted
    /// its top tier.
    pub(crate) async fn decide(
        self: &Arc<Self>,
        task: &Task,
        reason: &str,
        attempts: usize,
    ) -> Result<Directive, EngineError> {
        let decision_id = format!("dcn-{}", nanoid::nanoid!(8));
        self.decision_pending.store(true, std::sync::atomic::Ordering::SeqCst);
        self.emit(Event::DecisionNeeded {
            prd: self.prefix.clone(),
            task_id: task.id.clone(),
            decision_id: decision_id.clone(),
            reason: reason.to_string(),
            attempts,
        });
        self.update_status();

        let directive = self.decide_inner(task, reason, attempts, &decision_id).await;
        self.decision_pending.store(false, std::sync::atomic::Ordering::SeqCst);
        self.update_status();
        directive
    }

    async fn decide_inner(
        self: &Arc<Self>,
        task: &Task,
        reason: &str,
        attempts: usize,
        decision_id: &str,
    ) -> Result<Directive, EngineError> {
        // 1. Supervisor command within the wait timeout.
        if let Some(ref commands) = self.commands {
            loop {
                let Some(command) = commands
                    .wait_for(decision_id, self.config.command_wait, &self.cancel)
                    .await
                else {
                    break;
                };
                self.emit(Event::DecisionReceived {
                    prd: self.prefix.clone(),
                    task_id: task.id.clone(),
                    decision_id: decision_id.to_string(),
                    action: command.action.to_string(),
                    source: "supervisor".to_string(),
                });
                match command.action {
                    CommandAction::Retry => return Ok(Directive::Retry(command.guidance)),
                    CommandAction::Skip => return Ok(Directive::Skip),
                    CommandAction::Abort => {
                        let why = command
                            .reason
                            .unwrap_or_else(|| "supervisor abort".to_string());
                        return Ok(Directive::Abort(why));
                    }
                    // Pause: hold the decision open for a follow-up command.
                    CommandAction::Pause => continue,
                }
            }
        }

        // 2. Walkaway autonomous decision.
        if self.walkaway {
            return Ok(self.walkaway_decide(task, reason, attempts).await);
        }

        // 3. Interactive prompt, degraded to failure when non-interactive.
        if std::io::stdin().is_terminal() {
            if let Some(directive) = self.ask_operator(task, reason).await {
                return Ok(directive);
            }
        }
        Err(EngineError::DecisionUnavailable { task: task.id.clone() })
    }

    /// Run the executive on a walkaway prompt; unrecognized replies SKIP.
    async fn walkaway_decide(
        self: &Arc<Self>,
        task: &Task,
        reason: &str,
        attempts: usize,
    ) -> Directive {
        let Some(worker) = self.workers.get(&Tier::Executive) else {
            tracing::warn!(task = %task.id, "no executive worker for walkaway, skipping");
            return Directive::Skip;
        };
        let prompt = {
            let prd = self.prd.lock();
            let state = self.state.lock();
            self.prompts.walkaway_decision(&prd, task, reason, attempts, &state)
        };
        let ctx = ExecContext::new(self.cancel.clone());
        let result = match worker.execute(&prompt, &ctx).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, task = %task.id, "walkaway decision failed to run, skipping");
                return Directive::Skip;
            }
        };
        let action = result.signals.decision.unwrap_or(WalkawayAction::Skip);
        self.emit(Event::DecisionReceived {
            prd: self.prefix.clone(),
            task_id: task.id.clone(),
            decision_id: String::new(),
            action: action.to_string(),
            source: "walkaway".to_string(),
        });
        match action {
            WalkawayAction::Retry => Directive::Retry(result.signals.guidance),
            WalkawayAction::Skip => Directive::Skip,
            WalkawayAction::Abort => Directive::Abort(format!("walkaway abort: {reason}")),
        }
    }

    /// Decide a worker's `<scope-question>` with the executive tier.
    pub(crate) async fn decide_scope(
        self: &Arc<Self>,
        task: &Task,
        question: &str,
    ) -> Option<String> {
        let worker = self.workers.get(&Tier::Executive)?;
        let prompt = {
            let prd = self.prd.lock();
            self.prompts.scope_decision(&prd, task, question)
        };
        let ctx = ExecContext::new(self.cancel.clone());
        let result = match worker.execute(&prompt, &ctx).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, task = %task.id, "scope decision failed to run");
                return None;
            }
        };
        let answer = strip_tags(&result.output).trim().to_string();
        if answer.is_empty() {
            return None;
        }
        self.emit(Event::ScopeDecision {
            prd: self.prefix.clone(),
            task_id: task.id.clone(),
            question: question.to_string(),
            decision: answer.clone(),
        });
        Some(answer)
    }

    /// Blocking terminal prompt, off the async runtime.
    async fn ask_operator(&self, task: &Task, reason: &str) -> Option<Directive> {
        let task_id = task.id.clone();
        let reason = reason.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            eprintln!("task {task_id} needs a decision ({reason})");
            eprint!("retry / skip / abort? ");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok()?;
            Some(line.trim().to_ascii_lowercase())
        })
        .await
        .ok()??;
        match answer.as_str() {
            "retry" | "r" => Some(Directive::Retry(None)),
            "skip" | "s" => Some(Directive::Skip),
            "abort" | "a" => Some(Directive::Abort("operator abort".to_string())),
            _ => None,
        }
    }
}
