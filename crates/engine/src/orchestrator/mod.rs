// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator loop: executes one PRD end-to-end under the service
//! lock.
//!
//! The loop derives the done set from state, selects ready tasks, runs
//! them (batched when parallelism allows), routes outcomes, and persists
//! state after every transition. Cleanup is idempotent and always runs.

mod attempt;
mod decision;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use brigade_adapters::{ModuleManager, Verifier, Worker};
use brigade_core::{prefix_from_path, Classifier, Event, Prd, SessionState, Tier};
use brigade_storage::{lock_path_for, LockConfig, ServiceLock, StateStore};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::error::EngineError;
use crate::prompt::PromptBuilder;
use crate::supervisor::{scoped_path, CommandReader, EventWriter, StatusSnapshot, StatusWriter};

/// Final tally of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub done: usize,
    pub total: usize,
}

/// Terminal outcome of one task's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    AlreadyDone,
    Absorbed(String),
    Skipped,
    /// Skipped, but the final worker signal was BLOCKED; single-task mode
    /// mirrors this as exit code 32.
    Blocked,
}

pub struct Orchestrator {
    pub(crate) config: Config,
    prd_path: PathBuf,
    pub(crate) prefix: String,
    pub(crate) prd: Mutex<Prd>,
    pub(crate) state: Mutex<SessionState>,
    store: StateStore,
    lock: Mutex<Option<ServiceLock>>,
    pub(crate) workers: HashMap<Tier, Arc<dyn Worker>>,
    pub(crate) verifier: Verifier,
    pub(crate) classifier: Classifier,
    pub(crate) prompts: PromptBuilder,
    pub(crate) modules: ModuleManager,
    status: Option<StatusWriter>,
    events: Option<EventWriter>,
    pub(crate) commands: Option<CommandReader>,
    pub(crate) activity: Option<Arc<ActivityLog>>,
    pub(crate) cancel: CancellationToken,
    started: Instant,
    pub(crate) walkaway: bool,
    pub(crate) decision_pending: AtomicBool,
    attention: AtomicBool,
    /// (task, tier) of the attempt currently running, for status.
    pub(crate) running: Mutex<Option<(String, Tier)>>,
    pub(crate) last_output: Arc<Mutex<Instant>>,
}

impl Orchestrator {
    /// Wire an orchestrator for one PRD with the given workers.
    pub async fn new(
        prd_path: PathBuf,
        config: Config,
        workers: HashMap<Tier, Arc<dyn Worker>>,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>, EngineError> {
        let prd = Prd::load(&prd_path)?;
        prd.validate_quick()?;
        let prefix = prefix_from_path(&prd_path);

        let mut classifier = Classifier::default();
        if let Some(ref patterns) = config.error_patterns {
            if let Err(error) = classifier.add_patterns_from_str(patterns) {
                tracing::warn!(%error, "ignoring invalid custom error patterns");
            }
        }

        let prompts = PromptBuilder::new(
            config.prompts_dir.clone(),
            config.team_learnings.clone(),
            config.codebase_map.clone(),
            config.approach_history_max,
            config.session_failures_max,
            config.smart_retry,
        );

        let status = config
            .status_file
            .as_deref()
            .map(|p| StatusWriter::new(scoped_path(p, &prefix, config.scoped_observers)));
        let events = match config.events_file.as_deref() {
            Some(p) => Some(EventWriter::open(scoped_path(p, &prefix, config.scoped_observers))?),
            None => None,
        };
        let commands = config.command_file.as_deref().map(|p| {
            CommandReader::new(
                scoped_path(p, &prefix, config.scoped_observers),
                config.command_poll,
            )
        });
        let activity = config.activity_log.clone().map(|p| {
            ActivityLog::new(p, prefix.clone(), config.activity_interval)
        });

        let modules = match config.modules_dir.as_deref() {
            Some(dir) if !config.modules.is_empty() => {
                ModuleManager::load(dir, &config.modules, config.module_timeout).await
            }
            _ => ModuleManager::disabled(),
        };

        if let Some(ref dir) = config.worker_log_dir {
            std::fs::create_dir_all(dir)?;
        }

        let walkaway = config.walkaway(prd.walkaway);
        let verifier = Verifier::new(config.verify_timeout, None);
        let store = StateStore::for_prd(&prd_path);
        let state = store.load_or_create()?;

        Ok(Arc::new(Self {
            config,
            prd_path,
            prefix,
            prd: Mutex::new(prd),
            state: Mutex::new(state),
            store,
            lock: Mutex::new(None),
            workers,
            verifier,
            classifier,
            prompts,
            modules,
            status,
            events,
            commands,
            activity,
            cancel,
            started: Instant::now(),
            walkaway,
            decision_pending: AtomicBool::new(false),
            attention: AtomicBool::new(false),
            running: Mutex::new(None),
            last_output: Arc::new(Mutex::new(Instant::now())),
        }))
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the whole PRD. Returns the final progress tally.
    pub async fn run(self: &Arc<Self>) -> Result<RunSummary, EngineError> {
        self.preflight()?;
        self.acquire_lock().await?;
        let result = self.run_inner().await;
        self.shutdown(result.is_ok()).await;
        result
    }

    /// Execute exactly one task, mirroring worker exit codes.
    pub async fn run_single(self: &Arc<Self>, task_id: &str) -> Result<TaskOutcome, EngineError> {
        {
            let prd = self.prd.lock();
            if prd.task(task_id).is_none() {
                return Err(EngineError::UnknownTask(task_id.to_string()));
            }
        }
        self.acquire_lock().await?;
        self.sync_passes();
        let result = self.execute_task(task_id.to_string(), self.cancel.clone()).await;
        self.save_state();
        self.shutdown(result.is_ok()).await;
        result
    }

    fn preflight(&self) -> Result<(), EngineError> {
        if self.walkaway && self.prd.lock().verification_is_grep_only() {
            return Err(EngineError::WalkawayGrepOnly);
        }
        Ok(())
    }

    async fn acquire_lock(&self) -> Result<(), EngineError> {
        let lock = ServiceLock::acquire(
            lock_path_for(&self.prd_path),
            LockConfig {
                heartbeat_interval: self.config.heartbeat_interval,
                stale_age: self.config.lock_stale_age,
            },
            self.config.force_lock,
            self.config.lock_timeout,
        )
        .await?;
        *self.lock.lock() = Some(lock);

        let mut state = self.state.lock();
        state.last_start_at = chrono::Utc::now().to_rfc3339();
        drop(state);
        self.save_state();
        Ok(())
    }

    async fn run_inner(self: &Arc<Self>) -> Result<RunSummary, EngineError> {
        if let Some(ref activity) = self.activity {
            activity.start();
            activity.record("SERVICE_START");
        }
        let total = self.prd.lock().tasks.len();
        self.emit(Event::ServiceStart { prd: self.prefix.clone(), total });
        self.update_status();

        loop {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            self.sync_passes();
            let (ready, pending) = {
                let prd = self.prd.lock();
                let selectable = self.selectable_done_set();
                let ready: Vec<String> =
                    prd.ready_tasks(&selectable).iter().map(|t| t.id.clone()).collect();
                let pending = prd.pending_tasks(&selectable).len();
                (ready, pending)
            };

            if ready.is_empty() {
                if pending > 0 {
                    return Err(EngineError::NoReadyTasks { pending });
                }
                break;
            }

            let outcomes = if self.config.max_parallel > 1 && ready.len() > 1 {
                self.run_batch(&ready).await?
            } else {
                vec![self.execute_task(ready[0].clone(), self.cancel.clone()).await?]
            };

            for outcome in &outcomes {
                if matches!(outcome, TaskOutcome::Skipped | TaskOutcome::Blocked) {
                    let skips = self.state.lock().consecutive_skips;
                    if skips >= self.config.walkaway_max_skips {
                        return Err(EngineError::SkipLimit { count: skips });
                    }
                }
            }

            self.save_state();
            self.update_status();
        }

        let summary = self.summary();
        self.emit(Event::ServiceComplete {
            prd: self.prefix.clone(),
            done: summary.done,
            total: summary.total,
        });
        Ok(summary)
    }

    /// Build and run one concurrent batch: at most one task above the line
    /// tier, the rest line tasks, bounded by `max_parallel`.
    async fn run_batch(
        self: &Arc<Self>,
        ready: &[String],
    ) -> Result<Vec<TaskOutcome>, EngineError> {
        let batch = self.build_batch(ready);
        tracing::debug!(size = batch.len(), "running parallel batch");
        let batch_cancel = self.cancel.child_token();
        let mut set = tokio::task::JoinSet::new();
        for task_id in batch {
            let this = Arc::clone(self);
            let cancel = batch_cancel.clone();
            set.spawn(async move { this.execute_task(task_id, cancel).await });
        }

        let mut outcomes = Vec::new();
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(error)) => {
                    if first_error.is_none() {
                        batch_cancel.cancel();
                        first_error = Some(error);
                    }
                }
                Err(join_error) => {
                    if first_error.is_none() {
                        batch_cancel.cancel();
                        first_error = Some(EngineError::Io(std::io::Error::other(join_error)));
                    }
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(outcomes),
        }
    }

    fn build_batch(&self, ready: &[String]) -> Vec<String> {
        let prd = self.prd.lock();
        let state = self.state.lock();
        let mut batch = Vec::new();
        let mut heavy_taken = false;
        for id in ready {
            if batch.len() >= self.config.max_parallel {
                break;
            }
            let Some(task) = prd.task(id) else { continue };
            let tier = decision::select_tier(&state, task);
            if tier > Tier::Line {
                if heavy_taken {
                    continue;
                }
                heavy_taken = true;
            }
            batch.push(id.clone());
        }
        batch
    }

    /// Project recorded completions onto the in-memory PRD.
    pub(crate) fn sync_passes(&self) {
        let done = self.state.lock().completed_ids();
        let mut prd = self.prd.lock();
        for id in done {
            prd.mark_passes(&id);
        }
    }

    /// Done set for scheduling: completions plus walkaway skips, so
    /// dependents of a skipped task still run. Skips never count as
    /// passing anywhere else.
    fn selectable_done_set(&self) -> HashSet<String> {
        let state = self.state.lock();
        let mut done = state.completed_ids();
        done.extend(state.skipped_ids());
        done
    }

    pub(crate) fn summary(&self) -> RunSummary {
        let prd = self.prd.lock();
        let completed = self.state.lock().completed_ids();
        let (done, total) = prd.progress(&completed);
        RunSummary { done, total }
    }

    /// Send an event to the JSONL stream and the module dispatcher.
    /// Observer failures are logged, never propagated.
    pub(crate) fn emit(&self, event: Event) {
        if let Some(ref events) = self.events {
            if let Err(error) = events.append(&event) {
                tracing::warn!(%error, event = event.event_type(), "event write failed");
            }
        }
        self.modules.dispatch(&event);
    }

    pub(crate) fn save_state(&self) {
        let state = self.state.lock();
        if let Err(error) = self.store.save(&state) {
            tracing::error!(%error, "state save failed");
        }
    }

    pub(crate) fn set_attention(&self, on: bool) {
        self.attention.store(on, Ordering::SeqCst);
    }

    pub(crate) fn update_status(&self) {
        let Some(ref status) = self.status else {
            return;
        };
        let snapshot = {
            let prd = self.prd.lock();
            let state = self.state.lock();
            let (done, total) = prd.progress(&state.completed_ids());
            let running = self.running.lock();
            StatusSnapshot {
                done,
                total,
                current: running.as_ref().map(|(task, _)| task.clone()),
                worker: running.as_ref().map(|(_, tier)| tier.to_string()),
                elapsed_seconds: Some(self.started.elapsed().as_secs()),
                attention: self.attention.load(Ordering::SeqCst)
                    || self.decision_pending.load(Ordering::SeqCst),
            }
        };
        if let Err(error) = status.write(&snapshot) {
            tracing::warn!(%error, "status write failed");
        }
    }

    /// Idempotent orderly shutdown: modules, activity, final state save,
    /// status refresh, lock release.
    async fn shutdown(&self, success: bool) {
        self.modules.cleanup();
        if let Some(ref activity) = self.activity {
            activity.record("SERVICE_END");
            activity.stop();
        }
        self.save_state();
        self.update_status();
        if !success {
            tracing::info!(prd = %self.prefix, "run ended with an error");
        }
        if let Some(lock) = self.lock.lock().take() {
            if let Err(error) = lock.release() {
                tracing::warn!(%error, "lock release failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
