// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Worker`] trait and its CLI implementation.
//!
//! A worker executes one prompt and reports an outcome. Specializations
//! per tool are command-shape adapters on one concrete type, not a
//! hierarchy.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use brigade_core::signal::{parse_output, ParsedSignals, Promise};
use brigade_core::Tier;

use crate::command::{parse_base_command, shape_invocation, BaseCommand};
use crate::error::WorkerError;
use crate::spawn::{run_child, SpawnSpec};

/// Worker exit codes with reserved meanings.
pub const EXIT_BLOCKED: i32 = 32;
pub const EXIT_ALREADY_DONE: i32 = 33;
pub const EXIT_ABSORBED: i32 = 34;

/// Per-invocation context threaded from the orchestrator.
#[derive(Clone)]
pub struct ExecContext {
    pub cancel: CancellationToken,
    /// Tee worker output to this file when set.
    pub log_path: Option<PathBuf>,
    /// Suppress echoing worker output to our stdout.
    pub quiet: bool,
    /// Updated whenever the worker produces output; feeds the attention
    /// heuristic.
    pub last_output: Option<Arc<Mutex<Instant>>>,
}

impl ExecContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, log_path: None, quiet: true, last_output: None }
    }
}

/// Outcome of one worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    /// Combined stdout+stderr in arrival order.
    pub output: String,
    /// None when the child died on a signal.
    pub exit_code: Option<i32>,
    pub timeout: bool,
    pub crashed: bool,
    pub duration: Duration,
    pub signals: ParsedSignals,
}

impl WorkerResult {
    /// The promise in effect after exit-code mapping.
    ///
    /// Exit 0 defers to the parsed promise tag. The reserved codes assert
    /// an outcome even without a tag, except ABSORBED_BY which is useless
    /// without the absorbing task id from the tag.
    pub fn promise(&self) -> Option<Promise> {
        if self.timeout || self.crashed {
            return None;
        }
        match self.exit_code {
            Some(0) => self.signals.promise.clone(),
            Some(EXIT_BLOCKED) => Some(Promise::Blocked),
            Some(EXIT_ALREADY_DONE) => Some(Promise::AlreadyDone),
            Some(EXIT_ABSORBED) => match self.signals.promise {
                Some(Promise::AbsorbedBy(ref id)) => Some(Promise::AbsorbedBy(id.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    /// A plain failure exit: not a timeout, crash, or reserved code.
    pub fn is_error_exit(&self) -> bool {
        !self.timeout
            && !self.crashed
            && !matches!(
                self.exit_code,
                Some(0) | Some(EXIT_BLOCKED) | Some(EXIT_ALREADY_DONE) | Some(EXIT_ABSORBED)
            )
    }
}

/// A worker executes one prompt and reports what happened.
#[async_trait]
pub trait Worker: Send + Sync {
    fn tier(&self) -> Tier;
    async fn execute(&self, prompt: &str, ctx: &ExecContext)
        -> Result<WorkerResult, WorkerError>;
}

/// Configuration for one tier's CLI worker.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub command: String,
    pub timeout: Duration,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

/// A tier's CLI tool, driven one prompt at a time.
pub struct CliWorker {
    tier: Tier,
    base: BaseCommand,
    timeout: Duration,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl CliWorker {
    pub fn new(tier: Tier, spec: &WorkerSpec) -> Result<Self, WorkerError> {
        let base = parse_base_command(&spec.command)
            .ok_or_else(|| WorkerError::EmptyCommand(tier.to_string()))?;
        Ok(Self {
            tier,
            base,
            timeout: spec.timeout,
            env: spec.env.clone(),
            cwd: spec.cwd.clone(),
        })
    }
}

#[async_trait]
impl Worker for CliWorker {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn execute(
        &self,
        prompt: &str,
        ctx: &ExecContext,
    ) -> Result<WorkerResult, WorkerError> {
        let (program, args) = shape_invocation(&self.base, prompt);
        tracing::debug!(tier = %self.tier, %program, "starting worker");
        let raw = run_child(SpawnSpec {
            program,
            args,
            env: self.env.clone(),
            cwd: self.cwd.clone(),
            timeout: self.timeout,
            cancel: ctx.cancel.clone(),
            log_path: ctx.log_path.clone(),
            quiet: ctx.quiet,
            last_output: ctx.last_output.clone(),
        })
        .await?;
        let signals = parse_output(&raw.output);
        Ok(WorkerResult {
            output: raw.output,
            exit_code: raw.exit_code,
            timeout: raw.timeout,
            crashed: raw.crashed,
            duration: raw.duration,
            signals,
        })
    }
}

/// Builds one worker per tier from shared configuration.
pub struct WorkerFactory {
    specs: HashMap<Tier, WorkerSpec>,
}

impl WorkerFactory {
    pub fn new(specs: HashMap<Tier, WorkerSpec>) -> Self {
        Self { specs }
    }

    pub fn worker(&self, tier: Tier) -> Result<Arc<dyn Worker>, WorkerError> {
        let spec = self
            .specs
            .get(&tier)
            .ok_or_else(|| WorkerError::EmptyCommand(tier.to_string()))?;
        Ok(Arc::new(CliWorker::new(tier, spec)?))
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
