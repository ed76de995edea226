// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted [`FakeWorker`] for engine and spec tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use brigade_core::signal::parse_output;
use brigade_core::Tier;

use crate::error::WorkerError;
use crate::worker::{ExecContext, Worker, WorkerResult};

/// A worker that replays scripted results and records prompts.
///
/// An exhausted script yields empty exit-0 output, which the orchestrator
/// reads as needs-iteration.
#[derive(Clone)]
pub struct FakeWorker {
    tier: Tier,
    script: Arc<Mutex<VecDeque<WorkerResult>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeWorker {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue an exit-0 result with the given output.
    pub fn push_output(&self, output: &str) -> &Self {
        self.push_exit(0, output)
    }

    /// Queue a result with an explicit exit code.
    pub fn push_exit(&self, code: i32, output: &str) -> &Self {
        self.script.lock().push_back(WorkerResult {
            output: output.to_string(),
            exit_code: Some(code),
            timeout: false,
            crashed: false,
            duration: Duration::from_secs(1),
            signals: parse_output(output),
        });
        self
    }

    /// Queue a timeout result.
    pub fn push_timeout(&self) -> &Self {
        self.script.lock().push_back(WorkerResult {
            output: String::new(),
            exit_code: None,
            timeout: true,
            crashed: false,
            duration: Duration::from_secs(1),
            signals: parse_output(""),
        });
        self
    }

    /// Queue a crash result.
    pub fn push_crash(&self) -> &Self {
        self.script.lock().push_back(WorkerResult {
            output: String::new(),
            exit_code: None,
            timeout: false,
            crashed: true,
            duration: Duration::from_secs(1),
            signals: parse_output(""),
        });
        self
    }

    /// Prompts seen so far, in execution order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn executions(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl Worker for FakeWorker {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn execute(
        &self,
        prompt: &str,
        _ctx: &ExecContext,
    ) -> Result<WorkerResult, WorkerError> {
        self.prompts.lock().push(prompt.to_string());
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or_else(|| WorkerResult {
            output: String::new(),
            exit_code: Some(0),
            timeout: false,
            crashed: false,
            duration: Duration::from_secs(1),
            signals: parse_output(""),
        }))
    }
}
