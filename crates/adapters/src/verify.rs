// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verification runner: executes a task's verification commands through
//! `sh -c` and aggregates pass/fail.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use brigade_core::prd::{Task, VerificationType};

use crate::spawn::{run_child, SpawnSpec};

/// Outcome of one verification command.
#[derive(Debug, Clone)]
pub struct VerifyCommandResult {
    pub cmd: String,
    pub kind: Option<VerificationType>,
    /// None when the command timed out or died on a signal.
    pub exit_code: Option<i32>,
    /// Interleaved output, capped to what fits a prompt.
    pub output: String,
    pub passed: bool,
}

/// Aggregate outcome: passes iff every command passed.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub passed: bool,
    pub results: Vec<VerifyCommandResult>,
}

impl VerifyOutcome {
    /// Compact failure text for the next attempt's prompt.
    pub fn failure_summary(&self) -> String {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| {
                let code = r
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "killed".to_string());
                format!("$ {}\n(exit {})\n{}", r.cmd, code, r.output.trim_end())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Runs verification entries with a shared per-command timeout.
pub struct Verifier {
    timeout: Duration,
    cwd: Option<PathBuf>,
    output_cap: usize,
}

impl Verifier {
    pub fn new(timeout: Duration, cwd: Option<PathBuf>) -> Self {
        Self { timeout, cwd, output_cap: 8 * 1024 }
    }

    /// Run every verification entry for `task`, in order.
    ///
    /// An empty verification list passes trivially.
    pub async fn verify_task(&self, task: &Task, cancel: &CancellationToken) -> VerifyOutcome {
        let mut results = Vec::with_capacity(task.verification.len());
        for entry in &task.verification {
            if cancel.is_cancelled() {
                break;
            }
            let cmd = entry.cmd().to_string();
            tracing::debug!(task = %task.id, %cmd, "running verification");
            let raw = run_child(SpawnSpec {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), cmd.clone()],
                env: Vec::new(),
                cwd: self.cwd.clone(),
                timeout: self.timeout,
                cancel: cancel.clone(),
                log_path: None,
                quiet: true,
                last_output: None,
            })
            .await;
            let result = match raw {
                Ok(raw) => {
                    let mut output = raw.output;
                    if output.len() > self.output_cap {
                        let mut end = self.output_cap;
                        while !output.is_char_boundary(end) {
                            end -= 1;
                        }
                        output.truncate(end);
                    }
                    let passed = !raw.timeout && raw.exit_code == Some(0);
                    VerifyCommandResult {
                        cmd,
                        kind: entry.kind(),
                        exit_code: raw.exit_code,
                        output,
                        passed,
                    }
                }
                Err(error) => VerifyCommandResult {
                    cmd,
                    kind: entry.kind(),
                    exit_code: None,
                    output: error.to_string(),
                    passed: false,
                },
            };
            results.push(result);
        }
        let passed = results.iter().all(|r| r.passed)
            && results.len() == task.verification.len();
        VerifyOutcome { passed, results }
    }
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
