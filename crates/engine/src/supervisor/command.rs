// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polled command intake: a consumed-on-read mailbox from the supervisor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Retry,
    Skip,
    Abort,
    Pause,
}

brigade_core::simple_display! {
    CommandAction {
        Retry => "retry",
        Skip => "skip",
        Abort => "abort",
        Pause => "pause",
    }
}

/// A supervisor command addressed to one pending decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub decision: String,
    pub action: CommandAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// Polls the command file; reading removes it.
pub struct CommandReader {
    path: PathBuf,
    poll: Duration,
}

impl CommandReader {
    pub fn new(path: PathBuf, poll: Duration) -> Self {
        Self { path, poll }
    }

    /// Read and remove any pending command. A malformed file is removed
    /// and dropped with a warning so one bad write cannot wedge intake.
    pub fn take(&self) -> Option<Command> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        let _ = std::fs::remove_file(&self.path);
        match serde_json::from_str(&text) {
            Ok(command) => Some(command),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "discarding malformed command");
                None
            }
        }
    }

    /// Put back a command addressed to some other decision.
    ///
    /// A supervisor writing concurrently can clobber this; that race is
    /// tolerated, the supervisor rewrites on its next poll.
    pub fn write_back(&self, command: &Command) {
        if let Ok(body) = serde_json::to_string(command) {
            let _ = std::fs::write(&self.path, body);
        }
    }

    /// Wait up to `wait` (forever when None) for a command addressed to
    /// `decision_id`, putting back commands for other decisions.
    pub async fn wait_for(
        &self,
        decision_id: &str,
        wait: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Option<Command> {
        let deadline = wait.map(|w| std::time::Instant::now() + w);
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(command) = self.take() {
                if command.decision == decision_id {
                    return Some(command);
                }
                self.write_back(&command);
            }
            if let Some(deadline) = deadline {
                if std::time::Instant::now() >= deadline {
                    return None;
                }
            }
            tokio::select! {
                () = tokio::time::sleep(self.poll) => {}
                () = cancel.cancelled() => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
