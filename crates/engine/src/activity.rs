// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity log: periodic heartbeat lines tagged with the current task.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use brigade_core::{format_elapsed, Tier};

#[derive(Default)]
struct Current {
    task: Option<(String, Tier, Instant)>,
}

/// Appends `[HH:MM:SS] prefix/task: worker working (elapsed)` lines on a
/// ticker, plus discrete transition records. Start/stop are idempotent.
pub struct ActivityLog {
    path: PathBuf,
    prefix: String,
    interval: Duration,
    current: Arc<Mutex<Current>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityLog {
    pub fn new(path: PathBuf, prefix: String, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            path,
            prefix,
            interval,
            current: Arc::new(Mutex::new(Current::default())),
            ticker: Mutex::new(None),
        })
    }

    pub fn start(self: &Arc<Self>) {
        let mut guard = self.ticker.lock();
        if guard.is_some() {
            return;
        }
        let log = Arc::clone(self);
        let interval = self.interval;
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                log.write_heartbeat();
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }

    /// Record which task a worker is on; heartbeats name it until cleared.
    pub fn set_current(&self, task_id: &str, tier: Tier) {
        self.current.lock().task = Some((task_id.to_string(), tier, Instant::now()));
    }

    pub fn clear_current(&self) {
        self.current.lock().task = None;
    }

    /// Record a discrete transition such as SERVICE_START or ESCALATION.
    pub fn record(&self, label: &str) {
        self.append(&format!("{label} {}", self.prefix));
    }

    fn write_heartbeat(&self) {
        let line = {
            let current = self.current.lock();
            match &current.task {
                Some((task, tier, started)) => format!(
                    "{}/{task}: {tier} working ({})",
                    self.prefix,
                    format_elapsed(started.elapsed())
                ),
                None => format!("IDLE {}", self.prefix),
            }
        };
        self.append(&line);
    }

    fn append(&self, line: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "[{stamp}] {line}"));
        if let Err(error) = result {
            tracing::warn!(path = %self.path.display(), %error, "activity log write failed");
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
