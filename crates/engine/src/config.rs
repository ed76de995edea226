// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine.
//!
//! Every knob has a default; an empty string for an observer path disables
//! that channel. Worker commands have no default: a tier without a
//! configured command simply cannot be scheduled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use brigade_adapters::WorkerSpec;
use brigade_core::Tier;

/// Fully-resolved orchestrator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub workers: HashMap<Tier, WorkerSpec>,
    pub max_iterations: usize,
    pub max_parallel: usize,
    pub escalation_after: usize,
    pub escalation_to_exec: bool,
    pub escalation_to_exec_after: usize,
    /// Overrides the PRD's own walkaway flag when set.
    pub walkaway_override: Option<bool>,
    pub walkaway_max_skips: u32,
    pub smart_retry: bool,
    pub approach_history_max: usize,
    pub session_failures_max: usize,
    /// Extra classifier patterns, `"pat:cat,..."`.
    pub error_patterns: Option<String>,
    pub status_file: Option<PathBuf>,
    pub events_file: Option<PathBuf>,
    pub command_file: Option<PathBuf>,
    pub command_poll: Duration,
    /// None means wait forever at a decision point.
    pub command_wait: Option<Duration>,
    pub scoped_observers: bool,
    pub modules_dir: Option<PathBuf>,
    pub modules: Vec<String>,
    pub module_timeout: Duration,
    pub prompts_dir: Option<PathBuf>,
    pub team_learnings: Option<PathBuf>,
    pub codebase_map: Option<PathBuf>,
    pub verify_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub lock_stale_age: Duration,
    pub lock_timeout: Duration,
    pub force_lock: bool,
    pub activity_log: Option<PathBuf>,
    pub activity_interval: Duration,
    pub attention_after: Duration,
    pub executive_review: bool,
    pub review_junior_only: bool,
    pub quiet: bool,
    pub worker_log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: HashMap::new(),
            max_iterations: 5,
            max_parallel: 1,
            escalation_after: 2,
            escalation_to_exec: false,
            escalation_to_exec_after: 2,
            walkaway_override: None,
            walkaway_max_skips: 3,
            smart_retry: true,
            approach_history_max: 3,
            session_failures_max: 10,
            error_patterns: None,
            status_file: None,
            events_file: None,
            command_file: None,
            command_poll: Duration::from_secs(3),
            command_wait: Some(Duration::from_secs(300)),
            scoped_observers: true,
            modules_dir: None,
            modules: Vec::new(),
            module_timeout: Duration::from_secs(5),
            prompts_dir: None,
            team_learnings: None,
            codebase_map: None,
            verify_timeout: Duration::from_secs(600),
            heartbeat_interval: Duration::from_secs(30),
            lock_stale_age: Duration::from_secs(3600),
            lock_timeout: Duration::from_secs(10),
            force_lock: false,
            activity_log: None,
            activity_interval: Duration::from_secs(60),
            attention_after: Duration::from_secs(120),
            executive_review: false,
            review_junior_only: false,
            quiet: false,
            worker_log_dir: None,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut workers = HashMap::new();
        for (tier, command_var, timeout_var) in [
            (Tier::Line, "LINE_COMMAND", "LINE_TIMEOUT_MIN"),
            (Tier::Sous, "SOUS_COMMAND", "SOUS_TIMEOUT_MIN"),
            (Tier::Executive, "EXECUTIVE_COMMAND", "EXECUTIVE_TIMEOUT_MIN"),
        ] {
            if let Some(command) = env_string(command_var) {
                let timeout = env_u64(timeout_var)
                    .map(|m| Duration::from_secs(m * 60))
                    .unwrap_or_else(|| tier.default_timeout());
                workers.insert(
                    tier,
                    WorkerSpec { command, timeout, env: Vec::new(), cwd: None },
                );
            }
        }

        Self {
            workers,
            max_iterations: env_usize("MAX_ITERATIONS").unwrap_or(defaults.max_iterations),
            max_parallel: env_usize("MAX_PARALLEL").unwrap_or(defaults.max_parallel).max(1),
            escalation_after: env_usize("ESCALATION_AFTER")
                .unwrap_or(defaults.escalation_after),
            escalation_to_exec: env_bool("ESCALATION_TO_EXEC")
                .unwrap_or(defaults.escalation_to_exec),
            escalation_to_exec_after: env_usize("ESCALATION_TO_EXEC_AFTER")
                .unwrap_or(defaults.escalation_to_exec_after),
            walkaway_override: env_bool("WALKAWAY_MODE"),
            walkaway_max_skips: env_u64("WALKAWAY_MAX_SKIPS")
                .map(|v| v as u32)
                .unwrap_or(defaults.walkaway_max_skips),
            smart_retry: env_bool("SMART_RETRY").unwrap_or(defaults.smart_retry),
            approach_history_max: env_usize("APPROACH_HISTORY_MAX")
                .unwrap_or(defaults.approach_history_max),
            session_failures_max: env_usize("SESSION_FAILURES_MAX")
                .unwrap_or(defaults.session_failures_max),
            error_patterns: env_string("ERROR_PATTERNS"),
            status_file: env_path("STATUS_FILE"),
            events_file: env_path("EVENTS_FILE"),
            command_file: env_path("COMMAND_FILE"),
            command_poll: env_u64("COMMAND_POLL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.command_poll),
            command_wait: match env_u64("COMMAND_WAIT_SECONDS") {
                Some(0) => None, // 0 means wait forever
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.command_wait,
            },
            scoped_observers: env_bool("SCOPED_OBSERVERS").unwrap_or(defaults.scoped_observers),
            modules_dir: env_path("MODULES_DIR"),
            modules: env_string("MODULES")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            module_timeout: env_u64("MODULE_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.module_timeout),
            prompts_dir: env_path("PROMPTS_DIR"),
            team_learnings: env_path("TEAM_LEARNINGS"),
            codebase_map: env_path("CODEBASE_MAP"),
            verify_timeout: env_u64("VERIFY_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.verify_timeout),
            heartbeat_interval: env_u64("HEARTBEAT_INTERVAL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            lock_stale_age: env_u64("LOCK_STALE_AGE_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_stale_age),
            lock_timeout: env_u64("LOCK_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_timeout),
            force_lock: env_bool("FORCE_LOCK").unwrap_or(false),
            activity_log: env_path("ACTIVITY_LOG"),
            activity_interval: env_u64("ACTIVITY_INTERVAL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.activity_interval),
            attention_after: env_u64("ATTENTION_AFTER_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.attention_after),
            executive_review: env_bool("EXECUTIVE_REVIEW").unwrap_or(defaults.executive_review),
            review_junior_only: env_bool("REVIEW_JUNIOR_ONLY")
                .unwrap_or(defaults.review_junior_only),
            quiet: env_bool("QUIET").unwrap_or(defaults.quiet),
            worker_log_dir: env_path("WORKER_LOG_DIR"),
        }
    }

    /// Whether walkaway is in effect for a PRD with the given flag.
    pub fn walkaway(&self, prd_walkaway: bool) -> bool {
        self.walkaway_override.unwrap_or(prd_walkaway)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Empty string means "explicitly disabled", same as unset.
fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|s| s.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_string(key).and_then(|s| s.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|s| {
        matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
