// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification modules: external executables subscribed to events.
//!
//! Modules are opaque: the loader probes each for its event list and gives
//! it a chance to self-disable; dispatch serializes the event envelope onto
//! stdin. Module failures are logged and never fail the orchestrator.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use brigade_core::{Event, EVENT_TYPES};

/// Filename candidates probed for a declared module name, in order.
const CANDIDATE_EXTENSIONS: &[&str] = &["", ".sh", ".py", ".rb", ".js"];

/// Deadline for the `--events` and `--init` probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One loaded notification module.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub events: HashSet<String>,
    /// `MODULE_<NAME>_<KEY>` pairs found in our environment, passed
    /// through explicitly on every invocation.
    pub env: Vec<(String, String)>,
}

impl Module {
    pub fn handles(&self, event_type: &str) -> bool {
        self.events.contains(event_type)
    }
}

/// Loads modules and dispatches events to them.
pub struct ModuleManager {
    modules: Vec<Module>,
    timeout: Duration,
    running: Mutex<Vec<JoinHandle<()>>>,
}

impl ModuleManager {
    /// A manager with no modules; dispatch becomes a no-op.
    pub fn disabled() -> Self {
        Self { modules: Vec::new(), timeout: PROBE_TIMEOUT, running: Mutex::new(Vec::new()) }
    }

    /// Probe and load each declared module from `dir`.
    ///
    /// A module that cannot be found, fails its probes, or declines via
    /// `--init` is skipped with a warning.
    pub async fn load(dir: &Path, names: &[String], timeout: Duration) -> Self {
        let mut modules = Vec::new();
        for name in names {
            match load_module(dir, name).await {
                Some(module) => {
                    tracing::info!(
                        module = %module.name,
                        events = module.events.len(),
                        "module loaded"
                    );
                    modules.push(module);
                }
                None => {
                    tracing::warn!(module = %name, dir = %dir.display(), "module not loaded");
                }
            }
        }
        Self { modules, timeout, running: Mutex::new(Vec::new()) }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Fire-and-forget dispatch to every subscribed module.
    pub fn dispatch(&self, event: &Event) {
        let payload = event.envelope(&chrono::Utc::now().to_rfc3339()).to_string();
        let mut running = self.running.lock();
        running.retain(|h| !h.is_finished());
        for module in self.modules.iter().filter(|m| m.handles(event.event_type())) {
            let module = module.clone();
            let payload = payload.clone();
            let event_type = event.event_type().to_string();
            let timeout = self.timeout;
            running.push(tokio::spawn(async move {
                invoke_module(&module, &event_type, &payload, timeout).await;
            }));
        }
    }

    /// Blocking dispatch for shutdown-critical events.
    pub async fn dispatch_sync(&self, event: &Event) {
        let payload = event.envelope(&chrono::Utc::now().to_rfc3339()).to_string();
        for module in self.modules.iter().filter(|m| m.handles(event.event_type())) {
            invoke_module(module, event.event_type(), &payload, self.timeout).await;
        }
    }

    /// Kill any still-running dispatches. Idempotent.
    pub fn cleanup(&self) {
        for handle in self.running.lock().drain(..) {
            handle.abort();
        }
    }
}

/// Probe candidate filenames, query `--events`, and run `--init`.
async fn load_module(dir: &Path, name: &str) -> Option<Module> {
    let path = CANDIDATE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}{ext}")))
        .find(|p| is_executable(p))?;

    let env = module_env(name);

    // Ask which events it handles; intersect with the known vocabulary.
    let output = probe(&path, "--events", &env).await?;
    if !output.status.success() {
        tracing::warn!(module = name, "--events probe failed");
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: HashSet<String> = stdout
        .split_whitespace()
        .filter(|e| EVENT_TYPES.contains(e))
        .map(str::to_string)
        .collect();
    if events.is_empty() {
        tracing::warn!(module = name, "no recognized events declared");
        return None;
    }

    // Give the module a chance to self-disable.
    let init = probe(&path, "--init", &env).await?;
    if !init.status.success() {
        tracing::info!(module = name, "module disabled itself via --init");
        return None;
    }

    Some(Module { name: name.to_string(), path, events, env })
}

async fn probe(
    path: &Path,
    flag: &str,
    env: &[(String, String)],
) -> Option<std::process::Output> {
    let mut command = tokio::process::Command::new(path);
    command.arg(flag).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    for (key, value) in env {
        command.env(key, value);
    }
    match tokio::time::timeout(PROBE_TIMEOUT, command.output()).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(error)) => {
            tracing::warn!(path = %path.display(), %error, "module probe failed");
            None
        }
        Err(_) => {
            tracing::warn!(path = %path.display(), flag, "module probe timed out");
            None
        }
    }
}

/// Run `<module> --event <type>` with the envelope on stdin.
async fn invoke_module(module: &Module, event_type: &str, payload: &str, timeout: Duration) {
    let mut command = tokio::process::Command::new(&module.path);
    command
        .arg("--event")
        .arg(event_type)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &module.env {
        command.env(key, value);
    }

    let run = async {
        let mut child = command.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes()).await?;
            drop(stdin);
        }
        child.wait_with_output().await
    };
    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) if output.status.success() => {}
        Ok(Ok(output)) => {
            tracing::warn!(
                module = %module.name,
                event = event_type,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "module dispatch failed"
            );
        }
        Ok(Err(error)) => {
            tracing::warn!(module = %module.name, event = event_type, %error, "module dispatch error");
        }
        Err(_) => {
            tracing::warn!(module = %module.name, event = event_type, "module dispatch timed out");
        }
    }
}

/// Collect `MODULE_<NAME>_<KEY>` pairs for a module name.
fn module_env(name: &str) -> Vec<(String, String)> {
    let prefix = format!("MODULE_{}_", name.to_ascii_uppercase().replace('-', "_"));
    std::env::vars().filter(|(key, _)| key.starts_with(&prefix)).collect()
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "modules_tests.rs"]
mod tests;
