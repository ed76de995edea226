// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process execution: spawn, capture interleaved output, enforce the
//! deadline, probe liveness, and map the exit.
//!
//! Children run in their own process group so a timeout or cancellation
//! kills the whole tree, not just the immediate child.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// How often the liveness ticker probes the child.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(5);

/// Everything needed to run one child to completion.
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub cancel: CancellationToken,
    /// Tee captured output to this file when set.
    pub log_path: Option<PathBuf>,
    /// Echo captured output to our own stdout unless set.
    pub quiet: bool,
    /// Updated on every captured chunk; drives the attention heuristic.
    pub last_output: Option<Arc<Mutex<Instant>>>,
}

/// Raw outcome of one child run, before promise interpretation.
#[derive(Debug, Clone)]
pub struct RawExit {
    /// Combined stdout+stderr in arrival order.
    pub output: String,
    /// None when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub timeout: bool,
    pub crashed: bool,
    pub duration: Duration,
}

/// Run a child process to completion under deadline and cancellation.
pub async fn run_child(spec: SpawnSpec) -> Result<RawExit, WorkerError> {
    let started = Instant::now();

    let mut command = tokio::process::Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0);
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    if let Some(ref cwd) = spec.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| WorkerError::SpawnFailed {
        program: spec.program.clone(),
        source,
    })?;
    let pid = child.id();

    let buffer: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));
    let log_file = match &spec.log_path {
        Some(path) => Some(
            std::fs::OpenOptions::new().create(true).append(true).open(path)?,
        ),
        None => None,
    };
    let log_file = log_file.map(|f| Arc::new(Mutex::new(f)));

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(drain_lines(
            BufReader::new(stdout).lines(),
            Arc::clone(&buffer),
            log_file.clone(),
            spec.last_output.clone(),
            spec.quiet,
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(drain_lines(
            BufReader::new(stderr).lines(),
            Arc::clone(&buffer),
            log_file.clone(),
            spec.last_output.clone(),
            spec.quiet,
        )));
    }

    let deadline = tokio::time::sleep(spec.timeout);
    tokio::pin!(deadline);
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);
    liveness.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    liveness.tick().await; // immediate first tick

    let mut timed_out = false;
    let mut vanished = false;
    let status = loop {
        tokio::select! {
            status = child.wait() => break Some(status?),
            () = &mut deadline => {
                tracing::warn!(program = %spec.program, timeout_secs = spec.timeout.as_secs(), "worker deadline elapsed, killing");
                timed_out = true;
                kill_group(pid);
                break Some(child.wait().await?);
            }
            () = spec.cancel.cancelled() => {
                kill_group(pid);
                let _ = child.wait().await;
                for reader in &readers {
                    reader.abort();
                }
                return Err(WorkerError::Cancelled);
            }
            _ = liveness.tick() => {
                if let Some(pid) = pid {
                    if !pid_alive(pid) && !vanished {
                        vanished = true;
                        tracing::warn!(program = %spec.program, pid, "worker vanished before orderly exit");
                    }
                }
            }
        }
    };

    // Drain whatever output is still buffered before reading the capture.
    for reader in readers {
        let _ = reader.await;
    }

    let exit_code = status.as_ref().and_then(|s| s.code());
    let crashed = !timed_out && exit_code.is_none();
    let output = buffer.lock().clone();
    Ok(RawExit {
        output,
        exit_code,
        timeout: timed_out,
        crashed,
        duration: started.elapsed(),
    })
}

async fn drain_lines<R>(
    mut lines: tokio::io::Lines<BufReader<R>>,
    buffer: Arc<Mutex<String>>,
    log_file: Option<Arc<Mutex<std::fs::File>>>,
    last_output: Option<Arc<Mutex<Instant>>>,
    quiet: bool,
) where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
{
    use std::io::Write;
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(ref seen) = last_output {
            *seen.lock() = Instant::now();
        }
        if let Some(ref file) = log_file {
            let _ = writeln!(file.lock(), "{line}");
        }
        if !quiet {
            println!("{line}");
        }
        let mut buffer = buffer.lock();
        buffer.push_str(&line);
        buffer.push('\n');
    }
}

/// Kill the child's whole process group, falling back to the pid itself.
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;
    if killpg(Pid::from_raw(pid), Signal::SIGKILL).is_err() {
        let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

/// Probe a pid with a no-op signal. EPERM still means alive.
fn pid_alive(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
