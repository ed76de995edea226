// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-based lock with heartbeat and stale-owner recovery.
//!
//! Atomic directory creation is the only widely-portable exclusive
//! filesystem primitive, so the lock is a directory; a small JSON document
//! inside records the holder's pid and last heartbeat. Legacy bare-integer
//! pid files are still readable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use brigade_core::{Clock, SystemClock};

use crate::error::StorageError;

/// Name of the holder document inside the lock directory.
const PID_FILE: &str = "pid";

/// How often acquisition re-checks a held lock.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tuning for staleness detection.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Expected heartbeat cadence; twice this without a beat is stale.
    pub heartbeat_interval: Duration,
    /// Directory mtime older than this is stale regardless of heartbeat.
    pub stale_age: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            stale_age: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    heartbeat: u64,
}

/// A named lock over a filesystem path.
pub struct DirLock<C: Clock = SystemClock> {
    path: PathBuf,
    config: LockConfig,
    clock: C,
    held: AtomicBool,
}

/// Derive the service-lock directory for a PRD file:
/// `prd-add-auth.json` → `prd-add-auth.service.lock/`.
pub fn lock_path_for(prd_path: &Path) -> PathBuf {
    let stem = prd_path.file_stem().and_then(|s| s.to_str()).unwrap_or("prd");
    prd_path.with_file_name(format!("{stem}.service.lock"))
}

impl DirLock<SystemClock> {
    pub fn new(path: PathBuf, config: LockConfig) -> Self {
        Self::with_clock(path, config, SystemClock)
    }
}

impl<C: Clock> DirLock<C> {
    pub fn with_clock(path: PathBuf, config: LockConfig, clock: C) -> Self {
        Self { path, config, clock, held: AtomicBool::new(false) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Acquire, polling until `timeout`. A stale lock is removed (after
    /// re-confirming the recorded pid is dead) and acquisition retried.
    pub async fn acquire(&self, timeout: Duration) -> Result<(), StorageError> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.try_acquire()? {
                return Ok(());
            }
            if self.remove_if_stale()? && self.try_acquire()? {
                return Ok(());
            }
            if std::time::Instant::now() >= deadline {
                return Err(StorageError::LockTimeout {
                    path: self.path.clone(),
                    holder: self
                        .read_info()
                        .map(|i| i.pid.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    waited_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Non-blocking acquisition attempt.
    pub fn try_acquire(&self) -> Result<bool, StorageError> {
        match std::fs::create_dir(&self.path) {
            Ok(()) => {
                self.write_info()?;
                self.held.store(true, Ordering::SeqCst);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(StorageError::Io { path: self.path.clone(), source }),
        }
    }

    /// Unconditionally remove any prior lock, then acquire.
    pub async fn acquire_force(&self, timeout: Duration) -> Result<(), StorageError> {
        if self.path.exists() {
            tracing::warn!(path = %self.path.display(), "force-removing existing lock");
            std::fs::remove_dir_all(&self.path)
                .map_err(|source| StorageError::Io { path: self.path.clone(), source })?;
        }
        self.acquire(timeout).await
    }

    pub fn release(&self) -> Result<(), StorageError> {
        if !self.held.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path: self.path.clone(), source }),
        }
    }

    /// Rewrite the holder document with a fresh heartbeat timestamp.
    pub fn update_heartbeat(&self) -> Result<(), StorageError> {
        if !self.is_held() {
            return Err(StorageError::LockNotHeld { path: self.path.clone() });
        }
        self.write_info()
    }

    /// The pid recorded in the lock, as a display string.
    pub fn holder(&self) -> Option<String> {
        self.read_info().map(|i| i.pid.to_string())
    }

    fn write_info(&self) -> Result<(), StorageError> {
        let info = LockInfo { pid: std::process::id(), heartbeat: self.clock.epoch_secs() };
        let body =
            serde_json::to_string(&info).map_err(StorageError::Serialize)?;
        std::fs::write(self.path.join(PID_FILE), body)
            .map_err(|source| StorageError::Io { path: self.path.clone(), source })
    }

    fn read_info(&self) -> Option<LockInfo> {
        let text = std::fs::read_to_string(self.path.join(PID_FILE)).ok()?;
        if let Ok(info) = serde_json::from_str::<LockInfo>(&text) {
            return Some(info);
        }
        // Legacy bare-integer pid file; heartbeat unknown.
        text.trim().parse::<u32>().ok().map(|pid| LockInfo { pid, heartbeat: 0 })
    }

    /// Remove the lock if stale. Returns whether a removal happened.
    ///
    /// Removal re-confirms the recorded pid is dead right before acting,
    /// so a holder whose heartbeat merely stalled is left alone.
    fn remove_if_stale(&self) -> Result<bool, StorageError> {
        let info = self.read_info();
        let stale = match &info {
            Some(info) => {
                !pid_alive(info.pid)
                    || (info.heartbeat > 0 && self.heartbeat_expired(info.heartbeat))
                    || self.mtime_expired()
            }
            // Unreadable holder document: only the mtime rule applies.
            None => self.mtime_expired(),
        };
        if !stale {
            return Ok(false);
        }
        if let Some(info) = info {
            if pid_alive(info.pid) {
                return Ok(false);
            }
        }
        tracing::warn!(path = %self.path.display(), "removing stale lock");
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(source) => Err(StorageError::Io { path: self.path.clone(), source }),
        }
    }

    fn heartbeat_expired(&self, heartbeat: u64) -> bool {
        let now = self.clock.epoch_secs();
        now.saturating_sub(heartbeat) > 2 * self.config.heartbeat_interval.as_secs()
    }

    fn mtime_expired(&self) -> bool {
        let Ok(meta) = std::fs::metadata(&self.path) else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .map(|age| age > self.config.stale_age)
            .unwrap_or(false)
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
#[path = "lock_tests.rs"]
mod tests;
