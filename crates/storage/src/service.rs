// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ServiceLock: a held [`DirLock`] plus its background heartbeat.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::StorageError;
use crate::lock::{DirLock, LockConfig};

/// One orchestrator's exclusive claim on a PRD, kept fresh by a
/// background heartbeat task until released.
pub struct ServiceLock {
    lock: Arc<DirLock>,
    interval: Duration,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceLock {
    /// Acquire the lock and start heartbeating.
    pub async fn acquire(
        path: PathBuf,
        config: LockConfig,
        force: bool,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let interval = config.heartbeat_interval;
        let lock = Arc::new(DirLock::new(path, config));
        if force {
            lock.acquire_force(timeout).await?;
        } else {
            lock.acquire(timeout).await?;
        }
        let service = Self { lock, interval, heartbeat: Mutex::new(None) };
        service.start_heartbeat();
        Ok(service)
    }

    /// Idempotent: a running heartbeat is left alone.
    pub fn start_heartbeat(&self) {
        let mut guard = self.heartbeat.lock();
        if guard.is_some() {
            return;
        }
        let lock = Arc::clone(&self.lock);
        let interval = self.interval;
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately; skip it so the acquire
            // timestamp stands until a full interval has passed.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = lock.update_heartbeat() {
                    tracing::warn!(%error, "heartbeat update failed");
                    return;
                }
            }
        }));
    }

    /// Stop the heartbeat and release the lock. Idempotent.
    pub fn release(&self) -> Result<(), StorageError> {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }
        self.lock.release()
    }

    pub fn dir_lock(&self) -> &DirLock {
        &self.lock
    }
}

impl Drop for ServiceLock {
    fn drop(&mut self) {
        // Last resort; orderly shutdown calls release() explicitly.
        let _ = self.release();
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
