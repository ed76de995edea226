// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic load/save of the session state document.
//!
//! Saves write a sibling temp file, flush it, and rename over the target,
//! so a crash mid-save leaves either the old document or the new one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use brigade_core::SessionState;

use crate::error::StorageError;
use crate::lock::DirLock;

/// Derive the state file for a PRD file:
/// `prd-add-auth.json` → `prd-add-auth.state.json`.
pub fn state_path_for(prd_path: &Path) -> PathBuf {
    let stem = prd_path.file_stem().and_then(|s| s.to_str()).unwrap_or("prd");
    prd_path.with_file_name(format!("{stem}.state.json"))
}

/// Two-operation store over one PRD's state document.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_prd(prd_path: &Path) -> Self {
        Self::new(state_path_for(prd_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or create a fresh one if the file is absent.
    ///
    /// Optional arrays absent from older documents come back empty via
    /// serde defaults; the next save persists them.
    pub fn load_or_create(&self) -> Result<SessionState, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|source| StorageError::Parse { path: self.path.clone(), source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(SessionState::new(chrono::Utc::now()))
            }
            Err(source) => Err(StorageError::Io { path: self.path.clone(), source }),
        }
    }

    /// Atomically replace the document on disk.
    pub fn save(&self, state: &SessionState) -> Result<(), StorageError> {
        let body =
            serde_json::to_string_pretty(state).map_err(StorageError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)
                .map_err(|source| StorageError::Io { path: tmp.clone(), source })?;
            file.write_all(body.as_bytes())
                .map_err(|source| StorageError::Io { path: tmp.clone(), source })?;
            file.sync_all()
                .map_err(|source| StorageError::Io { path: tmp.clone(), source })?;
        }
        std::fs::rename(&tmp, &self.path)
            .map_err(|source| StorageError::Io { path: self.path.clone(), source })
    }

    /// Acquire `lock`, load, mutate via `f`, save, release.
    ///
    /// For one-shot mutations from outside a running orchestrator; the
    /// orchestrator itself holds the service lock for its whole run.
    pub async fn update<F>(
        &self,
        lock: &DirLock,
        timeout: Duration,
        f: F,
    ) -> Result<SessionState, StorageError>
    where
        F: FnOnce(&mut SessionState),
    {
        lock.acquire(timeout).await?;
        let result = (|| -> Result<SessionState, StorageError> {
            let mut state = self.load_or_create()?;
            f(&mut state);
            self.save(&state)?;
            Ok(state)
        })();
        let released = lock.release();
        let state = result?;
        released?;
        Ok(state)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
