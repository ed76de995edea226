// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for locking and state persistence.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("lock {path} held by pid {holder} (timed out after {waited_secs}s)")]
    LockTimeout {
        path: PathBuf,
        holder: String,
        waited_secs: u64,
    },

    #[error("lock {path} not held")]
    LockNotHeld { path: PathBuf },

    #[error("state io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state parse at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("state serialize: {0}")]
    Serialize(#[source] serde_json::Error),
}
