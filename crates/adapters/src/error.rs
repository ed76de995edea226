// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for worker execution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("empty worker command for tier {0}")]
    EmptyCommand(String),

    #[error("failed to spawn worker '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker io: {0}")]
    Io(#[from] std::io::Error),

    #[error("execution cancelled")]
    Cancelled,
}
