// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Prd(#[from] brigade_core::PrdError),

    #[error(transparent)]
    Storage(#[from] brigade_storage::StorageError),

    #[error(transparent)]
    Worker(#[from] brigade_adapters::WorkerError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocked: no ready tasks but {pending} tasks remain")]
    NoReadyTasks { pending: usize },

    #[error("walkaway mode refused: verification is pattern-checks only")]
    WalkawayGrepOnly,

    #[error("task '{task}' aborted: {reason}")]
    Aborted { task: String, reason: String },

    #[error("consecutive skip limit reached ({count})")]
    SkipLimit { count: u32 },

    #[error("task '{task}' needs a decision and no decision source is available")]
    DecisionUnavailable { task: String },

    #[error("unknown task id '{0}'")]
    UnknownTask(String),

    #[error("run cancelled")]
    Cancelled,
}
