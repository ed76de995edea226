// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process exit codes. Single-task runs mirror the worker's reserved
//! codes so wrappers can chain on them.

use brigade_adapters::{EXIT_ABSORBED, EXIT_ALREADY_DONE, EXIT_BLOCKED};
use brigade_engine::TaskOutcome;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;

pub fn for_outcome(outcome: &TaskOutcome) -> i32 {
    match outcome {
        TaskOutcome::Completed => SUCCESS,
        TaskOutcome::AlreadyDone => EXIT_ALREADY_DONE,
        TaskOutcome::Absorbed(_) => EXIT_ABSORBED,
        TaskOutcome::Blocked => EXIT_BLOCKED,
        TaskOutcome::Skipped => FAILURE,
    }
}
