// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! brigade-adapters: everything that touches a child process.
//!
//! The worker harness (spawn, capture, timeout, liveness, exit mapping),
//! the verification runner, and the notification-module dispatcher. The
//! engine drives these through the [`Worker`] trait and small structs; no
//! orchestration policy lives here.

mod command;
mod error;
mod modules;
mod spawn;
mod verify;
mod worker;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use command::{parse_base_command, shape_invocation, BaseCommand, ToolKind};
pub use error::WorkerError;
pub use modules::{Module, ModuleManager};
pub use spawn::{run_child, RawExit, SpawnSpec};
pub use verify::{VerifyCommandResult, Verifier, VerifyOutcome};
pub use worker::{
    CliWorker, ExecContext, Worker, WorkerFactory, WorkerResult, WorkerSpec, EXIT_ABSORBED,
    EXIT_ALREADY_DONE, EXIT_BLOCKED,
};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorker;
