// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor I/O: the status/events/commands file triad.
//!
//! All channels are optional and per-PRD scope-able. The status file is a
//! one-writer atomic snapshot, the events file an append-only JSONL
//! stream, and the command file a consumed-on-read mailbox.

mod command;
mod events;
mod status;

pub use command::{Command, CommandAction, CommandReader};
pub use events::EventWriter;
pub use status::{StatusSnapshot, StatusWriter};

use std::path::{Path, PathBuf};

/// Insert the PRD prefix before the configured base filename:
/// `status.json` + `add-auth` → `add-auth-status.json`, same directory.
pub fn scoped_path(path: &Path, prefix: &str, scoped: bool) -> PathBuf {
    if !scoped || prefix.is_empty() {
        return path.to_path_buf();
    }
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("observer");
    path.with_file_name(format!("{prefix}-{name}"))
}
