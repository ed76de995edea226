// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event stream, flushed after every record.

use std::io::Write;
use std::path::PathBuf;

use parking_lot::Mutex;

use brigade_core::Event;

pub struct EventWriter {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl EventWriter {
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one envelope line and flush it to disk.
    pub fn append(&self, event: &Event) -> std::io::Result<()> {
        let line = event.envelope(&chrono::Utc::now().to_rfc3339()).to_string();
        let mut file = self.file.lock();
        writeln!(file, "{line}")?;
        file.flush()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
