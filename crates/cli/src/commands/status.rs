// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `brigade status`: human-readable progress from the PRD and its state.

use std::path::PathBuf;

use clap::Args;

use brigade_core::{Prd, SessionState};
use brigade_storage::state_path_for;

use crate::exit;

#[derive(Args)]
pub struct StatusArgs {
    /// Path to the PRD JSON file
    pub prd: PathBuf,
}

pub fn run(args: StatusArgs) -> i32 {
    let prd = match Prd::load(&args.prd) {
        Ok(prd) => prd,
        Err(error) => {
            eprintln!("error: {error}");
            return exit::FAILURE;
        }
    };

    let state_path = state_path_for(&args.prd);
    let state: Option<SessionState> = std::fs::read_to_string(&state_path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());

    let (completed, skipped) = match &state {
        Some(state) => (state.completed_ids(), state.skipped_ids()),
        None => Default::default(),
    };
    let (done, total) = prd.progress(&completed);

    println!("{} ({})", prd.feature_name, prd.branch_name);
    println!("progress: {done}/{total}");
    for task in &prd.tasks {
        let marker = if task.passes || completed.contains(&task.id) {
            "done"
        } else if skipped.contains(&task.id) {
            "skipped"
        } else {
            "pending"
        };
        println!("  [{marker:>7}] {}: {}", task.id, task.title);
    }
    if let Some(state) = &state {
        if let Some(ref current) = state.current_task {
            println!("current: {current}");
        }
        if !state.escalations.is_empty() {
            println!("escalations: {}", state.escalations.len());
        }
    }
    exit::SUCCESS
}
