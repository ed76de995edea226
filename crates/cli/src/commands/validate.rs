// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `brigade validate`: structural and (optionally) full PRD validation.

use std::path::PathBuf;

use clap::Args;

use brigade_core::Prd;

use crate::exit;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the PRD JSON file
    pub prd: PathBuf,

    /// Also lint acceptance criteria and verification declarations
    #[arg(long)]
    pub full: bool,
}

pub fn run(args: ValidateArgs) -> i32 {
    let prd = match Prd::load(&args.prd) {
        Ok(prd) => prd,
        Err(error) => {
            eprintln!("error: {error}");
            return exit::FAILURE;
        }
    };

    if args.full {
        match prd.validate_full() {
            Ok(lints) if lints.is_empty() => {
                println!("ok: {} tasks, no lint findings", prd.tasks.len());
                exit::SUCCESS
            }
            Ok(lints) => {
                for lint in &lints {
                    println!("lint [{}]: {}", lint.task_id, lint.message);
                }
                println!("ok with {} lint finding(s)", lints.len());
                exit::SUCCESS
            }
            Err(error) => {
                eprintln!("error: {error}");
                exit::FAILURE
            }
        }
    } else {
        match prd.validate_quick() {
            Ok(()) => {
                println!("ok: {} tasks", prd.tasks.len());
                exit::SUCCESS
            }
            Err(error) => {
                eprintln!("error: {error}");
                exit::FAILURE
            }
        }
    }
}
