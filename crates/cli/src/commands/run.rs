// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `brigade run`: execute a PRD end-to-end, or one task of it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;

use brigade_adapters::{Worker, WorkerFactory};
use brigade_core::Tier;
use brigade_engine::{Config, EngineError, Orchestrator};

use crate::exit;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the PRD JSON file
    pub prd: PathBuf,

    /// Execute only this task; mirrors worker exit codes 32/33/34
    #[arg(long)]
    pub task: Option<String>,

    /// Remove any existing service lock before acquiring
    #[arg(long)]
    pub force: bool,

    /// Do not echo worker output
    #[arg(long)]
    pub quiet: bool,

    /// Override MAX_PARALLEL for this run
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

pub async fn run(args: RunArgs) -> i32 {
    match run_inner(args).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(%error, "run failed");
            eprintln!("error: {error:#}");
            exit::FAILURE
        }
    }
}

async fn run_inner(args: RunArgs) -> anyhow::Result<i32> {
    let mut config = Config::from_env();
    config.force_lock |= args.force;
    config.quiet |= args.quiet;
    if let Some(max_parallel) = args.max_parallel {
        config.max_parallel = max_parallel.max(1);
    }

    let workers = build_workers(&config)?;
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let orchestrator =
        Orchestrator::new(args.prd.clone(), config, workers, cancel).await?;

    match args.task {
        Some(task_id) => {
            let outcome = orchestrator.run_single(&task_id).await?;
            println!("task {task_id}: {outcome:?}");
            Ok(exit::for_outcome(&outcome))
        }
        None => match orchestrator.run().await {
            Ok(summary) => {
                println!("done: {}/{} tasks", summary.done, summary.total);
                Ok(exit::SUCCESS)
            }
            Err(EngineError::Cancelled) => {
                eprintln!("cancelled");
                Ok(exit::FAILURE)
            }
            Err(error) => Err(error.into()),
        },
    }
}

fn build_workers(config: &Config) -> anyhow::Result<HashMap<Tier, Arc<dyn Worker>>> {
    if config.workers.is_empty() {
        anyhow::bail!(
            "no worker commands configured; set LINE_COMMAND (and optionally \
             SOUS_COMMAND, EXECUTIVE_COMMAND)"
        );
    }
    let factory = WorkerFactory::new(config.workers.clone());
    let mut workers = HashMap::new();
    for tier in [Tier::Line, Tier::Sous, Tier::Executive] {
        if config.workers.contains_key(&tier) {
            workers.insert(tier, factory.worker(tier)?);
        }
    }
    Ok(workers)
}

/// Cancel the run on SIGINT or SIGTERM; children die with the context.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(term) => term,
                Err(error) => {
                    tracing::warn!(%error, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    cancel.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("shutdown signal received");
        cancel.cancel();
    });
}
