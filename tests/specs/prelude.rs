// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: temp workspaces, mock worker scripts, orchestrator
//! wiring.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use brigade_adapters::{Worker, WorkerFactory, WorkerSpec};
use brigade_core::Tier;
use brigade_engine::{Config, Orchestrator};

pub struct Scenario {
    pub dir: tempfile::TempDir,
}

impl Scenario {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn prd_path(&self) -> PathBuf {
        self.path().join("prd-demo.json")
    }

    /// Write a PRD named `demo` with the given tasks.
    pub fn write_prd(&self, tasks: serde_json::Value) {
        let prd = serde_json::json!({
            "featureName": "demo",
            "branchName": "feature/demo",
            "walkaway": false,
            "tasks": tasks,
        });
        std::fs::write(
            self.prd_path(),
            serde_json::to_string_pretty(&prd).unwrap(),
        )
        .unwrap();
    }

    /// Write an executable mock worker. The prompt arrives as the final
    /// argument; `$SELF_DIR` points at the scenario directory.
    pub fn write_worker(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        let script = format!(
            "#!/bin/sh\nSELF_DIR={}\n{}\n",
            shell_quote(self.path()),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Config with observer files in the scenario dir, unscoped for
    /// simpler assertions.
    pub fn config(&self) -> Config {
        Config {
            events_file: Some(self.path().join("events.jsonl")),
            status_file: Some(self.path().join("status.json")),
            scoped_observers: false,
            lock_timeout: Duration::from_millis(500),
            ..Config::default()
        }
    }

    /// Build CLI workers from script paths, with a short timeout.
    pub fn workers(
        &self,
        scripts: &[(Tier, &Path)],
        timeout: Duration,
    ) -> HashMap<Tier, Arc<dyn Worker>> {
        let mut specs = HashMap::new();
        for (tier, path) in scripts {
            specs.insert(
                *tier,
                WorkerSpec {
                    command: path.display().to_string(),
                    timeout,
                    env: Vec::new(),
                    cwd: None,
                },
            );
        }
        let factory = WorkerFactory::new(specs.clone());
        let mut workers = HashMap::new();
        for tier in specs.keys() {
            workers.insert(*tier, factory.worker(*tier).unwrap());
        }
        workers
    }

    pub async fn orchestrator(
        &self,
        config: Config,
        workers: HashMap<Tier, Arc<dyn Worker>>,
    ) -> Arc<Orchestrator> {
        Orchestrator::new(self.prd_path(), config, workers, CancellationToken::new())
            .await
            .unwrap()
    }

    pub fn events(&self) -> Vec<serde_json::Value> {
        let text = std::fs::read_to_string(self.path().join("events.jsonl")).unwrap();
        text.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|v| v["type"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn state(&self) -> brigade_core::SessionState {
        let path = brigade_storage::state_path_for(&self.prd_path());
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}

pub fn task(id: &str, deps: &[&str], complexity: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Task {id}"),
        "acceptanceCriteria": ["does the right thing"],
        "dependsOn": deps,
        "complexity": complexity,
        "passes": false,
    })
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display())
}
