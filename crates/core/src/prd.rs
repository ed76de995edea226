// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Product Requirements Document: a DAG of tasks with acceptance
//! criteria and optional verification commands.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;

use crate::tier::Tier;

#[derive(Debug, Error)]
pub enum PrdError {
    #[error("failed to read PRD {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PRD {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("PRD has no tasks")]
    EmptyTasks,

    #[error("duplicate task id '{0}'")]
    DuplicateId(String),

    #[error("task '{task}' depends on unknown task '{dep}'")]
    UnknownDependency { task: String, dep: String },

    #[error("dependency cycle involving task '{0}'")]
    CircularDependency(String),

    #[error("task '{0}' has no acceptance criteria")]
    NoAcceptanceCriteria(String),

    #[error("task filter excludes '{dep}', required by included task '{task}'")]
    FilterExcludesDependency { task: String, dep: String },

    #[error("unknown task id '{0}'")]
    UnknownTask(String),
}

/// Task complexity tag, mapped to a starting tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Junior,
    Senior,
    Auto,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Auto
    }
}

impl Complexity {
    /// The tier a task of this complexity starts at.
    ///
    /// `auto` starts at line and relies on escalation to find the right
    /// tier rather than guessing up front.
    pub fn starting_tier(&self) -> Tier {
        match self {
            Self::Senior => Tier::Sous,
            Self::Junior | Self::Auto => Tier::Line,
        }
    }
}

/// Verification command type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationType {
    Pattern,
    Unit,
    Integration,
    Smoke,
}

crate::simple_display! {
    VerificationType {
        Pattern => "pattern",
        Unit => "unit",
        Integration => "integration",
        Smoke => "smoke",
    }
}

/// A verification entry: either a bare command string (legacy shorthand)
/// or a command with a type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationEntry {
    Command(String),
    Detailed {
        cmd: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<VerificationType>,
    },
}

impl VerificationEntry {
    pub fn cmd(&self) -> &str {
        match self {
            Self::Command(cmd) => cmd,
            Self::Detailed { cmd, .. } => cmd,
        }
    }

    pub fn kind(&self) -> Option<VerificationType> {
        match self {
            Self::Command(_) => None,
            Self::Detailed { kind, .. } => *kind,
        }
    }

    /// Whether this entry only greps for a pattern instead of executing
    /// the thing it is meant to verify.
    pub fn is_pattern_only(&self) -> bool {
        if self.kind() == Some(VerificationType::Pattern) {
            return true;
        }
        let first = self.cmd().trim_start().split_whitespace().next().unwrap_or("");
        matches!(first, "grep" | "egrep" | "fgrep" | "rg")
    }
}

/// A unit of work with acceptance criteria and optional verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub passes: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification: Vec<VerificationEntry>,
    #[serde(default)]
    pub manual_verification: bool,
}

/// Non-fatal finding from full validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lint {
    pub task_id: String,
    pub message: String,
}

/// A PRD: feature metadata plus the ordered task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prd {
    pub feature_name: String,
    pub branch_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub walkaway: bool,
    pub tasks: Vec<Task>,
}

impl Prd {
    /// Load a PRD from a JSON file.
    pub fn load(path: &Path) -> Result<Prd, PrdError> {
        let text = std::fs::read_to_string(path).map_err(|source| PrdError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PrdError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Mark a task as passing (in-memory only; used to project the done
    /// set recorded in state onto the task list).
    pub fn mark_passes(&mut self, id: &str) {
        if let Some(task) = self.task_mut(id) {
            task.passes = true;
        }
    }

    /// Topological order over task ids (Kahn's algorithm).
    ///
    /// Ties resolve in declaration order so runs are reproducible.
    pub fn topological_order(&self) -> Result<Vec<String>, PrdError> {
        let ids: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in &self.tasks {
            in_degree.entry(task.id.as_str()).or_insert(0);
            for dep in &task.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(PrdError::UnknownDependency {
                        task: task.id.clone(),
                        dep: dep.clone(),
                    });
                }
                *in_degree.entry(task.id.as_str()).or_insert(0) += 1;
                dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
            }
        }

        let mut queue: VecDeque<&str> = self
            .tasks
            .iter()
            .filter(|t| in_degree.get(t.id.as_str()) == Some(&0))
            .map(|t| t.id.as_str())
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for dependent in dependents.get(id).into_iter().flatten() {
                let degree = in_degree.entry(dependent).or_insert(0);
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck = self
                .tasks
                .iter()
                .find(|t| !order.iter().any(|id| id == &t.id))
                .map(|t| t.id.clone())
                .unwrap_or_default();
            return Err(PrdError::CircularDependency(stuck));
        }
        Ok(order)
    }

    pub fn has_circular_dependency(&self) -> bool {
        matches!(self.topological_order(), Err(PrdError::CircularDependency(_)))
    }

    /// Tasks eligible for execution: not done and every dependency done.
    ///
    /// `done` must include everything that satisfies dependents, not just
    /// successes — the scheduler passes completed ∪ absorbed ∪ skipped.
    pub fn ready_tasks(&self, done: &HashSet<String>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| !t.passes && !done.contains(&t.id))
            .filter(|t| t.depends_on.iter().all(|dep| done.contains(dep) || self.task(dep).map(|d| d.passes).unwrap_or(false)))
            .collect()
    }

    /// Tasks not yet done.
    pub fn pending_tasks(&self, done: &HashSet<String>) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.passes && !done.contains(&t.id)).collect()
    }

    /// (done, total) progress counts.
    pub fn progress(&self, done: &HashSet<String>) -> (usize, usize) {
        let done_count =
            self.tasks.iter().filter(|t| t.passes || done.contains(&t.id)).count();
        (done_count, self.tasks.len())
    }

    pub fn is_complete(&self, done: &HashSet<String>) -> bool {
        let (done_count, total) = self.progress(done);
        done_count == total
    }

    /// Structural validation. Mandatory before execution.
    pub fn validate_quick(&self) -> Result<(), PrdError> {
        if self.tasks.is_empty() {
            return Err(PrdError::EmptyTasks);
        }
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(PrdError::DuplicateId(task.id.clone()));
            }
            if task.acceptance_criteria.is_empty() {
                return Err(PrdError::NoAcceptanceCriteria(task.id.clone()));
            }
        }
        for task in &self.tasks {
            for dep in &task.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(PrdError::UnknownDependency {
                        task: task.id.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }
        // Surfaces cycles; unknown deps were caught above.
        self.topological_order()?;
        Ok(())
    }

    /// Full validation: quick checks plus lints on criteria phrasing and
    /// verification-type-vs-title mismatches.
    pub fn validate_full(&self) -> Result<Vec<Lint>, PrdError> {
        self.validate_quick()?;
        let mut lints = Vec::new();
        for task in &self.tasks {
            for criterion in &task.acceptance_criteria {
                let words = criterion.split_whitespace().count();
                if words < 3 {
                    lints.push(Lint {
                        task_id: task.id.clone(),
                        message: format!("acceptance criterion too vague: {criterion:?}"),
                    });
                }
            }
            let title = task.title.to_ascii_lowercase();
            let has_unit = task
                .verification
                .iter()
                .any(|v| v.kind() == Some(VerificationType::Unit));
            if title.contains("test") && !task.verification.is_empty() && !has_unit {
                lints.push(Lint {
                    task_id: task.id.clone(),
                    message: "title mentions tests but no unit verification declared".to_string(),
                });
            }
            if !task.verification.is_empty()
                && task.verification.iter().all(|v| v.is_pattern_only())
            {
                lints.push(Lint {
                    task_id: task.id.clone(),
                    message: "verification only greps for patterns, nothing is executed"
                        .to_string(),
                });
            }
        }
        Ok(lints)
    }

    /// Validate a partial-execution filter: every included task's
    /// dependencies must be included too, or already passing.
    pub fn validate_filter(&self, include: &[String]) -> Result<(), PrdError> {
        let included: HashSet<&str> = include.iter().map(|s| s.as_str()).collect();
        for id in include {
            let task = self.task(id).ok_or_else(|| PrdError::UnknownTask(id.clone()))?;
            for dep in &task.depends_on {
                let dep_ok = included.contains(dep.as_str())
                    || self.task(dep).map(|d| d.passes).unwrap_or(false);
                if !dep_ok {
                    return Err(PrdError::FilterExcludesDependency {
                        task: id.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether every declared verification across the PRD is pattern-only.
    ///
    /// Walkaway mode refuses such PRDs: nothing real would gate acceptance.
    pub fn verification_is_grep_only(&self) -> bool {
        let mut any = false;
        for task in &self.tasks {
            for entry in &task.verification {
                any = true;
                if !entry.is_pattern_only() {
                    return false;
                }
            }
        }
        any
    }
}

/// Derive the observer-file prefix from a PRD filename:
/// `prd-add-auth.json` → `add-auth`.
pub fn prefix_from_path(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("prd");
    stem.strip_prefix("prd-").unwrap_or(stem).to_string()
}

/// Detected project stack, used to seed verification suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stack {
    Rust,
    Node,
    Go,
    Python,
}

crate::simple_display! {
    Stack {
        Rust => "rust",
        Node => "node",
        Go => "go",
        Python => "python",
    }
}

impl Stack {
    /// Probe a project directory for well-known build files.
    pub fn detect(dir: &Path) -> Option<Stack> {
        if dir.join("Cargo.toml").exists() {
            Some(Self::Rust)
        } else if dir.join("package.json").exists() {
            Some(Self::Node)
        } else if dir.join("go.mod").exists() {
            Some(Self::Go)
        } else if dir.join("pyproject.toml").exists() || dir.join("setup.py").exists() {
            Some(Self::Python)
        } else {
            None
        }
    }

    /// Suggested verification commands for this stack.
    pub fn suggested_verification(&self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["cargo check", "cargo test"],
            Self::Node => &["npm test"],
            Self::Go => &["go build ./...", "go test ./..."],
            Self::Python => &["pytest"],
        }
    }
}

#[cfg(test)]
#[path = "prd_tests.rs"]
mod tests;
