// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt assembly: one textual prompt per worker invocation.
//!
//! A prompt is the tier's base markdown followed by the task section and
//! whatever retry/escalation context has accumulated. The executive tier
//! has three extra prompt shapes: review, walkaway decision, and scope
//! decision.

use std::fmt::Write;
use std::path::PathBuf;

use brigade_core::prd::{Prd, Task};
use brigade_core::{SessionState, Tier};

/// Inputs for a regular task prompt.
pub struct TaskPromptInputs<'a> {
    pub prd: &'a Prd,
    pub task: &'a Task,
    pub tier: Tier,
    pub state: &'a SessionState,
    /// Reason from the last failed review or verification.
    pub review_feedback: Option<&'a str>,
    /// Guidance from a supervisor command or walkaway RETRY.
    pub guidance: Option<&'a str>,
    /// Set when this attempt runs at an escalated tier.
    pub escalated_from: Option<Tier>,
}

/// Composes prompts from a base directory plus accumulated context.
pub struct PromptBuilder {
    prompts_dir: Option<PathBuf>,
    team_learnings: Option<PathBuf>,
    codebase_map: Option<PathBuf>,
    approach_history_max: usize,
    session_failures_max: usize,
    smart_retry: bool,
}

impl PromptBuilder {
    pub fn new(
        prompts_dir: Option<PathBuf>,
        team_learnings: Option<PathBuf>,
        codebase_map: Option<PathBuf>,
        approach_history_max: usize,
        session_failures_max: usize,
        smart_retry: bool,
    ) -> Self {
        Self {
            prompts_dir,
            team_learnings,
            codebase_map,
            approach_history_max,
            session_failures_max,
            smart_retry,
        }
    }

    /// The full prompt for one task attempt.
    pub fn task_prompt(&self, inputs: &TaskPromptInputs<'_>) -> String {
        let mut prompt = self.tier_base(inputs.tier);
        prompt.push_str("\n\n");
        self.push_task_section(&mut prompt, inputs.prd, inputs.task);

        if let Some(learnings) = self.read_optional(&self.team_learnings) {
            let _ = write!(prompt, "\n## Team learnings\n\n{}\n", learnings.trim_end());
        }

        if let Some(feedback) = inputs.review_feedback {
            let _ = write!(
                prompt,
                "\n## Previous review failed\n\n{}\n\nAddress this before promising completion.\n",
                feedback.trim_end()
            );
        }

        if let Some(guidance) = inputs.guidance {
            let _ = write!(prompt, "\n## Supervisor guidance\n\n{}\n", guidance.trim_end());
        }

        if self.smart_retry {
            let approaches =
                inputs.state.approaches_for(&inputs.task.id, self.approach_history_max);
            if !approaches.is_empty() {
                prompt.push_str("\n## Approaches already tried (do not repeat)\n\n");
                for approach in approaches {
                    let _ = writeln!(prompt, "- {approach}");
                }
            }

            let failures = &inputs.state.session_failures;
            if !failures.is_empty() {
                prompt.push_str("\n## Failures seen this session\n\n");
                let skip = failures.len().saturating_sub(self.session_failures_max);
                for failure in failures.iter().skip(skip) {
                    let _ = writeln!(
                        prompt,
                        "- [{}] {}: {}",
                        failure.category, failure.task_id, failure.error
                    );
                }
            }
        }

        if let Some(from) = inputs.escalated_from {
            let prior = inputs.state.approaches_below(
                &inputs.task.id,
                inputs.tier,
                self.approach_history_max,
            );
            let _ = write!(
                prompt,
                "\n## Escalation context\n\nThis task was escalated from the {from} tier.\n"
            );
            if !prior.is_empty() {
                prompt.push_str("The lower tier already tried:\n");
                for approach in prior {
                    let _ = writeln!(prompt, "- {approach}");
                }
                prompt.push_str("Do not repeat these approaches.\n");
            }
        }

        if let Some(map) = self.read_optional(&self.codebase_map) {
            let _ = write!(prompt, "\n## Codebase map\n\n{}\n", map.trim_end());
        }

        prompt
    }

    /// Executive prompt asking for a `<review>` verdict on completed work.
    pub fn executive_review(&self, prd: &Prd, task: &Task, worker_output: &str) -> String {
        let mut prompt = self.tier_base(Tier::Executive);
        prompt.push_str("\n\n## Review request\n\n");
        self.push_task_section(&mut prompt, prd, task);
        let _ = write!(
            prompt,
            "\n## Worker output under review\n\n{}\n\n\
             Judge whether every acceptance criterion is met.\n\
             Reply with <review>PASS</review> or <review>FAIL: reason</review>.\n",
            worker_output.trim_end()
        );
        prompt
    }

    /// Executive prompt asking for a walkaway RETRY/SKIP/ABORT decision.
    pub fn walkaway_decision(
        &self,
        prd: &Prd,
        task: &Task,
        reason: &str,
        attempts: usize,
        state: &SessionState,
    ) -> String {
        let mut prompt = self.tier_base(Tier::Executive);
        prompt.push_str("\n\n## Walkaway decision needed\n\n");
        self.push_task_section(&mut prompt, prd, task);
        let _ = write!(
            prompt,
            "\n## Situation\n\nFailure: {reason}\nAttempts so far: {attempts}\n"
        );
        let approaches = state.approaches_for(&task.id, self.approach_history_max);
        if !approaches.is_empty() {
            prompt.push_str("Approaches tried:\n");
            for approach in approaches {
                let _ = writeln!(prompt, "- {approach}");
            }
        }
        prompt.push_str(
            "\nDecide how to proceed. Reply with <decision>RETRY</decision>, \
             <decision>SKIP</decision>, or <decision>ABORT</decision>. \
             Optionally add <guidance>concrete advice for the next attempt</guidance>.\n",
        );
        prompt
    }

    /// Executive prompt deciding a worker's scope question autonomously.
    pub fn scope_decision(&self, prd: &Prd, task: &Task, question: &str) -> String {
        let mut prompt = self.tier_base(Tier::Executive);
        prompt.push_str("\n\n## Scope question\n\n");
        self.push_task_section(&mut prompt, prd, task);
        let _ = write!(
            prompt,
            "\nA worker asked:\n\n> {question}\n\n\
             Decide the question for them. Keep the feature's scope tight; answer in\n\
             two or three sentences of direct instruction.\n"
        );
        prompt
    }

    fn push_task_section(&self, prompt: &mut String, prd: &Prd, task: &Task) {
        let _ = write!(prompt, "## Task {}: {}\n\n", task.id, task.title);
        if let Some(ref description) = task.description {
            let _ = write!(prompt, "{}\n\n", description.trim_end());
        }
        prompt.push_str("### Acceptance criteria\n\n");
        for (index, criterion) in task.acceptance_criteria.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {criterion}", index + 1);
        }
        if !task.verification.is_empty() {
            prompt.push_str("\n### Verification commands\n\n");
            for entry in &task.verification {
                match entry.kind() {
                    Some(kind) => {
                        let _ = writeln!(prompt, "- [{kind}] `{}`", entry.cmd());
                    }
                    None => {
                        let _ = writeln!(prompt, "- `{}`", entry.cmd());
                    }
                }
            }
        }
        if !task.depends_on.is_empty() {
            prompt.push_str("\n### Satisfied dependencies\n\n");
            for dep in &task.depends_on {
                let title =
                    prd.task(dep).map(|t| t.title.as_str()).unwrap_or("(unknown)");
                let _ = writeln!(prompt, "- {dep}: {title}");
            }
        }
        let _ = write!(
            prompt,
            "\n### Feature\n\n{} (branch {})\n",
            prd.feature_name, prd.branch_name
        );
        if let Some(ref description) = prd.description {
            let _ = write!(prompt, "{}\n", description.trim_end());
        }
    }

    fn read_optional(&self, path: &Option<PathBuf>) -> Option<String> {
        path.as_ref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .filter(|s| !s.trim().is_empty())
    }

    /// The tier's base markdown from the prompts directory, or a compact
    /// built-in fallback.
    fn tier_base(&self, tier: Tier) -> String {
        if let Some(ref dir) = self.prompts_dir {
            if let Ok(text) = std::fs::read_to_string(dir.join(format!("{tier}.md"))) {
                return text.trim_end().to_string();
            }
        }
        let role = match tier {
            Tier::Line => {
                "You are a line cook: fast, focused, single-task execution. \
                 Implement exactly what the task asks."
            }
            Tier::Sous => {
                "You are a sous chef: experienced and careful. Handle tasks that \
                 defeated the line tier; think before you cut."
            }
            Tier::Executive => {
                "You are the executive chef: the last word on quality and scope. \
                 Review, decide, and unblock."
            }
        };
        format!(
            "{role}\n\nWhen you finish, declare the outcome with \
             <promise>COMPLETE</promise>, <promise>BLOCKED</promise>, \
             <promise>ALREADY_DONE</promise>, or <promise>ABSORBED_BY:task-id</promise>.\n\
             Declare your strategy with <approach>one line</approach>."
        )
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
