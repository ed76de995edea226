// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command shaping: turn a configured base command plus a prompt into the
//! argv a given tool expects.
//!
//! Tools are recognized by executable basename. Claude takes the prompt as
//! the final argument and needs its permissions bypass in unattended runs;
//! opencode wants a `run` subcommand. Anything else gets the prompt as the
//! final positional argument.

/// A configured worker command, split into program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Parse a base command string by whitespace.
///
/// Worker commands are flag lists, not shell snippets; anything needing
/// quoting belongs in a wrapper script.
pub fn parse_base_command(command: &str) -> Option<BaseCommand> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some(BaseCommand { program, args: parts.collect() })
}

/// Tool families with known prompt-passing conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Claude,
    Opencode,
    Generic,
}

impl ToolKind {
    pub fn detect(program: &str) -> ToolKind {
        let basename = program.rsplit('/').next().unwrap_or(program);
        match basename {
            "claude" => Self::Claude,
            "opencode" => Self::Opencode,
            _ => Self::Generic,
        }
    }
}

const CLAUDE_SKIP_PERMISSIONS: &str = "--dangerously-skip-permissions";

/// Build the final argv for one invocation.
pub fn shape_invocation(base: &BaseCommand, prompt: &str) -> (String, Vec<String>) {
    let mut args = base.args.clone();
    match ToolKind::detect(&base.program) {
        ToolKind::Claude => {
            if !args.iter().any(|a| a == CLAUDE_SKIP_PERMISSIONS) {
                args.push(CLAUDE_SKIP_PERMISSIONS.to_string());
            }
            args.push(prompt.to_string());
        }
        ToolKind::Opencode => {
            if args.first().map(String::as_str) != Some("run") {
                args.insert(0, "run".to_string());
            }
            if !args.iter().any(|a| a == "--model" || a.starts_with("--model=")) {
                tracing::debug!(program = %base.program, "opencode command has no --model flag");
            }
            args.push(prompt.to_string());
        }
        ToolKind::Generic => {
            args.push(prompt.to_string());
        }
    }
    (base.program.clone(), args)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
