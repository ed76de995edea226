// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal parser: extracts tag-delimited signals from worker output.
//!
//! Workers interleave free prose with a small tag vocabulary. The parser
//! is pure text processing; it never interprets the prose between tags.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PROMISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<promise>\s*(.*?)\s*</promise>").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static APPROACH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<approach>\s*(.*?)\s*</approach>").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static LEARNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<learning>\s*(.*?)\s*</learning>").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static BACKLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<backlog>\s*(.*?)\s*</backlog>").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static SCOPE_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<scope-question>\s*(.*?)\s*</scope-question>")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<review>\s*(PASS|FAIL)\s*(?::\s*(.*?))?\s*</review>")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static DECISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<decision>\s*(.*?)\s*</decision>").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static GUIDANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<guidance>\s*(.*?)\s*</guidance>").expect("constant regex pattern is valid")
});

/// Spans removed by [`strip_tags`], one pattern per tag name.
#[allow(clippy::expect_used)]
static STRIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "promise",
        "approach",
        "learning",
        "backlog",
        "scope-question",
        "review",
        "decision",
        "guidance",
    ]
    .iter()
    .map(|tag| {
        Regex::new(&format!(r"(?s)<{tag}>.*?</{tag}>\n?"))
            .expect("constant regex pattern is valid")
    })
    .collect()
});

/// A worker's one-shot outcome declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promise {
    Complete,
    Blocked,
    AlreadyDone,
    AbsorbedBy(String),
}

impl Promise {
    fn parse(body: &str) -> Option<Promise> {
        let body = body.trim();
        if let Some(id) = body.strip_prefix("ABSORBED_BY:") {
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            return Some(Self::AbsorbedBy(id.to_string()));
        }
        match body {
            "COMPLETE" => Some(Self::Complete),
            "BLOCKED" => Some(Self::Blocked),
            "ALREADY_DONE" => Some(Self::AlreadyDone),
            _ => None,
        }
    }
}

/// Executive review verdict, with the reason captured after `FAIL:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    Pass,
    Fail(String),
}

/// A walkaway decision emitted by the executive tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkawayAction {
    Retry,
    Skip,
    Abort,
}

crate::simple_display! {
    WalkawayAction {
        Retry => "retry",
        Skip => "skip",
        Abort => "abort",
    }
}

/// Everything extracted from one worker invocation's output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSignals {
    /// None means the worker made no recognized promise: needs iteration.
    pub promise: Option<Promise>,
    /// Last occurrence wins.
    pub approach: Option<String>,
    /// All occurrences, in order.
    pub learnings: Vec<String>,
    /// All occurrences, in order.
    pub backlog: Vec<String>,
    /// Last occurrence wins.
    pub scope_question: Option<String>,
    pub review: Option<ReviewVerdict>,
    pub decision: Option<WalkawayAction>,
    pub guidance: Option<String>,
}

impl ParsedSignals {
    /// Whether this result demands another attempt on the same task.
    pub fn needs_iteration(&self) -> bool {
        self.promise.is_none()
    }
}

/// Extract all signals from a worker's combined output.
pub fn parse_output(output: &str) -> ParsedSignals {
    let last_capture = |re: &Regex| {
        re.captures_iter(output)
            .last()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };
    let all_captures = |re: &Regex| {
        re.captures_iter(output)
            .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    };

    let review = REVIEW.captures_iter(output).last().map(|c| {
        let verdict = c.get(1).map(|m| m.as_str()).unwrap_or("");
        if verdict == "PASS" {
            ReviewVerdict::Pass
        } else {
            let reason = c.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            ReviewVerdict::Fail(reason.to_string())
        }
    });

    let decision = last_capture(&DECISION).and_then(|body| match body.as_str() {
        "RETRY" => Some(WalkawayAction::Retry),
        "SKIP" => Some(WalkawayAction::Skip),
        "ABORT" => Some(WalkawayAction::Abort),
        _ => None,
    });

    ParsedSignals {
        promise: last_capture(&PROMISE).and_then(|b| Promise::parse(&b)),
        approach: last_capture(&APPROACH).filter(|s| !s.is_empty()),
        learnings: all_captures(&LEARNING),
        backlog: all_captures(&BACKLOG),
        scope_question: last_capture(&SCOPE_QUESTION).filter(|s| !s.is_empty()),
        review,
        decision,
        guidance: last_capture(&GUIDANCE).filter(|s| !s.is_empty()),
    }
}

/// Remove every recognized tag span, returning a display copy.
pub fn strip_tags(output: &str) -> String {
    let mut cleaned = output.to_string();
    for re in STRIP_PATTERNS.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
