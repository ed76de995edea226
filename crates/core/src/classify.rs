// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification over raw worker stderr text.
//!
//! An ordered pattern table maps output to one of four categories so the
//! orchestrator can avoid repeating strategies that failed the same way —
//! and can refuse to retry failures no worker can fix (environment).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid custom pattern entry '{0}', expected 'pattern:category'")]
    MalformedEntry(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("invalid regex '{pattern}': {source}")]
    BadRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// The four-valued failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Syntax,
    Integration,
    Environment,
    Logic,
    Unknown,
}

crate::simple_display! {
    Category {
        Syntax => "syntax",
        Integration => "integration",
        Environment => "environment",
        Logic => "logic",
        Unknown => "unknown",
    }
}

impl Category {
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_ascii_lowercase().as_str() {
            "syntax" => Some(Self::Syntax),
            "integration" => Some(Self::Integration),
            "environment" => Some(Self::Environment),
            "logic" => Some(Self::Logic),
            _ => None,
        }
    }

    /// Environment failures are outside any worker's control; retrying
    /// the same task will hit the same wall.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Environment)
    }
}

/// Default (pattern, category) table, checked in order.
const DEFAULT_PATTERNS: &[(&str, Category)] = &[
    // syntax
    (r"(?i)syntax\s*error", Category::Syntax),
    (r"(?i)unexpected token", Category::Syntax),
    (r"(?i)unexpected (end of|EOF)", Category::Syntax),
    (r"(?i)parse error", Category::Syntax),
    (r"(?i)unterminated (string|comment)", Category::Syntax),
    (r"expected `[^`]+`, found", Category::Syntax),
    (r"(?i)invalid syntax", Category::Syntax),
    (r"(?i)compilation (error|failed)", Category::Syntax),
    // integration
    (r"(?i)connection refused", Category::Integration),
    (r"ECONNREFUSED", Category::Integration),
    (r"(?i)api (error|failure)", Category::Integration),
    (r"(?i)schema mismatch", Category::Integration),
    (r"(?i)migration failed", Category::Integration),
    (r"(?i)version (conflict|mismatch)", Category::Integration),
    (r"(?i)incompatible (type|interface|signature)", Category::Integration),
    (r"(?i)protocol error", Category::Integration),
    (r"(?i)method not found", Category::Integration),
    // environment
    (r"(?i)permission denied", Category::Environment),
    (r"(?i)no such file or directory", Category::Environment),
    (r"(?i)command not found", Category::Environment),
    (r"(?i)no space left on device", Category::Environment),
    (r"(?i)out of memory", Category::Environment),
    (r"(?i)network is unreachable", Category::Environment),
    (r"(?i)could not resolve host", Category::Environment),
    (r"(?i)rate limit", Category::Environment),
    (r"(?i)environment variable .+ (not set|missing)", Category::Environment),
    // logic
    (r"(?i)assertion failed", Category::Logic),
    (r"(?i)test[^\n]* failed", Category::Logic),
    (r"(?i)expected .+ (but )?got", Category::Logic),
    (r"panicked at", Category::Logic),
    (r"(?i)nil pointer", Category::Logic),
    (r"(?i)null (pointer|reference)", Category::Logic),
    (r"(?i)index out of (range|bounds)", Category::Logic),
    (r"(?i)stack overflow", Category::Logic),
    (r"(?i)wrong (result|value|answer)", Category::Logic),
];

#[allow(clippy::expect_used)]
static ERROR_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(error|fatal|panic|exception|failed|fail)\b")
        .expect("constant regex pattern is valid")
});

/// An ordered pattern table mapping failure text to a [`Category`].
pub struct Classifier {
    patterns: Vec<(Regex, Category)>,
}

impl Default for Classifier {
    fn default() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .filter_map(|(pat, cat)| Regex::new(pat).ok().map(|re| (re, *cat)))
            .collect();
        Self { patterns }
    }
}

impl Classifier {
    /// Extend the table from `"pat1:cat1,pat2:cat2"`.
    ///
    /// The category is taken after the last colon so patterns may contain
    /// colons themselves.
    pub fn add_patterns_from_str(&mut self, spec: &str) -> Result<(), ClassifyError> {
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (pattern, cat_name) = entry
                .rsplit_once(':')
                .ok_or_else(|| ClassifyError::MalformedEntry(entry.to_string()))?;
            let category = Category::parse(cat_name)
                .ok_or_else(|| ClassifyError::UnknownCategory(cat_name.to_string()))?;
            let re = Regex::new(pattern).map_err(|source| ClassifyError::BadRegex {
                pattern: pattern.to_string(),
                source,
            })?;
            self.patterns.push((re, category));
        }
        Ok(())
    }

    /// Classify output as the category with the most pattern matches.
    ///
    /// Ties break toward the category whose matching pattern appears
    /// first in the table. No match at all is [`Category::Unknown`].
    pub fn classify(&self, output: &str) -> Category {
        // (count, first table index that matched) per category
        let mut best: Option<(Category, usize, usize)> = None;
        let mut tally: Vec<(Category, usize, usize)> = Vec::new();
        for (index, (re, category)) in self.patterns.iter().enumerate() {
            let hits = re.find_iter(output).count();
            if hits == 0 {
                continue;
            }
            match tally.iter_mut().find(|(c, _, _)| c == category) {
                Some((_, count, _)) => *count += hits,
                None => tally.push((*category, hits, index)),
            }
        }
        for (category, count, first_index) in tally {
            let better = match best {
                None => true,
                Some((_, best_count, best_index)) => {
                    count > best_count || (count == best_count && first_index < best_index)
                }
            };
            if better {
                best = Some((category, count, first_index));
            }
        }
        best.map(|(c, _, _)| c).unwrap_or(Category::Unknown)
    }

    /// Whether a failure with this output is worth retrying at all.
    pub fn is_retryable(&self, output: &str) -> bool {
        self.classify(output).is_retryable()
    }
}

/// Pull a concise error message out of raw output: the first line with an
/// error-like prefix, else the last non-empty line, capped at `max_len`.
pub fn extract_error_message(output: &str, max_len: usize) -> String {
    let line = output
        .lines()
        .find(|l| ERROR_PREFIX.is_match(l))
        .or_else(|| output.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("")
        .trim();
    if line.len() <= max_len {
        line.to_string()
    } else {
        let mut end = max_len;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        line[..end].to_string()
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
