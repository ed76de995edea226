// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker tiers, totally ordered by capability.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A worker capability level. Tasks escalate strictly upward on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Line,
    Sous,
    Executive,
}

crate::simple_display! {
    Tier {
        Line => "line",
        Sous => "sous",
        Executive => "executive",
    }
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Sous => "sous",
            Self::Executive => "executive",
        }
    }

    /// The next tier up, if any.
    pub fn next(&self) -> Option<Tier> {
        match self {
            Self::Line => Some(Self::Sous),
            Self::Sous => Some(Self::Executive),
            Self::Executive => None,
        }
    }

    /// Default worker timeout for this tier.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Line => Duration::from_secs(15 * 60),
            Self::Sous => Duration::from_secs(30 * 60),
            Self::Executive => Duration::from_secs(60 * 60),
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Some(Self::Line),
            "sous" => Some(Self::Sous),
            "executive" => Some(Self::Executive),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tier_tests.rs"]
mod tests;
