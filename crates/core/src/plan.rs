// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan grammar: turns the agent's first text message into step labels.
//!
//! ```text
//! plan_line := <int> "." <ws>* <label> ( <ws>* ("-" | "—") <ws>* <description> )?
//! ```
//!
//! Lines are trimmed and blank lines skipped. Lines before the first
//! `plan_line` are ignored; scanning stops at the first line after the
//! numbered block that is not a `plan_line`. Without any `plan_line`, the
//! first [`MAX_FALLBACK_STEPS`] non-empty lines become the plan.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Upper bound on fallback plan lines when no numbered list is present.
pub const MAX_FALLBACK_STEPS: usize = 6;

#[allow(clippy::expect_used)]
static PLAN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.\s*(.+?)(?:\s*[-\x{2014}]\s*.+)?$")
        .expect("constant regex pattern is valid")
});

/// Ordered step labels derived once from the agent's plan message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<String>,
    /// True when no numbered lines were found and raw lines were used.
    fallback: bool,
}

impl Plan {
    /// Parse a plan from free-form agent text.
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let mut steps = Vec::new();
        for line in &lines {
            match PLAN_LINE.captures(line) {
                Some(caps) => {
                    let label = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                    if !label.is_empty() {
                        steps.push(label.to_string());
                    }
                }
                None if !steps.is_empty() => break,
                None => {}
            }
        }

        if !steps.is_empty() {
            return Self { steps, fallback: false };
        }

        let steps = lines.iter().take(MAX_FALLBACK_STEPS).map(|l| l.to_string()).collect();
        Self { steps, fallback: true }
    }

    /// Build a plan from labels the agent reported explicitly.
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { steps: labels, fallback: false }
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Label at a 0-based step index, if the plan has one.
    pub fn label(&self, index: u32) -> Option<&str> {
        self.steps.get(index as usize).map(String::as_str)
    }

    /// Number of planned steps, never below 1.
    pub fn total_steps(&self) -> u32 {
        (self.steps.len() as u32).max(1)
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
