// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step events and summary resolution.
//!
//! Stream-derived step indices are 0-based: the first step after the plan
//! is index 0 and the terminal "Build complete" event carries the index the
//! job reached. The reporting tool passes agent-supplied indices through.

use crate::plan::Plan;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Index of the first stream-derived step.
pub const FIRST_STEP_INDEX: u32 = 0;

/// Summary of the terminal step event.
pub const BUILD_COMPLETE: &str = "Build complete";

#[allow(clippy::expect_used)]
static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*\[STEP\s+(\d+)\s*/\s*(\d+)\]\s*(.+?)\s*$")
        .expect("constant regex pattern is valid")
});

/// One normalized progress step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub index: u32,
    pub summary: String,
    pub done: bool,
}

impl StepEvent {
    pub fn progress(index: u32, summary: impl Into<String>) -> Self {
        Self { index, summary: summary.into(), done: false }
    }

    pub fn complete(index: u32) -> Self {
        Self { index, summary: BUILD_COMPLETE.to_string(), done: true }
    }
}

/// A machine-readable `[STEP i/total] label` header found in agent text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMarker {
    pub index: u32,
    pub total: u32,
    pub label: String,
}

/// Find the first step header line anywhere in `text`.
pub fn find_step_marker(text: &str) -> Option<StepMarker> {
    let caps = STEP_MARKER.captures(text)?;
    Some(StepMarker {
        index: caps.get(1)?.as_str().parse().ok()?,
        total: caps.get(2)?.as_str().parse().ok()?,
        label: caps.get(3)?.as_str().to_string(),
    })
}

/// Generic summary for steps with neither a marker nor a plan label.
pub fn placeholder_summary(index: u32) -> String {
    format!("Implementing step {}", index + 1)
}

/// Resolve the summary for a step at `index`.
///
/// Precedence: explicit step marker, then the plan label at `index`, then
/// the generic placeholder.
pub fn resolve_summary(text: &str, plan: &Plan, index: u32) -> String {
    if let Some(marker) = find_step_marker(text) {
        return marker.label;
    }
    match plan.label(index) {
        Some(label) => label.to_string(),
        None => placeholder_summary(index),
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
