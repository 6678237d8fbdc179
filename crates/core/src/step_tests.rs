// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn plan() -> Plan {
    Plan::parse("1. Scaffold project\n2. Build API\n3. Add UI")
}

#[test]
fn marker_beats_plan_label() {
    let summary = resolve_summary("[STEP 2/3] Wiring the REST API", &plan(), 0);
    assert_eq!(summary, "Wiring the REST API");
}

#[test]
fn marker_is_found_on_any_line() {
    let text = "Moving on.\n[step 3/5]   Styling pass  \nmore text";
    let marker = find_step_marker(text).unwrap();
    assert_eq!(marker, StepMarker { index: 3, total: 5, label: "Styling pass".to_string() });
}

#[yare::parameterized(
    first_label  = { 0, "Scaffold project" },
    last_label   = { 2, "Add UI" },
    past_plan    = { 3, "Implementing step 4" },
    far_past     = { 9, "Implementing step 10" },
)]
fn plan_then_placeholder(index: u32, expected: &str) {
    assert_eq!(resolve_summary("Working on it.", &plan(), index), expected);
}

#[test]
fn malformed_marker_is_ignored() {
    assert_eq!(find_step_marker("[STEP two/3] nope"), None);
    assert_eq!(find_step_marker("see [STEP 1/3] inline"), None);
}

#[test]
fn complete_event_uses_sentinel() {
    let step = StepEvent::complete(4);
    assert!(step.done);
    assert_eq!(step.summary, BUILD_COMPLETE);
    assert_eq!(step.index, 4);
}
