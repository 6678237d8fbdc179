//! State record specs
//!
//! The record at SW_STATE_FILE is what the executor's completion guard reads.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn start_writes_the_plan() {
    let sandbox = Sandbox::new();
    sandbox
        .report()
        .args(&["start", "--idea", "A recipe box", "--steps", "Scaffold", "Build API", "Add UI"])
        .passes();

    assert_eq!(
        sandbox.state(),
        serde_json::json!({
            "idea": "A recipe box",
            "totalSteps": 3,
            "planSteps": ["Scaffold", "Build API", "Add UI"],
            "done": false,
        })
    );
}

#[test]
fn steps_leave_the_record_alone() {
    let sandbox = Sandbox::new();
    sandbox.report().args(&["start", "--idea", "A recipe box", "--steps", "Scaffold"]).passes();
    let before = sandbox.state();

    sandbox.report().args(&["step", "--index", "1", "--summary", "Scaffold"]).passes();

    assert_eq!(sandbox.state(), before);
}

#[test]
fn done_marks_the_record_and_is_idempotent() {
    let sandbox = Sandbox::new();
    sandbox.report().args(&["start", "--idea", "A recipe box", "--steps", "Scaffold"]).passes();

    sandbox.report().args(&["done"]).passes();
    assert_eq!(sandbox.state()["done"], true);

    sandbox.report().args(&["done"]).passes().stderr_has("already reported done");
    assert_eq!(sandbox.state()["done"], true);
    assert_eq!(sandbox.state()["idea"], "A recipe box");
}

#[test]
fn done_without_start_still_writes_a_finished_record() {
    let sandbox = Sandbox::new();
    sandbox.report().args(&["done"]).passes();
    assert_eq!(sandbox.state()["done"], true);
}
