//! sw-report usage specs

use crate::prelude::*;

#[test]
fn help_lists_subcommands() {
    Sandbox::new()
        .report()
        .args(&["--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("step")
        .stdout_has("done");
}

#[test]
fn start_requires_steps() {
    let sandbox = Sandbox::new();
    sandbox.report().args(&["start", "--idea", "A recipe box"]).fails().stderr_has("--steps");
    assert!(!sandbox.state_path().exists());
}

#[test]
fn step_requires_numeric_index() {
    Sandbox::new()
        .report()
        .args(&["step", "--index", "two", "--summary", "Build API"])
        .fails()
        .stderr_has("--index");
}
