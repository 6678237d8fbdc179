//! Controller callback specs
//!
//! Every report posts to `<SW_CALLBACK_BASE_URL>/v1.0/log/<kind>`.

use crate::prelude::*;

#[test]
fn full_run_posts_in_order() {
    let controller = Controller::start();
    let sandbox = Sandbox::new().with_controller(&controller);

    sandbox
        .report()
        .args(&["start", "--idea", "A recipe box", "--steps", "Scaffold", "Build API"])
        .passes();
    sandbox.report().args(&["step", "--index", "1", "--summary", "Scaffold"]).passes();
    sandbox.report().args(&["step", "--index", "2", "--summary", "Build API"]).passes();
    sandbox.file("PITCH.md", "Recipes, organized.\n");
    sandbox.report().args(&["done"]).passes();

    assert_eq!(
        controller.paths(),
        [
            "/v1.0/log/start",
            "/v1.0/log/step",
            "/v1.0/log/push",
            "/v1.0/log/step",
            "/v1.0/log/push",
            "/v1.0/log/done",
        ]
    );

    let received = controller.received();
    assert_eq!(received[0].body["jobId"], "job-spec");
    assert_eq!(received[0].body["totalSteps"], 2);
    assert_eq!(received[3].body["stepIndex"], 2);
    assert_eq!(received[3].body["totalSteps"], 2);
    assert_eq!(received[3].body["done"], false);

    let done = &received[5].body;
    assert_eq!(done["success"], true);
    assert_eq!(done["pitch"], "Recipes, organized.");
    assert_eq!(done["idea"], "A recipe box");
    assert_eq!(done["branch"], "main");
    assert_eq!(done["repoUrl"], "");
}

#[test]
fn second_done_posts_nothing() {
    let controller = Controller::start();
    let sandbox = Sandbox::new().with_controller(&controller);

    sandbox.report().args(&["start", "--idea", "A recipe box", "--steps", "Scaffold"]).passes();
    sandbox.report().args(&["done"]).passes();
    sandbox.report().args(&["done"]).passes();

    assert_eq!(controller.paths(), ["/v1.0/log/start", "/v1.0/log/done"]);
}

#[test]
fn missing_pitch_uses_default() {
    let controller = Controller::start();
    let sandbox = Sandbox::new().with_controller(&controller);

    sandbox.report().args(&["start", "--idea", "A recipe box", "--steps", "Scaffold"]).passes();
    sandbox.report().args(&["done"]).passes();

    let received = controller.received();
    assert_eq!(received[1].body["pitch"], "Built with Shipwright: A recipe box");
}

#[test]
fn unreachable_controller_does_not_fail_reports() {
    // Nothing listens on a port once its listener is dropped.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}", probe.local_addr().unwrap());
    drop(probe);

    let sandbox = Sandbox::new();
    sandbox
        .report()
        .env("SW_CALLBACK_BASE_URL", &dead)
        .args(&["start", "--idea", "A recipe box", "--steps", "Scaffold"])
        .passes()
        .stderr_has("callback delivery failed");
    assert_eq!(sandbox.state()["totalSteps"], 1);
}
