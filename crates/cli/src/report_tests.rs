// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sw_adapters::{FakeCallbacks, FakeGit};
use sw_core::callback::{DonePayload, StartPayload, StepPayload};
use sw_core::ErrorPhase;
use tempfile::TempDir;
use yare::parameterized;

struct Harness {
    dir: TempDir,
    git: FakeGit,
    callbacks: FakeCallbacks,
    reporter: Reporter<FakeGit, FakeCallbacks>,
}

impl Harness {
    fn new(job: JobSpec) -> Self {
        let dir = TempDir::new().unwrap();
        let git = FakeGit::new();
        let callbacks = FakeCallbacks::new();
        let reporter = Reporter::new(
            job,
            git.clone(),
            callbacks.clone(),
            FileStateStore::new(dir.path().join("state.json")),
            dir.path().join("workspace"),
        );
        std::fs::create_dir_all(dir.path().join("workspace")).unwrap();
        Self { dir, git, callbacks, reporter }
    }

    fn record(&self) -> Option<JobStateRecord> {
        FileStateStore::new(self.dir.path().join("state.json")).load_sync().unwrap()
    }

    fn write_pitch(&self, content: &str) {
        std::fs::write(self.dir.path().join("workspace").join(PITCH_FILE), content).unwrap();
    }
}

fn pushing_job() -> JobSpec {
    JobSpec::builder()
        .id(sw_core::JobId::from_string("job-r1"))
        .repo_url("https://github.com/acme/app")
        .github_token("ghp_test")
        .branch("feature/x")
        .build()
}

fn offline_job() -> JobSpec {
    JobSpec::builder().id(sw_core::JobId::from_string("job-r2")).build()
}

fn labels(steps: &[&str]) -> Vec<String> {
    steps.iter().map(|s| s.to_string()).collect()
}

fn commit_messages(git: &FakeGit) -> Vec<String> {
    git.calls()
        .into_iter()
        .filter(|c| c.first().map(String::as_str) == Some("commit"))
        .filter_map(|c| c.last().cloned())
        .collect()
}

#[tokio::test]
async fn start_saves_plan_and_announces_it() {
    let h = Harness::new(offline_job());
    h.reporter.start("A recipe box", labels(&["Scaffold", "Build API", "Add UI"])).await.unwrap();

    let record = h.record().unwrap();
    assert_eq!(record.idea, "A recipe box");
    assert_eq!(record.total_steps, 3);
    assert_eq!(record.plan_steps, ["Scaffold", "Build API", "Add UI"]);
    assert!(!record.done);

    let calls = h.callbacks.calls();
    assert_eq!(calls.len(), 1);
    let Callback::Start(StartPayload { ref idea, total_steps, ref plan_steps, ref job_id, .. }) =
        calls[0]
    else {
        panic!("expected start, got {:?}", calls[0]);
    };
    assert_eq!(idea, "A recipe box");
    assert_eq!(total_steps, 3);
    assert_eq!(plan_steps.len(), 3);
    assert_eq!(job_id, "job-r2");
    assert!(h.git.calls().is_empty());
}

#[tokio::test]
async fn step_checkpoints_then_reports_step_and_push() {
    let h = Harness::new(pushing_job());
    h.reporter.start("A recipe box", labels(&["Scaffold", "Build API"])).await.unwrap();
    h.reporter.step(2, "Build API").await.unwrap();

    assert_eq!(h.git.subcommands(), ["remote", "add", "commit", "push"]);
    assert_eq!(commit_messages(&h.git), ["Step 2: Build API"]);
    assert_eq!(h.callbacks.kinds(), ["start", "step", "push"]);

    let calls = h.callbacks.calls();
    let Callback::Step(StepPayload { step_index, total_steps, done, ref summary, .. }) = calls[1]
    else {
        panic!("expected step");
    };
    assert_eq!((step_index, total_steps, done), (2, 2, false));
    assert_eq!(summary, "Build API");
}

#[tokio::test]
async fn step_without_credential_runs_no_git() {
    let h = Harness::new(offline_job());
    h.reporter.step(1, "Scaffold").await.unwrap();

    assert!(h.git.calls().is_empty());
    assert_eq!(h.callbacks.kinds(), ["step", "push"]);
}

#[tokio::test]
async fn step_without_state_reports_zero_total() {
    let h = Harness::new(offline_job());
    h.reporter.step(1, "Scaffold").await.unwrap();

    let calls = h.callbacks.calls();
    let Callback::Step(StepPayload { total_steps, .. }) = calls[0] else {
        panic!("expected step");
    };
    assert_eq!(total_steps, 0);
    assert!(h.record().is_none());
}

#[tokio::test]
async fn corrupt_state_does_not_stop_a_step() {
    let h = Harness::new(offline_job());
    std::fs::write(h.dir.path().join("state.json"), "{not json").unwrap();
    h.reporter.step(3, "Polish").await.unwrap();
    assert_eq!(h.callbacks.kinds(), ["step", "push"]);
}

#[tokio::test]
async fn push_failure_is_reported_and_step_still_posted() {
    let h = Harness::new(pushing_job());
    h.git.fail_on("push", 1);
    h.reporter.step(1, "Scaffold").await.unwrap();

    assert_eq!(h.callbacks.kinds(), ["error", "step", "push"]);
    let calls = h.callbacks.calls();
    let Callback::Error(ref payload) = calls[0] else {
        panic!("expected error");
    };
    assert_eq!(payload.phase, ErrorPhase::GitPush);
    assert!(payload.error.starts_with("git push failed"));
}

#[tokio::test]
async fn step_without_vercel_token_skips_deployment() {
    let h = Harness::new(pushing_job());
    let reporter = Reporter::new(
        pushing_job(),
        h.git.clone(),
        h.callbacks.clone(),
        FileStateStore::new(h.dir.path().join("state.json")),
        h.dir.path().join("workspace"),
    )
    .with_deploy(DeployNotifier::new(reqwest::Client::new()));

    reporter.step(1, "Scaffold").await.unwrap();
    assert_eq!(h.callbacks.kinds(), ["step", "push"]);
}

#[tokio::test]
async fn done_uses_pitch_file_and_marks_state() {
    let h = Harness::new(pushing_job());
    h.reporter.start("A recipe box", labels(&["Scaffold"])).await.unwrap();
    h.write_pitch("\n  Recipes, organized.  \n");

    h.reporter.done().await.unwrap();

    assert_eq!(commit_messages(&h.git), [FINAL_MESSAGE]);
    let calls = h.callbacks.calls();
    let Some(Callback::Done(DonePayload { pitch, success, idea, repo_url, branch, error, .. })) =
        calls.last().cloned()
    else {
        panic!("expected done");
    };
    assert_eq!(pitch, "Recipes, organized.");
    assert!(success);
    assert_eq!(error, None);
    assert_eq!(idea, "A recipe box");
    assert_eq!(repo_url, "https://github.com/acme/app");
    assert_eq!(branch, "feature/x");
    assert!(h.record().unwrap().done);
}

#[tokio::test]
async fn done_falls_back_to_default_pitch() {
    let h = Harness::new(offline_job());
    h.reporter.start("A recipe box", labels(&["Scaffold"])).await.unwrap();
    h.write_pitch("   \n");

    h.reporter.done().await.unwrap();

    let Some(Callback::Done(payload)) = h.callbacks.calls().last().cloned() else {
        panic!("expected done");
    };
    assert_eq!(payload.pitch, default_pitch("A recipe box"));
}

#[tokio::test]
async fn done_twice_emits_once() {
    let h = Harness::new(pushing_job());
    h.reporter.start("A recipe box", labels(&["Scaffold"])).await.unwrap();

    h.reporter.done().await.unwrap();
    let git_calls = h.git.calls().len();
    let callback_calls = h.callbacks.calls().len();
    assert!(h.record().unwrap().done);

    h.reporter.done().await.unwrap();
    assert_eq!(h.git.calls().len(), git_calls);
    assert_eq!(h.callbacks.calls().len(), callback_calls);
    assert_eq!(h.callbacks.terminal_count(), 1);
    assert!(h.record().unwrap().done);
}

#[tokio::test]
async fn done_without_start_still_terminates() {
    let h = Harness::new(offline_job());
    h.reporter.done().await.unwrap();

    assert_eq!(h.callbacks.kinds(), ["done"]);
    let record = h.record().unwrap();
    assert!(record.done);
    assert_eq!(record.idea, "a todo app");
}

#[tokio::test]
async fn callback_failures_do_not_fail_reports() {
    let h = Harness::new(offline_job());
    h.callbacks.set_fail(true);

    h.reporter.start("A recipe box", labels(&["Scaffold"])).await.unwrap();
    h.reporter.step(1, "Scaffold").await.unwrap();
    h.reporter.done().await.unwrap();

    assert_eq!(h.callbacks.kinds(), ["start", "step", "push", "done"]);
    assert!(h.record().unwrap().done);
}

#[test]
fn missing_pitch_file_reads_as_none() {
    let dir = TempDir::new().unwrap();
    assert_eq!(read_pitch(dir.path()), None);
}

#[parameterized(
    plain = { "Recipes, organized.", Some("Recipes, organized.") },
    padded = { "\n  Recipes, organized.  \n\n", Some("Recipes, organized.") },
    multiline = { "# Recipe box\n\nKeeps recipes.\n", Some("# Recipe box\n\nKeeps recipes.") },
    blank = { "  \n\t", None },
)]
fn pitch_file_is_trimmed(content: &str, expected: Option<&str>) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(PITCH_FILE), content).unwrap();
    assert_eq!(read_pitch(dir.path()).as_deref(), expected);
}
