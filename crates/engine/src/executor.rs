// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor: one job from sandbox creation to teardown.
//!
//! ```text
//! create ─▶ upload ─▶ seed + git bootstrap ─▶ exec agent ─┬─ stdout: classify ─▶ machine ─▶ callbacks/checkpoints
//!                                                          └─ stderr: drain task
//! ─▶ remove prompt files ─▶ completion guard ─▶ terminate
//! ```
//!
//! The agent session runs on its own task so a panic inside it still
//! reaches the guard and the teardown. A timed-out agent is killed inside
//! the sandbox before the guard reads any state. The sandbox is terminated exactly
//! once whenever it was created.

use crate::classify::classify_line;
use crate::guard::{CompletionGuard, GuardOutcome};
use crate::job_logger::JobLogSink;
use crate::machine::{StepMachine, Transition};
use crate::prompt::{system_prompt, task_prompt, AgentCommand, PromptFiles, REPORT_TOOL_PATH};
use crate::state::SandboxStateStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sw_adapters::{
    argv, deliver, step_message, CallbackAdapter, CheckpointOutcome, Checkpointer, DeployNotifier,
    ExecOptions, ProcessStream, SandboxAdapter, SandboxError, SandboxGit, SandboxHandle,
    SandboxSpec, FINAL_MESSAGE, GITIGNORE,
};
use sw_core::{
    default_pitch, Callback, ErrorPhase, JobId, JobSpec, JobStateRecord, MemoryStateStore, Plan,
    ProgressMode, StateStore, StepEvent, STATE_FILE_PATH,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

/// Used when a failed run gives no reason of its own.
const AGENT_ERROR: &str = "Agent reported an error";

/// Errors that end a job before or while launching the agent
#[derive(Debug, Error)]
pub enum JobError {
    #[error("required upload of {path} failed: {source}")]
    Upload { path: String, source: SandboxError },
    #[error("agent launch failed: {0}")]
    Launch(SandboxError),
    #[error("job task panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Phase reported to the controller, if any.
    pub fn phase(&self) -> Option<ErrorPhase> {
        match self {
            JobError::Upload { .. } => Some(ErrorPhase::Upload),
            JobError::Launch(_) => Some(ErrorPhase::AgentLaunch),
            JobError::Panicked(_) => None,
        }
    }
}

/// Per-deployment executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Sandbox lifetime; the hard ceiling for the whole job.
    pub job_timeout: Duration,
    pub agent_timeout: Duration,
    /// How long to wait for the stderr drain after the agent exits.
    pub drain_grace: Duration,
    pub push_timeout: Duration,
    pub max_turns: u32,
    pub workdir: String,
    /// Home directory of the user the agent runs as.
    pub agent_home: String,
    pub report_bin: Option<PathBuf>,
    pub skills_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(1900),
            agent_timeout: Duration::from_secs(1700),
            drain_grace: Duration::from_secs(5),
            push_timeout: Duration::from_secs(120),
            max_turns: crate::prompt::DEFAULT_MAX_TURNS,
            workdir: "/workspace".to_string(),
            agent_home: "/home/agent".to_string(),
            report_bin: None,
            skills_dir: None,
            template_dir: None,
        }
    }
}

impl ExecutorConfig {
    sw_core::setters! {
        into { workdir: String, agent_home: String }
        set {
            job_timeout: Duration,
            agent_timeout: Duration,
            drain_grace: Duration,
            push_timeout: Duration,
            max_turns: u32,
        }
        option { report_bin: PathBuf, skills_dir: PathBuf, template_dir: PathBuf }
    }

    /// Agent timeout, kept strictly below the job timeout.
    pub fn effective_agent_timeout(&self) -> Duration {
        if self.agent_timeout < self.job_timeout {
            self.agent_timeout
        } else {
            self.job_timeout * 9 / 10
        }
    }
}

/// How the agent process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRun {
    /// `None` when killed, timed out, or never started.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Summary of one finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: JobId,
    pub agent: AgentRun,
    /// Fatal error that cut the job short.
    pub error: Option<String>,
    pub guard: GuardOutcome,
    pub elapsed: Duration,
}

/// Runs jobs against one sandbox backend.
#[derive(Clone)]
pub struct JobExecutor<S: SandboxAdapter> {
    sandbox: S,
    config: Arc<ExecutorConfig>,
    deploy: Option<DeployNotifier>,
    log: JobLogSink,
}

impl<S: SandboxAdapter> JobExecutor<S> {
    pub fn new(sandbox: S, config: ExecutorConfig) -> Self {
        Self { sandbox, config: Arc::new(config), deploy: None, log: JobLogSink::disabled() }
    }

    pub fn with_deploy(mut self, deploy: DeployNotifier) -> Self {
        self.deploy = Some(deploy);
        self
    }

    pub fn with_log(mut self, log: JobLogSink) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run one job to completion. Never fails; every outcome is reported
    /// through `callbacks` and summarized in the returned report.
    pub async fn run<C: CallbackAdapter>(&self, job: JobSpec, callbacks: C) -> JobReport {
        let started = Instant::now();
        let guard = CompletionGuard::new(&job, callbacks.clone());
        tracing::info!(job_id = %job.id, progress = %job.progress, branch = %job.branch, "job started");

        let spec = SandboxSpec::for_job(&job, self.config.job_timeout);
        let handle = match self.sandbox.create(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(job_id = %job.id, phase = "sandbox_create", error = %e, "sandbox creation failed");
                deliver(&callbacks, &Callback::error(&job, ErrorPhase::SandboxCreate, e.to_string())).await;
                let outcome = guard.settle(&MemoryStateStore::new()).await;
                return JobReport {
                    job_id: job.id,
                    agent: AgentRun::default(),
                    error: Some(e.to_string()),
                    guard: outcome,
                    elapsed: started.elapsed(),
                };
            }
        };
        tracing::info!(job_id = %job.id, sandbox = %handle.id, "sandbox created");

        let store: Arc<dyn StateStore> = match job.progress {
            ProgressMode::Stream => Arc::new(MemoryStateStore::new()),
            ProgressMode::Reporter => {
                Arc::new(SandboxStateStore::new(self.sandbox.clone(), handle.clone(), STATE_FILE_PATH))
            }
        };

        let session = Session {
            sandbox: self.sandbox.clone(),
            config: self.config.clone(),
            deploy: self.deploy.clone(),
            log: self.log.clone(),
            job: job.clone(),
            handle: handle.clone(),
            callbacks: callbacks.clone(),
            store: store.clone(),
        };
        let result = match tokio::spawn(session.run()).await {
            Ok(result) => result,
            Err(e) => Err(JobError::Panicked(e.to_string())),
        };

        let (agent, error) = match result {
            Ok(agent) => (agent, None),
            Err(e) => {
                match e.phase() {
                    Some(phase) => {
                        tracing::error!(job_id = %job.id, %phase, error = %e, "job failed");
                        deliver(&callbacks, &Callback::error(&job, phase, e.to_string())).await;
                    }
                    None => tracing::error!(job_id = %job.id, error = %e, "job failed"),
                }
                (AgentRun::default(), Some(e.to_string()))
            }
        };

        let outcome = guard.settle(store.as_ref()).await;
        if let Err(e) = self.sandbox.terminate(&handle).await {
            tracing::warn!(job_id = %job.id, sandbox = %handle.id, error = %e, "sandbox terminate failed");
        }

        let elapsed = started.elapsed();
        tracing::info!(
            job_id = %job.id,
            elapsed_ms = elapsed.as_millis() as u64,
            exit_code = ?agent.exit_code,
            timed_out = agent.timed_out,
            fallback = outcome == GuardOutcome::FallbackSent,
            "job finished"
        );
        JobReport { job_id: job.id, agent, error, guard: outcome, elapsed }
    }
}

/// Everything one job's agent session needs, owned so it can run on its own task.
struct Session<S: SandboxAdapter, C: CallbackAdapter> {
    sandbox: S,
    config: Arc<ExecutorConfig>,
    deploy: Option<DeployNotifier>,
    log: JobLogSink,
    job: JobSpec,
    handle: SandboxHandle,
    callbacks: C,
    store: Arc<dyn StateStore>,
}

impl<S: SandboxAdapter, C: CallbackAdapter> Session<S, C> {
    async fn run(self) -> Result<AgentRun, JobError> {
        self.upload_artifacts().await?;
        self.seed_workspace().await;

        let git = SandboxGit::new(self.sandbox.clone(), self.handle.clone(), self.config.workdir.clone());
        let mut checkpointer = Checkpointer::new(&self.job, git, self.callbacks.clone())
            .with_push_timeout(self.config.push_timeout);
        checkpointer.bootstrap().await;

        let files = PromptFiles::for_job(&self.job.id);
        let result = match self.write_prompts(&files).await {
            Ok(()) => self.run_agent(&files, &checkpointer).await,
            Err(e) => Err(e),
        };
        self.remove_prompts(&files).await;
        result
    }

    async fn upload_artifacts(&self) -> Result<(), JobError> {
        let job_id = &self.job.id;
        match self.config.report_bin {
            Some(ref local) => {
                let uploaded = match self.sandbox.upload(&self.handle, local, REPORT_TOOL_PATH).await {
                    Ok(()) => {
                        let chmod = argv(["chmod", "+x", REPORT_TOOL_PATH]);
                        let opts = ExecOptions::new().user("root");
                        match self.sandbox.exec_output(&self.handle, &chmod, &opts).await {
                            Ok(out) if out.success() => Ok(()),
                            Ok(out) => Err(SandboxError::UploadFailed(format!("chmod failed: {}", out.stderr.trim()))),
                            Err(e) => Err(e),
                        }
                    }
                    Err(e) => Err(e),
                };
                if let Err(source) = uploaded {
                    if self.job.progress == ProgressMode::Reporter {
                        return Err(JobError::Upload { path: REPORT_TOOL_PATH.to_string(), source });
                    }
                    tracing::warn!(%job_id, phase = "upload", error = %source, "reporting tool upload failed");
                }
            }
            None if self.job.progress == ProgressMode::Reporter => {
                return Err(JobError::Upload {
                    path: REPORT_TOOL_PATH.to_string(),
                    source: SandboxError::UploadFailed("reporting tool binary is not configured".to_string()),
                });
            }
            None => {}
        }

        if let Some(ref skills) = self.config.skills_dir {
            let remote = format!("{}/.claude/skills", self.config.agent_home);
            if let Err(e) = self.sandbox.upload(&self.handle, skills, &remote).await {
                tracing::warn!(%job_id, phase = "upload", error = %e, "skills upload failed");
            }
        }
        if let Some(ref template) = self.config.template_dir {
            if let Err(e) = self.sandbox.upload(&self.handle, &template.join("."), &self.config.workdir).await {
                tracing::warn!(%job_id, phase = "upload", error = %e, "template upload failed");
            }
        }
        Ok(())
    }

    /// `.gitignore` and agent CLI onboarding files. Failures are logged only.
    async fn seed_workspace(&self) {
        let gitignore = format!("{}/.gitignore", self.config.workdir);
        let home = &self.config.agent_home;
        let mut files: Vec<(String, &str)> = vec![
            (format!("{}/.claude/config.json", home), r#"{"acceptedTos":true}"#),
            (format!("{}/.claude.json", home), r#"{"hasCompletedOnboarding":true}"#),
        ];
        match self.sandbox.read_file(&self.handle, &gitignore).await {
            Ok(None) => files.push((gitignore, GITIGNORE)),
            Ok(Some(_)) => {}
            Err(e) => tracing::warn!(job_id = %self.job.id, error = %e, "could not check .gitignore"),
        }
        for (path, contents) in files {
            if let Err(e) = self.sandbox.write_file(&self.handle, &path, contents.as_bytes()).await {
                tracing::warn!(job_id = %self.job.id, %path, error = %e, "seeding workspace file failed");
            }
        }
    }

    async fn write_prompts(&self, files: &PromptFiles) -> Result<(), JobError> {
        let system = system_prompt(&self.job, &self.config.workdir);
        let task = task_prompt(&self.job);
        for (path, contents) in [(&files.system, system), (&files.task, task)] {
            self.sandbox.write_file(&self.handle, path, contents.as_bytes()).await.map_err(JobError::Launch)?;
        }
        Ok(())
    }

    async fn remove_prompts(&self, files: &PromptFiles) {
        let mut rm = argv(["rm", "-f"]);
        rm.extend(files.paths().iter().map(|p| p.to_string()));
        match self.sandbox.exec_output(&self.handle, &rm, &ExecOptions::new()).await {
            Ok(out) if out.success() => {}
            Ok(out) => tracing::warn!(job_id = %self.job.id, stderr = %out.stderr.trim(), "prompt cleanup failed"),
            Err(e) => tracing::warn!(job_id = %self.job.id, error = %e, "prompt cleanup failed"),
        }
    }

    async fn run_agent<G>(&self, files: &PromptFiles, checkpointer: &Checkpointer<G, C>) -> Result<AgentRun, JobError>
    where
        G: sw_adapters::GitRunner,
    {
        let job_id = &self.job.id;
        let timeout = self.config.effective_agent_timeout();
        let command = AgentCommand::new(files.clone(), self.config.max_turns, self.job.model.clone());
        let opts = ExecOptions::new().workdir(self.config.workdir.clone()).env(AgentCommand::env());
        let mut process =
            self.sandbox.exec(&self.handle, &command.argv(), &opts).await.map_err(JobError::Launch)?;
        tracing::info!(%job_id, timeout_secs = timeout.as_secs(), "agent launched");

        let deadline = Instant::now() + timeout;
        let stderr_task =
            process.take_stderr().map(|s| tokio::spawn(drain_stderr(s, job_id.clone(), self.log.clone())));

        let mut progress = StreamProgress::default();
        let mut timed_out = false;
        if let Some(stdout) = process.take_stdout() {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match tokio::time::timeout_at(deadline, lines.next_line()).await {
                    Ok(Ok(Some(line))) => self.on_line(&line, &mut progress, checkpointer).await,
                    Ok(Ok(None)) => break,
                    Ok(Err(e)) => {
                        tracing::warn!(%job_id, error = %e, "agent stdout read failed");
                        break;
                    }
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                }
            }
        }

        let mut exit_code = None;
        if !timed_out {
            match tokio::time::timeout_at(deadline, process.wait()).await {
                Ok(Ok(code)) => exit_code = code,
                Ok(Err(e)) => tracing::warn!(%job_id, error = %e, "agent wait failed"),
                Err(_) => timed_out = true,
            }
        }
        if timed_out {
            tracing::warn!(%job_id, timeout_secs = timeout.as_secs(), "agent timed out, killing");
            // The exec client dying leaves the agent running in the sandbox,
            // free to report done after the guard has settled.
            if let Err(e) = self.sandbox.kill_process_group(&self.handle, &files.pid).await {
                tracing::warn!(%job_id, error = %e, "agent process group kill failed");
            }
            if let Err(e) = process.kill().await {
                tracing::warn!(%job_id, error = %e, "agent kill failed");
            }
        }

        if let Some(task) = stderr_task {
            let abort = task.abort_handle();
            match tokio::time::timeout(self.config.drain_grace, task).await {
                Ok(Ok(count)) => tracing::debug!(%job_id, lines = count, "stderr drained"),
                Ok(Err(e)) => tracing::warn!(%job_id, error = %e, "stderr drain task failed"),
                Err(_) => {
                    tracing::warn!(%job_id, grace_ms = self.config.drain_grace.as_millis() as u64, "stderr drain exceeded grace period");
                    abort.abort();
                }
            }
        }

        match exit_code {
            Some(0) => tracing::info!(%job_id, "agent exited"),
            code => tracing::warn!(%job_id, exit_code = ?code, timed_out, "agent exited abnormally"),
        }
        Ok(AgentRun { exit_code, timed_out })
    }

    async fn on_line<G>(&self, line: &str, progress: &mut StreamProgress, checkpointer: &Checkpointer<G, C>)
    where
        G: sw_adapters::GitRunner,
    {
        let Some(message) = classify_line(line) else {
            return;
        };
        let lines = message.log_lines();
        for l in &lines {
            tracing::trace!(job_id = %self.job.id, "{}", l);
        }
        self.log.send(&self.job.id, lines).await;

        if self.job.progress != ProgressMode::Stream {
            return;
        }
        let transitions = progress.machine.observe(&message);
        if message.tool_calls() > 0 {
            tracing::debug!(job_id = %self.job.id, activity = progress.machine.activity(), "tool activity");
        }
        let total = progress.machine.total_steps();
        for transition in transitions {
            match transition {
                Transition::Planned(plan) => self.on_plan(plan, progress).await,
                Transition::Step(step) => self.on_step(&step, total, checkpointer).await,
                Transition::Completed { step, result } => {
                    deliver(&self.callbacks, &Callback::step(&self.job, &step, total)).await;
                    let pushed = checkpointer.checkpoint(Some(step.index), FINAL_MESSAGE).await;
                    if pushed == CheckpointOutcome::Pushed {
                        if let Some(ref deploy) = self.deploy {
                            deploy.notify(&self.job, &self.callbacks).await;
                        }
                    }
                    let done = if result.success {
                        Callback::done(&self.job, self.read_pitch().await)
                    } else {
                        Callback::failed(&self.job, result.text.unwrap_or_else(|| AGENT_ERROR.to_string()))
                    };
                    tracing::info!(job_id = %self.job.id, step_index = step.index, success = result.success, "agent completed");
                    deliver(&self.callbacks, &done).await;

                    let mut record = progress.record.take().unwrap_or_default();
                    record.done = true;
                    self.save_record(&record).await;
                }
            }
        }
    }

    async fn on_plan(&self, plan: Plan, progress: &mut StreamProgress) {
        tracing::info!(
            job_id = %self.job.id,
            total_steps = plan.total_steps(),
            fallback = plan.is_fallback(),
            "plan parsed"
        );
        deliver(&self.callbacks, &Callback::start(&self.job, &plan)).await;
        let record = JobStateRecord::started(self.job.idea.clone(), &plan);
        self.save_record(&record).await;
        progress.record = Some(record);
    }

    async fn on_step<G>(&self, step: &StepEvent, total: u32, checkpointer: &Checkpointer<G, C>)
    where
        G: sw_adapters::GitRunner,
    {
        tracing::info!(job_id = %self.job.id, step_index = step.index, summary = %step.summary, "step");
        checkpointer.checkpoint(Some(step.index), &step_message(step.index, &step.summary)).await;
        deliver(&self.callbacks, &Callback::step(&self.job, step, total)).await;
    }

    /// Trimmed `PITCH.md` from the workspace, or the default pitch.
    async fn read_pitch(&self) -> String {
        let path = format!("{}/PITCH.md", self.config.workdir);
        match self.sandbox.read_file(&self.handle, &path).await {
            Ok(Some(pitch)) if !pitch.trim().is_empty() => pitch.trim().to_string(),
            Ok(_) => default_pitch(&self.job.idea),
            Err(e) => {
                tracing::warn!(job_id = %self.job.id, error = %e, "could not read PITCH.md");
                default_pitch(&self.job.idea)
            }
        }
    }

    async fn save_record(&self, record: &JobStateRecord) {
        if let Err(e) = self.store.save(record).await {
            tracing::warn!(job_id = %self.job.id, error = %e, "state record save failed");
        }
    }
}

/// Stream-mode progress owned by the stdout loop.
#[derive(Default)]
struct StreamProgress {
    machine: StepMachine,
    record: Option<JobStateRecord>,
}

/// Log every stderr line. Returns the number of lines read.
async fn drain_stderr(stream: ProcessStream, job_id: JobId, log: JobLogSink) -> usize {
    let mut lines = BufReader::new(stream).lines();
    let mut count = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                count += 1;
                tracing::debug!(%job_id, line, "agent stderr");
                log.send(&job_id, vec![format!("[stderr] {}", line)]).await;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "agent stderr read failed");
                break;
            }
        }
    }
    count
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
