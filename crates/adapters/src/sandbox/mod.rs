// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox adapters: isolated, ephemeral environments hosting the agent.
//!
//! # Module layout
//!
//! - [`docker`]: containers driven through the docker CLI
//! - `fake`: scripted in-memory sandbox (tests and `test-support`)
//!
//! A sandbox is created once per job and must be terminated exactly once by
//! its owner on every exit path. Adapters never terminate on their own.

mod docker;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use docker::{DockerConfig, DockerSandbox};
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecScript, FakeSandbox, SandboxCall};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use sw_core::{JobId, JobSpec};
use thiserror::Error;
use tokio::io::AsyncRead;

/// Errors from sandbox operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox create failed: {0}")]
    CreateFailed(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("exec failed: {0}")]
    ExecFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("terminate failed: {0}")]
    TerminateFailed(String),
}

/// What the sandbox must be seeded with at creation.
#[derive(Debug, Clone)]
pub struct SandboxSpec {
    pub job_id: JobId,
    pub env: Vec<(String, String)>,
    /// Hard lifetime of the sandbox; it self-destructs after this.
    pub lifetime: Duration,
}

impl SandboxSpec {
    pub fn for_job(job: &JobSpec, lifetime: Duration) -> Self {
        Self { job_id: job.id.clone(), env: job.sandbox_env(), lifetime }
    }
}

/// Live sandbox owned by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    pub id: String,
    pub job_id: JobId,
}

/// Per-exec options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub workdir: Option<String>,
    pub env: Vec<(String, String)>,
    pub user: Option<String>,
    /// Ceiling for [`SandboxAdapter::exec_output`]; streaming execs are
    /// bounded by their caller.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    sw_core::setters! {
        set { env: Vec<(String, String)> }
        option { workdir: String, user: String, timeout: Duration }
    }
}

/// Captured result of a short command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self { exit_code: Some(code), stdout: String::new(), stderr: stderr.into() }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub type ProcessStream = Box<dyn AsyncRead + Send + Unpin>;

/// Wait/kill half of a running process.
#[async_trait]
pub trait ProcessControl: Send {
    /// Wait for exit; `None` when there is no exit code (signal).
    async fn wait(&mut self) -> Result<Option<i32>, SandboxError>;

    async fn kill(&mut self) -> Result<(), SandboxError>;
}

/// A process running inside a sandbox, with its output pipes.
pub struct ExecProcess {
    stdout: Option<ProcessStream>,
    stderr: Option<ProcessStream>,
    control: Box<dyn ProcessControl>,
}

impl ExecProcess {
    pub fn new(stdout: ProcessStream, stderr: ProcessStream, control: Box<dyn ProcessControl>) -> Self {
        Self { stdout: Some(stdout), stderr: Some(stderr), control }
    }

    pub fn take_stdout(&mut self) -> Option<ProcessStream> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ProcessStream> {
        self.stderr.take()
    }

    pub async fn wait(&mut self) -> Result<Option<i32>, SandboxError> {
        self.control.wait().await
    }

    pub async fn kill(&mut self) -> Result<(), SandboxError> {
        self.control.kill().await
    }
}

/// Adapter for isolated execution environments
#[async_trait]
pub trait SandboxAdapter: Clone + Send + Sync + 'static {
    /// Acquire a sandbox seeded with the spec's environment.
    async fn create(&self, spec: &SandboxSpec) -> Result<SandboxHandle, SandboxError>;

    /// Copy a local file or directory to `remote` inside the sandbox.
    async fn upload(
        &self,
        handle: &SandboxHandle,
        local: &Path,
        remote: &str,
    ) -> Result<(), SandboxError>;

    /// Write `contents` to `path`, creating parent directories.
    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        contents: &[u8],
    ) -> Result<(), SandboxError>;

    /// Start a process with piped stdout/stderr.
    async fn exec(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        opts: &ExecOptions,
    ) -> Result<ExecProcess, SandboxError>;

    /// Run a short command to completion and capture its output.
    async fn exec_output(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        opts: &ExecOptions,
    ) -> Result<ExecOutput, SandboxError>;

    /// Read a text file; `Ok(None)` when it does not exist.
    async fn read_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
    ) -> Result<Option<String>, SandboxError>;

    /// SIGKILL the process group whose leader wrote its PID to `pid_file`.
    ///
    /// Killing the local end of an exec does not reach the processes it
    /// started inside the sandbox; this does.
    async fn kill_process_group(&self, handle: &SandboxHandle, pid_file: &str) -> Result<(), SandboxError>;

    /// Destroy the sandbox and everything in it.
    async fn terminate(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;
}

/// Build an argv from string literals.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
