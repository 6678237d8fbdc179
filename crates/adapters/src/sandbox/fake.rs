// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted sandbox for tests.

use super::{
    ExecOptions, ExecOutput, ExecProcess, ProcessControl, SandboxAdapter, SandboxError,
    SandboxHandle, SandboxSpec,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, DuplexStream};

/// Recorded sandbox call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    Create { job_id: String, env: Vec<(String, String)> },
    Upload { local: String, remote: String },
    WriteFile { path: String },
    Exec { argv: Vec<String> },
    ExecOutput { argv: Vec<String> },
    ReadFile { path: String },
    Kill,
    KillGroup { pid_file: String },
    Terminate { id: String },
}

/// What the next `exec` call produces.
#[derive(Debug, Clone, Default)]
pub struct ExecScript {
    pub stdout_lines: Vec<String>,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Keep stdout open and never exit until killed.
    pub hang: bool,
}

impl ExecScript {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { stdout_lines: lines.into_iter().map(Into::into).collect(), exit_code: Some(0), ..Default::default() }
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

struct FakeSandboxState {
    calls: Vec<SandboxCall>,
    files: HashMap<String, String>,
    create_error: Option<String>,
    upload_errors: Vec<String>,
    exec_error: Option<String>,
    exec_script: ExecScript,
    /// `(needle, output)`: exec_output whose joined argv contains needle.
    exec_outputs: Vec<(String, ExecOutput)>,
}

/// Fake sandbox adapter for testing
#[derive(Clone)]
pub struct FakeSandbox {
    inner: Arc<Mutex<FakeSandboxState>>,
}

impl Default for FakeSandbox {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSandboxState {
                calls: Vec::new(),
                files: HashMap::new(),
                create_error: None,
                upload_errors: Vec::new(),
                exec_error: None,
                exec_script: ExecScript::lines(Vec::<String>::new()),
                exec_outputs: Vec::new(),
            })),
        }
    }
}

impl FakeSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SandboxCall> {
        self.inner.lock().calls.clone()
    }

    pub fn terminate_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, SandboxCall::Terminate { .. })).count()
    }

    /// Argv of every `exec_output` call, joined with spaces.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SandboxCall::ExecOutput { argv } => Some(argv.join(" ")),
                _ => None,
            })
            .collect()
    }

    pub fn fail_create(&self, message: impl Into<String>) {
        self.inner.lock().create_error = Some(message.into());
    }

    /// Fail uploads whose remote path contains `needle`.
    pub fn fail_upload(&self, needle: impl Into<String>) {
        self.inner.lock().upload_errors.push(needle.into());
    }

    pub fn fail_exec(&self, message: impl Into<String>) {
        self.inner.lock().exec_error = Some(message.into());
    }

    pub fn script_exec(&self, script: ExecScript) {
        self.inner.lock().exec_script = script;
    }

    /// Answer `exec_output` calls whose argv contains `needle`.
    pub fn respond(&self, needle: impl Into<String>, output: ExecOutput) {
        self.inner.lock().exec_outputs.push((needle.into(), output));
    }

    pub fn set_file(&self, path: impl Into<String>, contents: impl Into<String>) {
        self.inner.lock().files.insert(path.into(), contents.into());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.inner.lock().files.get(path).cloned()
    }

    fn record(&self, call: SandboxCall) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl SandboxAdapter for FakeSandbox {
    async fn create(&self, spec: &SandboxSpec) -> Result<SandboxHandle, SandboxError> {
        self.record(SandboxCall::Create { job_id: spec.job_id.to_string(), env: spec.env.clone() });
        if let Some(ref e) = self.inner.lock().create_error {
            return Err(SandboxError::CreateFailed(e.clone()));
        }
        Ok(SandboxHandle { id: format!("fake-{}", spec.job_id), job_id: spec.job_id.clone() })
    }

    async fn upload(
        &self,
        _handle: &SandboxHandle,
        local: &Path,
        remote: &str,
    ) -> Result<(), SandboxError> {
        self.record(SandboxCall::Upload { local: local.display().to_string(), remote: remote.to_string() });
        if self.inner.lock().upload_errors.iter().any(|n| remote.contains(n.as_str())) {
            return Err(SandboxError::UploadFailed(format!("no such file: {}", local.display())));
        }
        Ok(())
    }

    async fn write_file(
        &self,
        _handle: &SandboxHandle,
        path: &str,
        contents: &[u8],
    ) -> Result<(), SandboxError> {
        self.record(SandboxCall::WriteFile { path: path.to_string() });
        self.inner.lock().files.insert(path.to_string(), String::from_utf8_lossy(contents).into_owned());
        Ok(())
    }

    async fn exec(
        &self,
        _handle: &SandboxHandle,
        argv: &[String],
        _opts: &ExecOptions,
    ) -> Result<ExecProcess, SandboxError> {
        self.record(SandboxCall::Exec { argv: argv.to_vec() });
        let (script, error) = {
            let state = self.inner.lock();
            (state.exec_script.clone(), state.exec_error.clone())
        };
        if let Some(e) = error {
            return Err(SandboxError::ExecFailed(e));
        }

        let mut out = script.stdout_lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        let stdout = Cursor::new(out.into_bytes());
        let stderr = Box::new(Cursor::new(script.stderr.into_bytes()));

        if script.hang {
            let (writer, reader) = tokio::io::duplex(64);
            let control = FakeProcess { sandbox: self.clone(), exit_code: None, writer: Some(writer) };
            return Ok(ExecProcess::new(Box::new(stdout.chain(reader)), stderr, Box::new(control)));
        }
        let control = FakeProcess { sandbox: self.clone(), exit_code: script.exit_code, writer: None };
        Ok(ExecProcess::new(Box::new(stdout), stderr, Box::new(control)))
    }

    async fn exec_output(
        &self,
        _handle: &SandboxHandle,
        argv: &[String],
        _opts: &ExecOptions,
    ) -> Result<ExecOutput, SandboxError> {
        self.record(SandboxCall::ExecOutput { argv: argv.to_vec() });
        let joined = argv.join(" ");
        let state = self.inner.lock();
        let scripted = state.exec_outputs.iter().find(|(needle, _)| joined.contains(needle.as_str()));
        Ok(scripted.map(|(_, out)| out.clone()).unwrap_or_else(|| ExecOutput::ok("")))
    }

    async fn read_file(
        &self,
        _handle: &SandboxHandle,
        path: &str,
    ) -> Result<Option<String>, SandboxError> {
        self.record(SandboxCall::ReadFile { path: path.to_string() });
        Ok(self.file(path))
    }

    async fn kill_process_group(&self, _handle: &SandboxHandle, pid_file: &str) -> Result<(), SandboxError> {
        self.record(SandboxCall::KillGroup { pid_file: pid_file.to_string() });
        Ok(())
    }

    async fn terminate(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.record(SandboxCall::Terminate { id: handle.id.clone() });
        Ok(())
    }
}

/// Process control for scripted execs. A hanging process holds the write
/// half of its stdout open until killed.
struct FakeProcess {
    sandbox: FakeSandbox,
    exit_code: Option<i32>,
    writer: Option<DuplexStream>,
}

#[async_trait]
impl ProcessControl for FakeProcess {
    async fn wait(&mut self) -> Result<Option<i32>, SandboxError> {
        if self.writer.is_some() {
            std::future::pending::<()>().await;
        }
        Ok(self.exit_code)
    }

    async fn kill(&mut self) -> Result<(), SandboxError> {
        self.sandbox.record(SandboxCall::Kill);
        self.writer = None;
        Ok(())
    }
}
