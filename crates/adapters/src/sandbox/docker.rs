// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker sandbox: one detached container per job.
//!
//! The container runs `sleep <lifetime>` as PID 1 so it expires on its own
//! even if the daemon dies; everything else happens through `docker exec`.

use super::{
    ExecOptions, ExecOutput, ExecProcess, ProcessControl, SandboxAdapter, SandboxError,
    SandboxHandle, SandboxSpec,
};
use crate::subprocess::{run_with_timeout, stderr_text, DOCKER_COMMAND_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Kills the process group led by the PID stored in `$1`.
const KILL_GROUP_SCRIPT: &str = r#"kill -KILL -- -"$(cat "$1")""#;

/// Docker sandbox settings.
#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub image: String,
    /// Non-root user the agent runs as; `None` runs as the image default.
    pub user: Option<String>,
    pub workdir: String,
    pub create_timeout: Duration,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            image: "shipwright-sandbox:latest".to_string(),
            user: None,
            workdir: "/workspace".to_string(),
            create_timeout: Duration::from_secs(120),
        }
    }
}

/// Sandbox adapter backed by the docker CLI.
#[derive(Clone)]
pub struct DockerSandbox {
    config: Arc<DockerConfig>,
}

impl DockerSandbox {
    pub fn new(config: DockerConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    pub fn config(&self) -> &DockerConfig {
        &self.config
    }

    /// `docker exec` argument prefix for a container.
    fn exec_args(&self, handle: &SandboxHandle, opts: &ExecOptions, interactive: bool) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if interactive {
            args.push("-i".to_string());
        }
        if let Some(user) = opts.user.as_ref().or(self.config.user.as_ref()) {
            args.extend(["-u".to_string(), user.clone()]);
        }
        if let Some(ref dir) = opts.workdir {
            args.extend(["-w".to_string(), dir.clone()]);
        }
        for (key, value) in &opts.env {
            args.extend(["-e".to_string(), format!("{}={}", key, value)]);
        }
        args.push(handle.id.clone());
        args
    }

    /// Hand `path` to the agent user when one is configured.
    async fn chown(&self, handle: &SandboxHandle, path: &str) -> Result<(), String> {
        let Some(ref user) = self.config.user else {
            return Ok(());
        };
        let owner = format!("{}:{}", user, user);
        run_docker(
            &["exec", "-u", "root", &handle.id, "chown", "-R", &owner, path],
            DOCKER_COMMAND_TIMEOUT,
        )
        .await
        .map(|_| ())
    }
}

/// Longest job id fragment kept in a container name.
const NAME_ID_MAX: usize = 48;

/// `sw-{job id}-{suffix}`, with the id reduced to docker's name charset.
/// The suffix keeps a re-triggered job id from colliding with a live container.
fn container_name(spec: &SandboxSpec) -> String {
    let id: String = spec
        .job_id
        .as_str()
        .chars()
        .take(NAME_ID_MAX)
        .map(|c| if c.is_ascii_alphanumeric() || "_.-".contains(c) { c } else { '-' })
        .collect();
    format!("sw-{}-{}", id, nanoid::nanoid!(6, &NAME_SUFFIX_ALPHABET))
}

const NAME_SUFFIX_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

#[async_trait]
impl SandboxAdapter for DockerSandbox {
    async fn create(&self, spec: &SandboxSpec) -> Result<SandboxHandle, SandboxError> {
        let name = container_name(spec);
        let lifetime = spec.lifetime.as_secs().max(1).to_string();

        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            name.clone(),
            "-w".into(),
            self.config.workdir.clone(),
        ];
        for (key, value) in &spec.env {
            args.extend(["-e".to_string(), format!("{}={}", key, value)]);
        }
        args.extend([self.config.image.clone(), "sleep".into(), lifetime]);

        tracing::info!(
            job_id = %spec.job_id,
            container = %name,
            image = %self.config.image,
            "creating docker sandbox"
        );
        let start = Instant::now();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_docker(&arg_refs, self.config.create_timeout)
            .await
            .map_err(SandboxError::CreateFailed)?;

        let handle = SandboxHandle { id: name, job_id: spec.job_id.clone() };
        if let Err(e) = self.chown(&handle, &self.config.workdir).await {
            // Container exists at this point; release it before reporting.
            let _ = run_docker(&["rm", "-f", &handle.id], DOCKER_COMMAND_TIMEOUT).await;
            return Err(SandboxError::CreateFailed(e));
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(job_id = %spec.job_id, container = %handle.id, elapsed_ms, "docker sandbox ready");
        Ok(handle)
    }

    async fn upload(
        &self,
        handle: &SandboxHandle,
        local: &Path,
        remote: &str,
    ) -> Result<(), SandboxError> {
        run_docker(&["exec", "-u", "root", &handle.id, "mkdir", "-p", parent_dir(remote)], DOCKER_COMMAND_TIMEOUT)
            .await
            .map_err(SandboxError::UploadFailed)?;

        let local_str = local.display().to_string();
        let target = format!("{}:{}", handle.id, remote);
        run_docker(&["cp", &local_str, &target], DOCKER_COMMAND_TIMEOUT)
            .await
            .map_err(SandboxError::UploadFailed)?;
        self.chown(handle, remote).await.map_err(SandboxError::UploadFailed)?;

        tracing::debug!(container = %handle.id, local = %local_str, remote, "uploaded to sandbox");
        Ok(())
    }

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        contents: &[u8],
    ) -> Result<(), SandboxError> {
        let mut args = self.exec_args(handle, &ExecOptions::new(), true);
        args.extend([
            "sh".to_string(),
            "-c".to_string(),
            r#"mkdir -p "$(dirname "$1")" && cat > "$1""#.to_string(),
            "sh".to_string(),
            path.to_string(),
        ]);

        let mut child = Command::new("docker")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::UploadFailed(format!("failed to exec docker: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(contents)
                .await
                .map_err(|e| SandboxError::UploadFailed(format!("write {}: {}", path, e)))?;
        }

        let output = tokio::time::timeout(DOCKER_COMMAND_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| SandboxError::UploadFailed(format!("write {} timed out", path)))?
            .map_err(|e| SandboxError::UploadFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SandboxError::UploadFailed(format!(
                "write {}: {}",
                path,
                stderr_text(&output)
            )));
        }
        Ok(())
    }

    async fn exec(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        opts: &ExecOptions,
    ) -> Result<ExecProcess, SandboxError> {
        let mut args = self.exec_args(handle, opts, true);
        args.extend(argv.iter().cloned());

        let mut child = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::ExecFailed(format!("failed to exec docker: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::ExecFailed("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::ExecFailed("stderr not captured".to_string()))?;

        tracing::debug!(container = %handle.id, program = argv.first().map(String::as_str).unwrap_or(""), "exec started");
        Ok(ExecProcess::new(Box::new(stdout), Box::new(stderr), Box::new(child)))
    }

    async fn exec_output(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        opts: &ExecOptions,
    ) -> Result<ExecOutput, SandboxError> {
        let mut args = self.exec_args(handle, opts, false);
        args.extend(argv.iter().cloned());

        let mut cmd = Command::new("docker");
        cmd.args(&args);
        let timeout = opts.timeout.unwrap_or(DOCKER_COMMAND_TIMEOUT);
        let description = format!("exec {}", argv.first().map(String::as_str).unwrap_or(""));
        let output = run_with_timeout(cmd, timeout, &description)
            .await
            .map_err(SandboxError::ExecFailed)?;

        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn read_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
    ) -> Result<Option<String>, SandboxError> {
        let argv = vec!["cat".to_string(), path.to_string()];
        let output = self
            .exec_output(handle, &argv, &ExecOptions::new())
            .await
            .map_err(|e| SandboxError::ReadFailed(e.to_string()))?;
        Ok(output.success().then_some(output.stdout))
    }

    async fn kill_process_group(&self, handle: &SandboxHandle, pid_file: &str) -> Result<(), SandboxError> {
        tracing::info!(job_id = %handle.job_id, container = %handle.id, pid_file, "killing process group");
        run_docker(
            &["exec", "-u", "root", &handle.id, "sh", "-c", KILL_GROUP_SCRIPT, "sh", pid_file],
            DOCKER_COMMAND_TIMEOUT,
        )
        .await
        .map(|_| ())
        .map_err(SandboxError::ExecFailed)
    }

    async fn terminate(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        tracing::info!(job_id = %handle.job_id, container = %handle.id, "terminating docker sandbox");
        run_docker(&["rm", "-f", &handle.id], DOCKER_COMMAND_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(SandboxError::TerminateFailed)
    }
}

#[async_trait]
impl ProcessControl for Child {
    async fn wait(&mut self) -> Result<Option<i32>, SandboxError> {
        let status = Child::wait(self).await.map_err(|e| SandboxError::ExecFailed(e.to_string()))?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> Result<(), SandboxError> {
        Child::kill(self).await.map_err(|e| SandboxError::ExecFailed(e.to_string()))
    }
}

/// Run a docker CLI command and return stdout on success.
async fn run_docker(args: &[&str], timeout: Duration) -> Result<String, String> {
    let mut cmd = Command::new("docker");
    cmd.args(args);
    let description = format!("docker {}", args.first().unwrap_or(&""));
    let output = run_with_timeout(cmd, timeout, &description).await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(format!("{} failed: {}", description, stderr_text(&output)))
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
