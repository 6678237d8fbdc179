// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git command runners: local working tree, sandbox working tree, fake.

use crate::sandbox::{ExecOptions, SandboxAdapter, SandboxHandle};
use crate::subprocess::{run_with_timeout, stderr_text};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from git commands
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
    #[error("git {command} could not run: {reason}")]
    Unavailable { command: String, reason: String },
}

impl GitError {
    /// Stderr captured from the failing command, if any.
    pub fn stderr(&self) -> &str {
        match self {
            GitError::Failed { stderr, .. } => stderr,
            GitError::Unavailable { .. } => "",
        }
    }
}

/// Runs git subcommands in one working tree.
#[async_trait]
pub trait GitRunner: Clone + Send + Sync + 'static {
    /// Run `git <args>`, returning trimmed stdout on success.
    async fn git(&self, args: &[&str], timeout: Duration) -> Result<String, GitError>;
}

/// Subcommand name used in error messages.
fn subcommand(args: &[&str]) -> String {
    args.first().copied().unwrap_or("").to_string()
}

/// Git in a directory on this machine.
#[derive(Debug, Clone)]
pub struct LocalGit {
    workdir: PathBuf,
}

impl LocalGit {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }
}

#[async_trait]
impl GitRunner for LocalGit {
    async fn git(&self, args: &[&str], timeout: Duration) -> Result<String, GitError> {
        let command = subcommand(args);
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(args)
            .current_dir(&self.workdir)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
        let output = run_with_timeout(cmd, timeout, &format!("git {}", command))
            .await
            .map_err(|reason| GitError::Unavailable { command: command.clone(), reason })?;

        if !output.status.success() {
            return Err(GitError::Failed { command, stderr: stderr_text(&output) });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Git in the working tree of a sandbox, through `exec_output`.
#[derive(Clone)]
pub struct SandboxGit<S: SandboxAdapter> {
    sandbox: S,
    handle: SandboxHandle,
    workdir: String,
}

impl<S: SandboxAdapter> SandboxGit<S> {
    pub fn new(sandbox: S, handle: SandboxHandle, workdir: impl Into<String>) -> Self {
        Self { sandbox, handle, workdir: workdir.into() }
    }
}

#[async_trait]
impl<S: SandboxAdapter> GitRunner for SandboxGit<S> {
    async fn git(&self, args: &[&str], timeout: Duration) -> Result<String, GitError> {
        let command = subcommand(args);
        let mut argv = vec!["git".to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        let opts = ExecOptions::new().workdir(self.workdir.clone()).timeout(timeout);

        let output = self
            .sandbox
            .exec_output(&self.handle, &argv, &opts)
            .await
            .map_err(|e| GitError::Unavailable { command: command.clone(), reason: e.to_string() })?;
        if !output.success() {
            return Err(GitError::Failed { command, stderr: output.stderr.trim().to_string() });
        }
        Ok(output.stdout.trim().to_string())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{GitError, GitRunner};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeGitState {
        calls: Vec<Vec<String>>,
        /// subcommand -> 1-based attempt numbers that fail
        failures: HashMap<String, Vec<usize>>,
        attempts: HashMap<String, usize>,
    }

    /// Fake git runner for testing
    #[derive(Clone, Default)]
    pub struct FakeGit {
        inner: Arc<Mutex<FakeGitState>>,
    }

    impl FakeGit {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get every recorded invocation's argv (without the `git`)
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.inner.lock().calls.clone()
        }

        /// Subcommands in invocation order
        pub fn subcommands(&self) -> Vec<String> {
            self.calls().into_iter().filter_map(|c| c.into_iter().next()).collect()
        }

        /// Fail the `attempt`-th (1-based) call of `subcommand`.
        pub fn fail_on(&self, subcommand: &str, attempt: usize) {
            self.inner.lock().failures.entry(subcommand.to_string()).or_default().push(attempt);
        }
    }

    #[async_trait]
    impl GitRunner for FakeGit {
        async fn git(&self, args: &[&str], _timeout: Duration) -> Result<String, GitError> {
            let mut state = self.inner.lock();
            state.calls.push(args.iter().map(|a| a.to_string()).collect());
            let command = args.first().copied().unwrap_or("").to_string();
            let attempt = {
                let n = state.attempts.entry(command.clone()).or_insert(0);
                *n += 1;
                *n
            };
            let fails = state.failures.get(&command).is_some_and(|f| f.contains(&attempt));
            if fails {
                return Err(GitError::Failed { command, stderr: "fatal: simulated failure".to_string() });
            }
            Ok(String::new())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeGit;

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
