// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step commit-and-push of the agent's working tree.
//!
//! Whether checkpointing is possible is decided once, when the committer is
//! built: without a repo URL and push credential it stays disabled for the
//! whole job and never runs git.

use crate::callback::{deliver, CallbackAdapter};
use crate::git::{GitError, GitRunner};
use crate::subprocess::GIT_COMMAND_TIMEOUT;
use std::time::Duration;
use sw_core::{short, Callback, ErrorPhase, JobSpec};

/// Longest commit subject we write.
pub const MAX_COMMIT_MESSAGE: usize = 72;

/// Default ceiling for `git push`.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(120);

/// Seeded into the workspace before the agent starts.
pub const GITIGNORE: &str = "node_modules/\n.next/\nout/\ndist/\nbuild/\n.turbo/\n.vercel/\n*.tsbuildinfo\n.env\n.env.*\n!.env.example\n";

/// Commit subject for a numbered step.
pub fn step_message(index: u32, summary: &str) -> String {
    format!("Step {}: {}", index, summary)
}

/// Commit subject for the final checkpoint.
pub const FINAL_MESSAGE: &str = "Final: complete build";

/// Outcome of one checkpoint attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// No credential, or disabled after a bootstrap failure.
    Skipped,
    Pushed,
    Failed,
}

/// Commits and force-pushes the working tree, never failing the job.
#[derive(Clone)]
pub struct Checkpointer<G: GitRunner, C: CallbackAdapter> {
    git: G,
    callbacks: C,
    job: JobSpec,
    push_url: Option<String>,
    push_timeout: Duration,
}

impl<G: GitRunner, C: CallbackAdapter> Checkpointer<G, C> {
    pub fn new(job: &JobSpec, git: G, callbacks: C) -> Self {
        let push_url = job.push_url();
        if push_url.is_none() {
            tracing::info!(job_id = %job.id, "no push credential, checkpoints disabled");
        }
        Self { git, callbacks, job: job.clone(), push_url, push_timeout: DEFAULT_PUSH_TIMEOUT }
    }

    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.push_url.is_some()
    }

    /// Turn checkpointing off for the rest of the job.
    pub fn disable(&mut self) {
        self.push_url = None;
    }

    /// Initialize the repository with bot identity, branch, and remote.
    ///
    /// On failure, reports `git_init` and disables checkpointing. Returns
    /// whether checkpoints remain enabled.
    pub async fn bootstrap(&mut self) -> bool {
        let Some(url) = self.push_url.clone() else {
            return false;
        };
        let name = self.job.git_identity.name.clone();
        let email = self.job.git_identity.email.clone();
        let branch = self.job.branch.clone();
        let steps: [&[&str]; 5] = [
            &["init", "-q"],
            &["config", "user.name", &name],
            &["config", "user.email", &email],
            &["branch", "-M", &branch],
            &["remote", "add", "origin", &url],
        ];

        let mut failure = None;
        for args in steps {
            if let Err(e) = self.git.git(args, GIT_COMMAND_TIMEOUT).await {
                failure = Some(e);
                break;
            }
        }
        let Some(e) = failure else {
            tracing::info!(job_id = %self.job.id, %branch, "git repository initialized");
            return true;
        };

        tracing::warn!(job_id = %self.job.id, phase = "git_init", error = %e, "git bootstrap failed");
        let event =
            Callback::error(&self.job, ErrorPhase::GitInit, e.to_string()).with_stderr(e.stderr());
        deliver(&self.callbacks, &event).await;
        self.disable();
        false
    }

    /// Stage everything, commit `message`, and force-push the branch.
    ///
    /// Failures are logged and reported as `git_push` errors, never raised.
    pub async fn checkpoint(&self, step_index: Option<u32>, message: &str) -> CheckpointOutcome {
        let Some(ref url) = self.push_url else {
            return CheckpointOutcome::Skipped;
        };
        match self.commit_and_push(url, message).await {
            Ok(()) => {
                tracing::info!(job_id = %self.job.id, ?step_index, message = short(message, MAX_COMMIT_MESSAGE), "checkpoint pushed");
                CheckpointOutcome::Pushed
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job.id, ?step_index, phase = "git_push", error = %e, "checkpoint failed");
                let event = Callback::error(&self.job, ErrorPhase::GitPush, format!("git push failed: {}", e))
                    .with_stderr(e.stderr());
                deliver(&self.callbacks, &event).await;
                CheckpointOutcome::Failed
            }
        }
    }

    async fn commit_and_push(&self, url: &str, message: &str) -> Result<(), GitError> {
        // The agent may have rewritten the remote; the token URL must win.
        if let Err(e) = self.git.git(&["remote", "set-url", "origin", url], GIT_COMMAND_TIMEOUT).await {
            tracing::debug!(job_id = %self.job.id, error = %e, "remote set-url failed, pushing anyway");
        }
        self.git.git(&["add", "-A"], GIT_COMMAND_TIMEOUT).await?;
        let subject = short(message, MAX_COMMIT_MESSAGE);
        self.git.git(&["commit", "--allow-empty", "-m", subject], GIT_COMMAND_TIMEOUT).await?;
        self.git.git(&["push", "--force", "-u", "origin", &self.job.branch], self.push_timeout).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
