// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three reports an agent makes: plan started, step finished, build done.
//!
//! The state record is the only thing shared between invocations. `done`
//! flips its flag last, after the terminal callback has been attempted, so
//! a record marked done always means the terminal event went out. The
//! executor only reads the record once the agent, and any `done` it was
//! running, has exited or been killed.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sw_adapters::{
    deliver, step_message, CallbackAdapter, Checkpointer, DeployNotifier, GitRunner, FINAL_MESSAGE,
};
use sw_core::{
    default_pitch, Callback, FileStateStore, JobSpec, JobStateRecord, Plan, StateStore, StepEvent,
};
use tracing::{info, warn};

/// File the agent may leave in the workspace to describe what it built.
pub const PITCH_FILE: &str = "PITCH.md";

pub struct Reporter<G: GitRunner, C: CallbackAdapter> {
    job: JobSpec,
    callbacks: C,
    checkpointer: Checkpointer<G, C>,
    store: FileStateStore,
    deploy: Option<DeployNotifier>,
    workspace: PathBuf,
}

impl<G: GitRunner, C: CallbackAdapter> Reporter<G, C> {
    pub fn new(
        job: JobSpec,
        git: G,
        callbacks: C,
        store: FileStateStore,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        let checkpointer = Checkpointer::new(&job, git, callbacks.clone());
        Self { job, callbacks, checkpointer, store, deploy: None, workspace: workspace.into() }
    }

    pub fn with_deploy(mut self, deploy: DeployNotifier) -> Self {
        self.deploy = Some(deploy);
        self
    }

    /// Record the plan and announce it.
    pub async fn start(&self, idea: &str, steps: Vec<String>) -> Result<()> {
        let job = self.job_with_idea(idea);
        let plan = Plan::from_labels(steps);
        self.store.save(&JobStateRecord::started(idea, &plan)).await?;

        deliver(&self.callbacks, &Callback::start(&job, &plan)).await;
        info!(job_id = %job.id, total_steps = plan.total_steps(), "started: {}", idea);
        Ok(())
    }

    /// Checkpoint a finished step, then report it and its push.
    ///
    /// The index is passed through exactly as the agent gave it.
    pub async fn step(&self, index: u32, summary: &str) -> Result<()> {
        let record = self.load_record().await;

        self.checkpointer.checkpoint(Some(index), &step_message(index, summary)).await;

        let event = StepEvent::progress(index, summary);
        deliver(&self.callbacks, &Callback::step(&self.job, &event, record.total_steps)).await;
        deliver(&self.callbacks, &Callback::push(&self.job, index, summary)).await;

        if let Some(ref deploy) = self.deploy {
            deploy.notify(&self.job, &self.callbacks).await;
        }
        info!(job_id = %self.job.id, step_index = index, total_steps = record.total_steps, "step: {}", summary);
        Ok(())
    }

    /// Final checkpoint and terminal callback. A second call does nothing.
    pub async fn done(&self) -> Result<()> {
        let mut record = self.load_record().await;
        if record.done {
            info!(job_id = %self.job.id, "already reported done");
            return Ok(());
        }

        let idea = if record.idea.is_empty() { self.job.idea.clone() } else { record.idea.clone() };
        let job = self.job_with_idea(&idea);
        let pitch = read_pitch(&self.workspace).unwrap_or_else(|| default_pitch(&idea));

        self.checkpointer.checkpoint(None, FINAL_MESSAGE).await;
        deliver(&self.callbacks, &Callback::done(&job, pitch)).await;

        record.idea = idea;
        record.done = true;
        self.store.save(&record).await?;
        info!(job_id = %job.id, "done");
        Ok(())
    }

    /// Current record; unreadable or missing state reads as empty.
    async fn load_record(&self) -> JobStateRecord {
        match self.store.load().await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(job_id = %self.job.id, path = %self.store.path().display(), error = %e, "unreadable state record");
                JobStateRecord::default()
            }
        }
    }

    fn job_with_idea(&self, idea: &str) -> JobSpec {
        let mut job = self.job.clone();
        job.idea = idea.to_string();
        job
    }
}

/// Trimmed contents of `PITCH.md`, if present and non-empty.
pub fn read_pitch(workspace: &Path) -> Option<String> {
    let content = std::fs::read_to_string(workspace.join(PITCH_FILE)).ok()?;
    let pitch = content.trim();
    if pitch.is_empty() {
        return None;
    }
    info!(chars = pitch.chars().count(), "read {}", PITCH_FILE);
    Some(pitch.to_string())
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
