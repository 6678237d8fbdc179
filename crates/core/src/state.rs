// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state record: the single source of truth for "did the agent finish?"
//!
//! Written when the plan is known and again on completion, read once after
//! the agent process exits. One record per job, never shared.

use crate::plan::Plan;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Well-known location of the record inside the sandbox.
pub const STATE_FILE_PATH: &str = "/tmp/.sw-state.json";

/// Errors from state record persistence
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state unavailable: {0}")]
    Unavailable(String),
}

/// Persisted progress record, `{idea, totalSteps, planSteps, done}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStateRecord {
    #[serde(default)]
    pub idea: String,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub plan_steps: Vec<String>,
    #[serde(default)]
    pub done: bool,
}

impl JobStateRecord {
    /// Record written when the plan becomes known.
    pub fn started(idea: impl Into<String>, plan: &Plan) -> Self {
        Self {
            idea: idea.into(),
            total_steps: plan.total_steps(),
            plan_steps: plan.steps().to_vec(),
            done: false,
        }
    }

    /// Parse a record, treating blank or `{}` content as an empty record.
    pub fn parse(content: &str) -> Result<Self, StateError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(content)?)
    }
}

/// Read/write access to one job's state record.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the record; `Ok(None)` when it was never written.
    async fn load(&self) -> Result<Option<JobStateRecord>, StateError>;

    async fn save(&self, record: &JobStateRecord) -> Result<(), StateError>;
}

/// In-process record for jobs whose progress is derived from the stream.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Option<JobStateRecord>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<JobStateRecord> {
        self.inner.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<JobStateRecord>, StateError> {
        Ok(self.inner.lock().clone())
    }

    async fn save(&self, record: &JobStateRecord) -> Result<(), StateError> {
        *self.inner.lock() = Some(record.clone());
        Ok(())
    }
}

/// Record stored as a JSON file (used inside the sandbox by the reporting tool).
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_sync(&self) -> Result<Option<JobStateRecord>, StateError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(JobStateRecord::parse(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a sibling temp file and rename so readers never see a torn record.
    pub fn save_sync(&self, record: &JobStateRecord) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(record)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<JobStateRecord>, StateError> {
        self.load_sync()
    }

    async fn save(&self, record: &JobStateRecord) -> Result<(), StateError> {
        self.save_sync(record)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
