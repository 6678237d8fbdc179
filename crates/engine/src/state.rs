// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State record stored as a file inside the sandbox.
//!
//! The reporting tool writes the record; the engine reads it once the agent
//! exits. Content that does not parse means the agent never finished.

use async_trait::async_trait;
use sw_adapters::{SandboxAdapter, SandboxHandle};
use sw_core::{JobStateRecord, StateError, StateStore};

pub struct SandboxStateStore<S: SandboxAdapter> {
    sandbox: S,
    handle: SandboxHandle,
    path: String,
}

impl<S: SandboxAdapter> SandboxStateStore<S> {
    pub fn new(sandbox: S, handle: SandboxHandle, path: impl Into<String>) -> Self {
        Self { sandbox, handle, path: path.into() }
    }
}

#[async_trait]
impl<S: SandboxAdapter> StateStore for SandboxStateStore<S> {
    async fn load(&self) -> Result<Option<JobStateRecord>, StateError> {
        let content = self
            .sandbox
            .read_file(&self.handle, &self.path)
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        content.map(|c| JobStateRecord::parse(&c)).transpose()
    }

    async fn save(&self, record: &JobStateRecord) -> Result<(), StateError> {
        let body = serde_json::to_vec(record)?;
        self.sandbox
            .write_file(&self.handle, &self.path, &body)
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
