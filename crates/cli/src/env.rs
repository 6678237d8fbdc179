// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment the reporting tool runs in, as set up by the sandbox.

use std::path::PathBuf;
use std::time::Duration;

use sw_core::{JobSpec, STATE_FILE_PATH};

/// Working tree the agent builds in.
pub const DEFAULT_WORKSPACE: &str = "/workspace";

/// Per-callback POST timeout.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(15);

/// State record location (SW_STATE_FILE, default `/tmp/.sw-state.json`).
pub fn state_file() -> PathBuf {
    non_empty("SW_STATE_FILE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(STATE_FILE_PATH))
}

pub fn workspace() -> PathBuf {
    non_empty("SW_WORKSPACE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE))
}

/// Job description injected into the sandbox environment.
pub fn job() -> JobSpec {
    JobSpec::from_env_lookup(|key| std::env::var(key).ok())
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
