// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";

/// User the agent runs as when `SW_SANDBOX_USER` is unset.
pub const DEFAULT_SANDBOX_USER: &str = "agent";

/// Resolve state directory: SW_STATE_DIR > XDG_STATE_HOME/sw > ~/.local/state/sw
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = non_empty("SW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("sw"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/sw"))
}

/// Address the trigger server binds (default `0.0.0.0:8787`).
pub fn listen_addr() -> Result<SocketAddr, LifecycleError> {
    let raw = non_empty("SW_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    raw.parse().map_err(|_| LifecycleError::InvalidConfig { key: "SW_LISTEN_ADDR", value: raw })
}

/// Sandbox container image override.
pub fn sandbox_image() -> Option<String> {
    non_empty("SW_SANDBOX_IMAGE")
}

/// Agent user inside the sandbox. Set to an empty string to use the image default.
pub fn sandbox_user() -> Option<String> {
    match std::env::var("SW_SANDBOX_USER") {
        Ok(user) if user.trim().is_empty() => None,
        Ok(user) => Some(user.trim().to_string()),
        Err(_) => Some(DEFAULT_SANDBOX_USER.to_string()),
    }
}

/// Hard ceiling for one job, also the sandbox lifetime (default 1900s).
pub fn job_timeout() -> Duration {
    secs("SW_JOB_TIMEOUT_SECS", 1900)
}

/// Agent process timeout (default 1700s). Clamped below the job timeout by the executor.
pub fn agent_timeout() -> Duration {
    secs("SW_AGENT_TIMEOUT_SECS", 1700)
}

/// Per-callback POST timeout (default 10s).
pub fn callback_timeout() -> Duration {
    millis("SW_CALLBACK_TIMEOUT_MS", 10_000)
}

pub fn push_timeout() -> Duration {
    secs("SW_PUSH_TIMEOUT_SECS", 120)
}

/// Grace period for the stderr drain after the agent exits (default 5s).
pub fn drain_grace() -> Duration {
    millis("SW_DRAIN_GRACE_MS", 5_000)
}

pub fn sandbox_create_timeout() -> Duration {
    secs("SW_SANDBOX_CREATE_TIMEOUT_SECS", 120)
}

/// Reporting tool binary uploaded into each sandbox.
pub fn report_bin() -> Option<PathBuf> {
    non_empty("SW_REPORT_BIN").map(PathBuf::from)
}

pub fn skills_dir() -> Option<PathBuf> {
    non_empty("SW_SKILLS_DIR").map(PathBuf::from)
}

pub fn template_dir() -> Option<PathBuf> {
    non_empty("SW_TEMPLATE_DIR").map(PathBuf::from)
}

pub fn max_turns() -> u32 {
    std::env::var("SW_MAX_TURNS")
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(sw_engine::prompt::DEFAULT_MAX_TURNS)
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn secs(key: &str, default: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default))
}

fn millis(key: &str, default: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(default))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
