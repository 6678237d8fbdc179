// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess helpers with bounded runtimes.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Ceiling for short docker CLI calls (cp, exec of small commands, rm).
pub const DOCKER_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Ceiling for local git calls other than push.
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a command to completion, killing it if it outlives `timeout`.
///
/// `description` names the command in error messages.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(format!("{} failed to start: {}", description, e)),
        Err(_) => Err(format!("{} timed out after {}s", description, timeout.as_secs())),
    }
}

/// Trimmed, lossily decoded stderr of a finished command.
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
