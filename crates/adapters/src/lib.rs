// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-adapters: Adapters for external I/O (sandboxes, controller, git, deploys)

pub mod callback;
pub mod checkpoint;
pub mod deploy;
pub mod git;
pub mod sandbox;
pub mod subprocess;

pub use callback::{deliver, CallbackAdapter, CallbackError, HttpCallbacks};
pub use checkpoint::{step_message, CheckpointOutcome, Checkpointer, FINAL_MESSAGE, GITIGNORE};
pub use deploy::DeployNotifier;
pub use git::{GitError, GitRunner, LocalGit, SandboxGit};
pub use sandbox::{
    argv, DockerConfig, DockerSandbox, ExecOptions, ExecOutput, ExecProcess, ProcessControl,
    ProcessStream, SandboxAdapter, SandboxError, SandboxHandle, SandboxSpec,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use callback::FakeCallbacks;
#[cfg(any(test, feature = "test-support"))]
pub use git::FakeGit;
#[cfg(any(test, feature = "test-support"))]
pub use sandbox::{ExecScript, FakeSandbox, SandboxCall};
