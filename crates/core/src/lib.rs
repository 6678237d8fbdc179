// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-core: Job model, progress grammar, and callback envelope for Shipwright

pub mod macros;

pub mod callback;
pub mod id;
pub mod job;
pub mod plan;
pub mod state;
pub mod step;

pub use callback::{default_pitch, Callback, ErrorPhase, FALLBACK_ERROR, FALLBACK_PITCH};
pub use id::{ellipsize, short};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobSpecBuilder;
pub use job::{
    authenticated_remote, env_keys, GitIdentity, JobId, JobSpec, ProgressMode, ProviderKeys,
    Secret,
};
pub use plan::Plan;
pub use state::{
    FileStateStore, JobStateRecord, MemoryStateStore, StateError, StateStore, STATE_FILE_PATH,
};
pub use step::{find_step_marker, resolve_summary, StepEvent, StepMarker, BUILD_COMPLETE};
