// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-engine: Job execution, output classification, and progress tracking

pub mod classify;
pub mod executor;
pub mod guard;
pub mod job_logger;
pub mod machine;
pub mod prompt;
pub mod state;

pub use classify::{classify_line, summarize_tool_input, AgentMessage, ContentBlock, RunResult};
pub use executor::{AgentRun, ExecutorConfig, JobError, JobExecutor, JobReport};
pub use guard::{CompletionGuard, GuardOutcome};
pub use job_logger::{JobLogEntry, JobLogMessage, JobLogSink, JobLogger};
pub use machine::{Phase, StepMachine, Transition};
pub use prompt::{AgentCommand, PromptFiles, REPORT_TOOL_PATH};
pub use state::SandboxStateStore;
