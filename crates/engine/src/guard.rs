// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion guard: the job's last word.
//!
//! After the agent exits, for any reason, the guard reads the state record.
//! If the agent never marked the job done, it emits the fallback failure
//! `done`. [`CompletionGuard::settle`] consumes the guard, so a job can
//! produce at most one fallback.

use sw_adapters::{deliver, CallbackAdapter};
use sw_core::{Callback, JobSpec, StateStore, FALLBACK_ERROR};

/// What the guard found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The job already emitted its terminal event.
    Completed,
    FallbackSent,
}

pub struct CompletionGuard<C: CallbackAdapter> {
    job: JobSpec,
    callbacks: C,
}

impl<C: CallbackAdapter> CompletionGuard<C> {
    pub fn new(job: &JobSpec, callbacks: C) -> Self {
        Self { job: job.clone(), callbacks }
    }

    /// Check the record and send the fallback terminal if it is not done.
    ///
    /// A record that cannot be read counts as not done.
    pub async fn settle(self, store: &dyn StateStore) -> GuardOutcome {
        let done = match store.load().await {
            Ok(record) => record.is_some_and(|r| r.done),
            Err(e) => {
                tracing::warn!(job_id = %self.job.id, error = %e, "state record unreadable");
                false
            }
        };
        if done {
            tracing::info!(job_id = %self.job.id, "job signaled completion");
            return GuardOutcome::Completed;
        }

        tracing::warn!(job_id = %self.job.id, "agent exited without signaling completion, sending fallback done");
        deliver(&self.callbacks, &Callback::failed(&self.job, FALLBACK_ERROR)).await;
        GuardOutcome::FallbackSent
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
