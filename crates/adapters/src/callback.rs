// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller callbacks: fire-and-forget HTTP POSTs.

use async_trait::async_trait;
use std::time::Duration;
use sw_core::Callback;
use thiserror::Error;

/// Errors from callback delivery
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("controller returned HTTP {0}")]
    Status(u16),
}

/// Adapter for delivering events to the controller
#[async_trait]
pub trait CallbackAdapter: Clone + Send + Sync + 'static {
    /// Deliver one event. A single attempt, never retried.
    async fn send(&self, callback: &Callback) -> Result<(), CallbackError>;
}

/// Deliver an event, logging and swallowing any failure.
pub async fn deliver<C: CallbackAdapter>(callbacks: &C, callback: &Callback) {
    if let Err(e) = callbacks.send(callback).await {
        tracing::warn!(
            job_id = callback.job_id(),
            kind = callback.kind(),
            error = %e,
            "callback delivery failed"
        );
    }
}

/// reqwest-backed callbacks.
///
/// A missing or non-http base URL disables delivery for the whole job; the
/// check happens once, at construction.
#[derive(Clone)]
pub struct HttpCallbacks {
    client: reqwest::Client,
    base: Option<String>,
    timeout: Duration,
}

impl HttpCallbacks {
    /// `base` should already be normalized (see `JobSpec::callback_base`).
    pub fn new(client: reqwest::Client, base: Option<&str>, timeout: Duration) -> Self {
        if base.is_none() {
            tracing::info!("no callback base URL, callbacks disabled");
        }
        Self { client, base: base.map(str::to_string), timeout }
    }

    pub fn is_enabled(&self) -> bool {
        self.base.is_some()
    }
}

#[async_trait]
impl CallbackAdapter for HttpCallbacks {
    async fn send(&self, callback: &Callback) -> Result<(), CallbackError> {
        let Some(ref base) = self.base else {
            return Ok(());
        };
        let url = format!("{}{}", base, callback.path());
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(callback)
            .send()
            .await
            .map_err(|e| CallbackError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallbackError::Status(status.as_u16()));
        }
        tracing::debug!(job_id = callback.job_id(), kind = callback.kind(), "callback delivered");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{CallbackAdapter, CallbackError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use sw_core::Callback;

    struct FakeCallbackState {
        calls: Vec<Callback>,
        fail: bool,
    }

    /// Fake callback adapter for testing
    #[derive(Clone)]
    pub struct FakeCallbacks {
        inner: Arc<Mutex<FakeCallbackState>>,
    }

    impl Default for FakeCallbacks {
        fn default() -> Self {
            Self { inner: Arc::new(Mutex::new(FakeCallbackState { calls: Vec::new(), fail: false })) }
        }
    }

    impl FakeCallbacks {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded callbacks, including failed deliveries
        pub fn calls(&self) -> Vec<Callback> {
            self.inner.lock().calls.clone()
        }

        pub fn kinds(&self) -> Vec<&'static str> {
            self.inner.lock().calls.iter().map(Callback::kind).collect()
        }

        pub fn terminal_count(&self) -> usize {
            self.inner.lock().calls.iter().filter(|c| c.is_terminal()).count()
        }

        /// Make every subsequent delivery fail after being recorded.
        pub fn set_fail(&self, fail: bool) {
            self.inner.lock().fail = fail;
        }
    }

    #[async_trait]
    impl CallbackAdapter for FakeCallbacks {
        async fn send(&self, callback: &Callback) -> Result<(), CallbackError> {
            let mut state = self.inner.lock();
            state.calls.push(callback.clone());
            if state.fail {
                return Err(CallbackError::Status(503));
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCallbacks;

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
