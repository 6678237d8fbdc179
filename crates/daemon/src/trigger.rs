// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP trigger surface: `POST /trigger` starts a job, `GET /health` answers `ok`.
//!
//! The handler never waits for the job. A body that is not a JSON object
//! is the only request-level failure; everything after dispatch is reported through
//! the job's callbacks.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use sw_adapters::{HttpCallbacks, SandboxAdapter};
use sw_core::{GitIdentity, JobId, JobSpec, ProgressMode, ProviderKeys, Secret};
use sw_engine::JobExecutor;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

const DEFAULT_DIAL: u8 = 50;

/// Body of a trigger request. Every field is optional; blanks take defaults.
///
/// Text fields also accept numbers and booleans, taken as their JSON text.
/// Other values count as missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriggerRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub job_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub idea: Option<String>,
    /// Number or numeric string, clamped to 0-100.
    pub risk: Option<Value>,
    pub temperature: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub worker_profile: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub callback_base_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub branch: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub repo_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub github_token: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub vercel_token: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub git_user_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub git_user_email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub claude_oauth_token: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub anthropic_api_key: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub openai_api_key: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub openrouter_api_key: Option<String>,
    /// `stream` or `reporter`; anything else keeps the default.
    #[serde(deserialize_with = "lenient_string")]
    pub progress: Option<String>,
}

impl TriggerRequest {
    pub fn into_job_spec(self) -> JobSpec {
        let identity = GitIdentity::default();
        JobSpec {
            id: filled(self.job_id).map(JobId::from_string).unwrap_or_default(),
            idea: filled(self.idea).unwrap_or_default(),
            risk: dial(self.risk.as_ref()),
            temperature: dial(self.temperature.as_ref()),
            worker_profile: filled(self.worker_profile).unwrap_or_default(),
            branch: filled(self.branch).unwrap_or_else(|| "main".to_string()),
            repo_url: filled(self.repo_url),
            github_token: secret(self.github_token),
            callback_base_url: filled(self.callback_base_url),
            model: filled(self.model),
            vercel_token: secret(self.vercel_token),
            progress: progress_mode(self.progress.as_deref()),
            git_identity: GitIdentity {
                name: filled(self.git_user_name).unwrap_or(identity.name),
                email: filled(self.git_user_email).unwrap_or(identity.email),
            },
            provider_keys: ProviderKeys {
                claude_oauth_token: secret(self.claude_oauth_token),
                anthropic_api_key: secret(self.anthropic_api_key),
                openai_api_key: secret(self.openai_api_key),
                openrouter_api_key: secret(self.openrouter_api_key),
            },
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    })
}

fn filled(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn secret(value: Option<String>) -> Option<Secret> {
    filled(value).map(Secret::new)
}

fn dial(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_DIAL,
    }
}

fn progress_mode(value: Option<&str>) -> ProgressMode {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("stream") => ProgressMode::Stream,
        Some("reporter") => ProgressMode::Reporter,
        _ => ProgressMode::default(),
    }
}

/// Hands accepted jobs to whatever runs them.
pub trait JobDispatcher: Clone + Send + Sync + 'static {
    /// Start the job in the background. Must not block.
    fn dispatch(&self, job: JobSpec);
}

/// Dispatcher that runs each job on its own tracked tokio task.
#[derive(Clone)]
pub struct ExecutorDispatcher<S: SandboxAdapter> {
    executor: JobExecutor<S>,
    http: reqwest::Client,
    callback_timeout: Duration,
    tracker: TaskTracker,
}

impl<S: SandboxAdapter> ExecutorDispatcher<S> {
    pub fn new(
        executor: JobExecutor<S>,
        http: reqwest::Client,
        callback_timeout: Duration,
        tracker: TaskTracker,
    ) -> Self {
        Self { executor, http, callback_timeout, tracker }
    }
}

impl<S: SandboxAdapter> JobDispatcher for ExecutorDispatcher<S> {
    fn dispatch(&self, job: JobSpec) {
        let callbacks =
            HttpCallbacks::new(self.http.clone(), job.callback_base(), self.callback_timeout);
        let executor = self.executor.clone();
        info!(job_id = %job.id, progress = %job.progress, branch = %job.branch, "job accepted");

        self.tracker.spawn(async move {
            let report = executor.run(job, callbacks).await;
            info!(
                job_id = %report.job_id,
                elapsed_ms = report.elapsed.as_millis() as u64,
                exit_code = ?report.agent.exit_code,
                timed_out = report.agent.timed_out,
                guard = ?report.guard,
                error = report.error.as_deref().unwrap_or(""),
                "job finished"
            );
        });
    }
}

/// Build the trigger router.
pub fn router<D: JobDispatcher>(dispatcher: D) -> Router {
    Router::new()
        .route("/trigger", post(trigger::<D>))
        .route("/health", get(health))
        .with_state(dispatcher)
}

async fn trigger<D: JobDispatcher>(
    State(dispatcher): State<D>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let parsed = match serde_json::from_slice::<Value>(&body) {
        Ok(value @ Value::Object(_)) => serde_json::from_value::<TriggerRequest>(value).map_err(|e| e.to_string()),
        Ok(_) => Err("body is not a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    };
    let request = match parsed {
        Ok(request) => request,
        Err(error) => {
            warn!(%error, "rejected trigger with malformed body");
            return (StatusCode::BAD_REQUEST, Json(json!({ "ok": false, "error": "Invalid JSON" })));
        }
    };

    dispatcher.dispatch(request.into_job_spec());
    (StatusCode::OK, Json(json!({ "ok": true, "message": "implementation spawned" })))
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
