// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment notification: asks Vercel to build the pushed branch.
//!
//! Best-effort only. Every failure is logged and dropped.

use crate::callback::{deliver, CallbackAdapter};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use sw_core::{Callback, JobSpec};

pub const VERCEL_API_BASE: &str = "https://api.vercel.com";

const DEPLOY_TIMEOUT: Duration = Duration::from_secs(30);

#[allow(clippy::expect_used)]
static GITHUB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+?)(?:\.git)?/?$")
        .expect("constant regex pattern is valid")
});

/// `(org, repo)` of a GitHub https URL.
pub fn parse_github_repo(url: &str) -> Option<(String, String)> {
    let caps = GITHUB_REPO.captures(url.trim())?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}

#[derive(Debug, Deserialize)]
struct DeploymentResponse {
    #[serde(default)]
    url: String,
}

/// Triggers Vercel deployments for a job's branch.
#[derive(Clone)]
pub struct DeployNotifier {
    client: reqwest::Client,
    api_base: String,
}

impl DeployNotifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_api_base(client, VERCEL_API_BASE)
    }

    pub fn with_api_base(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self { client, api_base: api_base.into().trim_end_matches('/').to_string() }
    }

    /// Trigger a deployment and report its URL.
    ///
    /// Does nothing without a Vercel token and a GitHub repository URL.
    pub async fn notify<C: CallbackAdapter>(&self, job: &JobSpec, callbacks: &C) -> Option<String> {
        let token = job.vercel_token.as_ref().filter(|t| !t.is_empty())?;
        let repo_url = job.repo_url.as_deref()?;
        let Some((org, repo)) = parse_github_repo(repo_url) else {
            tracing::info!(job_id = %job.id, repo_url, "repo is not a GitHub URL, skipping deployment");
            return None;
        };

        let body = serde_json::json!({
            "name": repo,
            "target": "production",
            "gitSource": {
                "type": "github",
                "org": org,
                "repo": repo,
                "ref": job.branch,
            },
        });
        let result = self
            .client
            .post(format!("{}/v13/deployments", self.api_base))
            .bearer_auth(token.expose())
            .timeout(DEPLOY_TIMEOUT)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "deployment trigger failed");
                return None;
            }
        };
        let url = match response.json::<DeploymentResponse>().await {
            Ok(d) if d.url.is_empty() => return None,
            Ok(d) if d.url.starts_with("http") => d.url,
            Ok(d) => format!("https://{}", d.url),
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "unreadable deployment response");
                return None;
            }
        };

        tracing::info!(job_id = %job.id, %url, "deployment triggered");
        deliver(callbacks, &Callback::deployment(job, url.clone())).await;
        Some(url)
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
