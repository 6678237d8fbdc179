// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptor: identity, build intent, tunables, and delivery targets.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Identifier of one build job.
    ///
    /// Usually supplied by the controller in the trigger request; generated
    /// locally only when the request leaves it blank.
    pub struct JobId("job-");
}

/// Environment variable names injected into the sandbox and read back by
/// the in-sandbox reporting tool.
pub mod env_keys {
    pub const JOB_ID: &str = "SW_JOB_ID";
    pub const IDEA: &str = "SW_IDEA";
    pub const RISK: &str = "SW_RISK";
    pub const TEMPERATURE: &str = "SW_TEMPERATURE";
    pub const WORKER_PROFILE: &str = "SW_WORKER_PROFILE";
    pub const CALLBACK_BASE_URL: &str = "SW_CALLBACK_BASE_URL";
    pub const BRANCH: &str = "SW_BRANCH";
    pub const REPO_URL: &str = "SW_REPO_URL";
    pub const GIT_USER_NAME: &str = "SW_GIT_USER_NAME";
    pub const GIT_USER_EMAIL: &str = "SW_GIT_USER_EMAIL";
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const VERCEL_TOKEN: &str = "VERCEL_TOKEN";
    pub const CLAUDE_OAUTH_TOKEN: &str = "CLAUDE_CODE_OAUTH_TOKEN";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
}

/// A credential value that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// How the job learns about the agent's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    /// The orchestrator derives plan and steps from the agent's output stream.
    Stream,
    /// The agent reports through the in-sandbox reporting tool.
    #[default]
    Reporter,
}

crate::simple_display! {
    ProgressMode {
        Stream => "stream",
        Reporter => "reporter",
    }
}

/// Commit identity used for checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for GitIdentity {
    fn default() -> Self {
        Self { name: "Shipwright".to_string(), email: "bot@shipwright.dev".to_string() }
    }
}

/// Optional model-provider credentials forwarded into the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub claude_oauth_token: Option<Secret>,
    pub anthropic_api_key: Option<Secret>,
    pub openai_api_key: Option<Secret>,
    pub openrouter_api_key: Option<Secret>,
}

/// Immutable description of one build job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub id: JobId,
    /// Build intent handed to the agent.
    pub idea: String,
    /// Risk appetite, 0-100.
    pub risk: u8,
    /// Creativity, 0-100.
    pub temperature: u8,
    pub worker_profile: String,
    /// Target branch for checkpoints.
    pub branch: String,
    pub repo_url: Option<String>,
    /// Push credential for `repo_url`.
    pub github_token: Option<Secret>,
    pub callback_base_url: Option<String>,
    pub model: Option<String>,
    pub vercel_token: Option<Secret>,
    pub progress: ProgressMode,
    pub git_identity: GitIdentity,
    pub provider_keys: ProviderKeys,
}

crate::builder! {
    pub struct JobSpecBuilder => JobSpec {
        into {
            id: JobId = JobId::from_string("job-test"),
            idea: String = "a todo app",
            worker_profile: String = "",
            branch: String = "main",
        }
        set {
            risk: u8 = 50,
            temperature: u8 = 50,
            progress: ProgressMode = ProgressMode::Stream,
            git_identity: GitIdentity = GitIdentity::default(),
            provider_keys: ProviderKeys = ProviderKeys::default(),
        }
        option {
            repo_url: String = None,
            github_token: Secret = None,
            callback_base_url: String = Some("http://controller.test".to_string()),
            model: String = None,
            vercel_token: Secret = None,
        }
    }
}

impl JobSpec {
    /// Callback base address without a trailing slash.
    ///
    /// Returns `None` when no usable http(s) address was configured, which
    /// turns every callback for the job into a no-op.
    pub fn callback_base(&self) -> Option<&str> {
        let base = self.callback_base_url.as_deref()?.trim().trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            Some(base)
        } else {
            None
        }
    }

    /// Remote URL with the push credential embedded, if pushing is possible.
    pub fn push_url(&self) -> Option<String> {
        let repo = self.repo_url.as_deref().filter(|r| !r.trim().is_empty())?;
        let token = self.github_token.as_ref().filter(|t| !t.is_empty())?;
        authenticated_remote(repo, token.expose())
    }

    /// Repository URL as reported to the controller (never carries the token).
    pub fn public_repo_url(&self) -> &str {
        self.repo_url.as_deref().unwrap_or("")
    }

    /// Environment injected into the sandbox for the agent and reporting tool.
    pub fn sandbox_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (env_keys::JOB_ID.to_string(), self.id.to_string()),
            (env_keys::IDEA.to_string(), self.idea.clone()),
            (env_keys::RISK.to_string(), self.risk.to_string()),
            (env_keys::TEMPERATURE.to_string(), self.temperature.to_string()),
            (env_keys::WORKER_PROFILE.to_string(), self.worker_profile.clone()),
            (env_keys::BRANCH.to_string(), self.branch.clone()),
            (env_keys::GIT_USER_NAME.to_string(), self.git_identity.name.clone()),
            (env_keys::GIT_USER_EMAIL.to_string(), self.git_identity.email.clone()),
        ];
        if let Some(base) = self.callback_base() {
            env.push((env_keys::CALLBACK_BASE_URL.to_string(), base.to_string()));
        }
        if let Some(ref repo) = self.repo_url {
            env.push((env_keys::REPO_URL.to_string(), repo.clone()));
        }
        let secrets = [
            (env_keys::GITHUB_TOKEN, &self.github_token),
            (env_keys::VERCEL_TOKEN, &self.vercel_token),
            (env_keys::CLAUDE_OAUTH_TOKEN, &self.provider_keys.claude_oauth_token),
            (env_keys::ANTHROPIC_API_KEY, &self.provider_keys.anthropic_api_key),
            (env_keys::OPENAI_API_KEY, &self.provider_keys.openai_api_key),
            (env_keys::OPENROUTER_API_KEY, &self.provider_keys.openrouter_api_key),
        ];
        for (key, value) in secrets {
            if let Some(secret) = value.as_ref().filter(|s| !s.is_empty()) {
                env.push((key.to_string(), secret.expose().to_string()));
            }
        }
        env
    }

    /// Rebuild the job description from sandbox environment variables.
    ///
    /// Used by the reporting tool. Missing values fall back to the same
    /// defaults the trigger layer applies.
    pub fn from_env_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secret = |key: &str| get(key).map(Secret::new);
        let identity = GitIdentity::default();
        Self {
            id: get(env_keys::JOB_ID).map(JobId::from).unwrap_or_else(|| JobId::from_string("")),
            idea: get(env_keys::IDEA).unwrap_or_default(),
            risk: get(env_keys::RISK).and_then(|v| v.parse().ok()).unwrap_or(50),
            temperature: get(env_keys::TEMPERATURE).and_then(|v| v.parse().ok()).unwrap_or(50),
            worker_profile: get(env_keys::WORKER_PROFILE).unwrap_or_default(),
            branch: get(env_keys::BRANCH).unwrap_or_else(|| "main".to_string()),
            repo_url: get(env_keys::REPO_URL),
            github_token: secret(env_keys::GITHUB_TOKEN),
            callback_base_url: get(env_keys::CALLBACK_BASE_URL),
            model: None,
            vercel_token: secret(env_keys::VERCEL_TOKEN),
            progress: ProgressMode::Reporter,
            git_identity: GitIdentity {
                name: get(env_keys::GIT_USER_NAME).unwrap_or(identity.name),
                email: get(env_keys::GIT_USER_EMAIL).unwrap_or(identity.email),
            },
            provider_keys: ProviderKeys::default(),
        }
    }
}

/// Embed a token credential into an https remote URL.
///
/// Non-https remotes cannot carry a token this way and yield `None`.
pub fn authenticated_remote(repo_url: &str, token: &str) -> Option<String> {
    let rest = repo_url.trim().strip_prefix("https://")?;
    Some(format!("https://x-access-token:{}@{}", token, rest))
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
