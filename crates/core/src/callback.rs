// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback envelope delivered to the external controller.
//!
//! Every event is POSTed as a camelCase JSON body to
//! `{callback_base_url}/v1.0/log/{kind}`.

use crate::id::short;
use crate::job::JobSpec;
use crate::plan::Plan;
use crate::step::StepEvent;
use serde::{Deserialize, Serialize};

/// Diagnostic carried by the fallback terminal event.
pub const FALLBACK_ERROR: &str = "Agent exited without signaling completion";

/// Pitch carried by the fallback terminal event.
pub const FALLBACK_PITCH: &str = "Build did not complete";

/// Maximum idea characters quoted in a default pitch.
const PITCH_IDEA_CHARS: usize = 120;

/// Pitch used when the agent did not write one.
pub fn default_pitch(idea: &str) -> String {
    format!("Built with Shipwright: {}", short(idea.trim(), PITCH_IDEA_CHARS))
}

/// Job phase an `error` callback refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    SandboxCreate,
    Upload,
    AgentLaunch,
    GitInit,
    GitPush,
}

crate::simple_display! {
    ErrorPhase {
        SandboxCreate => "sandbox_create",
        Upload => "upload",
        AgentLaunch => "agent_launch",
        GitInit => "git_init",
        GitPush => "git_push",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub job_id: String,
    pub idea: String,
    pub temperature: u8,
    pub risk: u8,
    pub branch: String,
    pub total_steps: u32,
    pub plan_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPayload {
    pub job_id: String,
    pub step_index: u32,
    pub total_steps: u32,
    pub done: bool,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub job_id: String,
    pub step_index: u32,
    pub branch: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonePayload {
    pub job_id: String,
    pub repo_url: String,
    pub idea: String,
    pub pitch: String,
    pub success: bool,
    pub error: Option<String>,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub job_id: String,
    pub error: String,
    pub phase: ErrorPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPayload {
    pub job_id: String,
    pub url: String,
}

/// One controller-bound event. Serializes to its payload alone; the kind
/// travels in the URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Callback {
    Start(StartPayload),
    Step(StepPayload),
    Push(PushPayload),
    Done(DonePayload),
    Error(ErrorPayload),
    Deployment(DeploymentPayload),
}

impl Callback {
    pub fn start(spec: &JobSpec, plan: &Plan) -> Self {
        Callback::Start(StartPayload {
            job_id: spec.id.to_string(),
            idea: spec.idea.clone(),
            temperature: spec.temperature,
            risk: spec.risk,
            branch: spec.branch.clone(),
            total_steps: plan.total_steps(),
            plan_steps: plan.steps().to_vec(),
        })
    }

    pub fn step(spec: &JobSpec, step: &StepEvent, total_steps: u32) -> Self {
        Callback::Step(StepPayload {
            job_id: spec.id.to_string(),
            step_index: step.index,
            total_steps,
            done: step.done,
            summary: step.summary.clone(),
        })
    }

    pub fn push(spec: &JobSpec, step_index: u32, summary: &str) -> Self {
        Callback::Push(PushPayload {
            job_id: spec.id.to_string(),
            step_index,
            branch: spec.branch.clone(),
            summary: summary.to_string(),
        })
    }

    /// Successful terminal event.
    pub fn done(spec: &JobSpec, pitch: impl Into<String>) -> Self {
        Callback::Done(DonePayload {
            job_id: spec.id.to_string(),
            repo_url: spec.public_repo_url().to_string(),
            idea: spec.idea.clone(),
            pitch: pitch.into(),
            success: true,
            error: None,
            branch: spec.branch.clone(),
        })
    }

    /// Failed terminal event.
    pub fn failed(spec: &JobSpec, error: impl Into<String>) -> Self {
        Callback::Done(DonePayload {
            job_id: spec.id.to_string(),
            repo_url: spec.public_repo_url().to_string(),
            idea: spec.idea.clone(),
            pitch: FALLBACK_PITCH.to_string(),
            success: false,
            error: Some(error.into()),
            branch: spec.branch.clone(),
        })
    }

    pub fn error(spec: &JobSpec, phase: ErrorPhase, error: impl Into<String>) -> Self {
        Callback::Error(ErrorPayload {
            job_id: spec.id.to_string(),
            error: error.into(),
            phase,
            stderr: None,
        })
    }

    pub fn deployment(spec: &JobSpec, url: impl Into<String>) -> Self {
        Callback::Deployment(DeploymentPayload { job_id: spec.id.to_string(), url: url.into() })
    }

    /// Attach captured stderr to an `error` event; other kinds are unchanged.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        if let Callback::Error(ref mut payload) = self {
            let stderr = stderr.into();
            if !stderr.trim().is_empty() {
                payload.stderr = Some(stderr);
            }
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Callback::Start(_) => "start",
            Callback::Step(_) => "step",
            Callback::Push(_) => "push",
            Callback::Done(_) => "done",
            Callback::Error(_) => "error",
            Callback::Deployment(_) => "deployment",
        }
    }

    /// Path relative to the callback base URL.
    pub fn path(&self) -> String {
        format!("/v1.0/log/{}", self.kind())
    }

    pub fn job_id(&self) -> &str {
        match self {
            Callback::Start(p) => &p.job_id,
            Callback::Step(p) => &p.job_id,
            Callback::Push(p) => &p.job_id,
            Callback::Done(p) => &p.job_id,
            Callback::Error(p) => &p.job_id,
            Callback::Deployment(p) => &p.job_id,
        }
    }

    /// True for the event that closes the job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Callback::Done(_))
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
