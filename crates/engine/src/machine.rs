// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan/step state machine for stream-mode progress.
//!
//! ```text
//! AwaitingPlan --first text--> Executing(0) --text--> Executing(i+1)
//!      |                            |
//!      +--result--> Terminated <----+--result (emits done step)
//! ```
//!
//! The machine is pure: it turns classified messages into transitions and
//! leaves callbacks, checkpoints and persistence to the executor.

use crate::classify::{AgentMessage, RunResult};
use sw_core::{resolve_summary, Plan, StepEvent};

/// Where the job's progress stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingPlan,
    /// Next step to report.
    Executing { index: u32 },
    Terminated,
}

/// Observable effect of one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Planned(Plan),
    Step(StepEvent),
    /// Terminal `done=true` step, with the agent's final result.
    Completed { step: StepEvent, result: RunResult },
}

#[derive(Debug)]
pub struct StepMachine {
    phase: Phase,
    plan: Option<Plan>,
    /// Tool calls since the last reported step.
    activity: u32,
}

impl Default for StepMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StepMachine {
    pub fn new() -> Self {
        Self { phase: Phase::AwaitingPlan, plan: None, activity: 0 }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Planned step count, 1 before a plan exists.
    pub fn total_steps(&self) -> u32 {
        self.plan.as_ref().map(Plan::total_steps).unwrap_or(1)
    }

    pub fn activity(&self) -> u32 {
        self.activity
    }

    /// Advance on one classified message.
    ///
    /// Messages after termination are ignored.
    pub fn observe(&mut self, message: &AgentMessage) -> Vec<Transition> {
        if self.phase == Phase::Terminated {
            return Vec::new();
        }
        match message {
            AgentMessage::Assistant { .. } => {
                self.activity += message.tool_calls() as u32;
                message.texts().map(|text| self.on_text(text)).collect()
            }
            AgentMessage::Result(result) => {
                let phase = std::mem::replace(&mut self.phase, Phase::Terminated);
                match phase {
                    Phase::Executing { index } => vec![Transition::Completed {
                        step: StepEvent::complete(index),
                        result: result.clone(),
                    }],
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn on_text(&mut self, text: &str) -> Transition {
        match (self.phase, self.plan.as_ref()) {
            (Phase::Executing { index }, Some(plan)) => {
                let step = StepEvent::progress(index, resolve_summary(text, plan, index));
                self.phase = Phase::Executing { index: index + 1 };
                self.activity = 0;
                Transition::Step(step)
            }
            _ => {
                let plan = Plan::parse(text);
                self.plan = Some(plan.clone());
                self.phase = Phase::Executing { index: 0 };
                Transition::Planned(plan)
            }
        }
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
