// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent prompts and the command line that runs the agent CLI.

use sw_core::{JobId, JobSpec, ProgressMode};

/// Where the reporting tool is installed inside the sandbox.
pub const REPORT_TOOL_PATH: &str = "/usr/local/bin/sw-report";

/// Appended to the idea to form the task prompt.
pub const AUTONOMY_SUFFIX: &str =
    "\nStart thinking about what to build then build it. You have full autonomy to execute.";

pub const DEFAULT_MAX_TURNS: u32 = 100;

const REPORTER_PROTOCOL: &str = r#"## sw-report Tool

You have access to a `sw-report` CLI tool for reporting your progress. You MUST use it at key milestones.

1. **After planning**, report your idea and plan:
```bash
sw-report start --idea "Your idea description" --steps "Step 1 label" "Step 2 label" "Step 3 label"
```

2. **After completing each step**, report progress (this commits and pushes your code):
```bash
sw-report step --index 1 --summary "Scaffold project"
```

3. **After writing PITCH.md and finishing everything**, report completion:
```bash
sw-report done
```

### Rules
- Call `sw-report start` early, right after you decide what to build.
- Call `sw-report step` after each meaningful milestone.
- Write a 3-5 sentence pitch to `{workdir}/PITCH.md` BEFORE calling `sw-report done`.
- Always call `sw-report done` when you are finished.
"#;

const STREAM_PROTOCOL: &str = r#"## Progress Format

Your progress is read from your messages.

1. Your FIRST message must be the plan, as a numbered list with one step per line:
```
1. Scaffold project - create the app skeleton
2. Build API - routes and persistence
3. Add UI
```

2. Every later message that finishes a milestone starts with a step header on its own line:
```
[STEP 2/3] Build API
```

3. Write a 3-5 sentence pitch to `{workdir}/PITCH.md` before you finish.
"#;

const PRACTICES: &str = r#"## Development Practices

- All setup commands MUST be non-interactive (no TTY is available). Always pass `--yes`, `-y` or equivalent.
- Git is already initialized in {workdir} with the remote configured. Do NOT run `git init` or `git remote add`.
- Commits and pushes happen for you at each step.
- Before finishing, do a clean install and build to verify every dependency is declared.

## Deliverables

1. Working code in {workdir} that builds and runs
2. PITCH.md with a compelling elevator pitch

## Working Directory

All code MUST be written in {workdir}."#;

/// System prompt appended to the agent's own.
pub fn system_prompt(job: &JobSpec, workdir: &str) -> String {
    let protocol = match job.progress {
        ProgressMode::Reporter => REPORTER_PROTOCOL,
        ProgressMode::Stream => STREAM_PROTOCOL,
    };
    let mut prompt = String::new();
    prompt.push_str(&protocol.replace("{workdir}", workdir));
    prompt.push('\n');
    prompt.push_str(&PRACTICES.replace("{workdir}", workdir));
    prompt.push_str(&format!(
        "\n\n## Tunables\n\n- Risk appetite: {}/100 (higher means more ambitious scope)\n- Temperature: {}/100 (higher means more unconventional ideas)\n",
        job.risk, job.temperature
    ));
    let profile = job.worker_profile.trim();
    if !profile.is_empty() {
        prompt.push_str(&format!("\n## Your Profile\n\n{}\n", profile));
    }
    prompt
}

/// The idea followed by the autonomy instruction.
pub fn task_prompt(job: &JobSpec) -> String {
    format!("{}{}", job.idea, AUTONOMY_SUFFIX)
}

/// Per-job temp files inside the sandbox: the prompts and the agent's PID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFiles {
    pub task: String,
    pub system: String,
    /// Written by the agent shell; names its process group.
    pub pid: String,
}

impl PromptFiles {
    pub fn for_job(id: &JobId) -> Self {
        Self {
            task: format!("/tmp/sw-task-{}.md", id),
            system: format!("/tmp/sw-system-{}.md", id),
            pid: format!("/tmp/sw-agent-{}.pid", id),
        }
    }

    pub fn paths(&self) -> [&str; 3] {
        [&self.task, &self.system, &self.pid]
    }
}

/// Invocation of the agent CLI with streaming JSON output.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    pub files: PromptFiles,
    pub max_turns: u32,
    pub model: Option<String>,
}

impl AgentCommand {
    pub fn new(files: PromptFiles, max_turns: u32, model: Option<String>) -> Self {
        Self { files, max_turns, model: model.filter(|m| !m.trim().is_empty()) }
    }

    /// Shell pipeline feeding the task prompt to the CLI on stdin.
    pub fn shell(&self) -> String {
        let mut cmd = format!(
            "cat {} | claude -p --output-format stream-json --verbose --append-system-prompt-file {} --dangerously-skip-permissions --max-turns {}",
            shell_quote(&self.files.task),
            shell_quote(&self.files.system),
            self.max_turns
        );
        if let Some(ref model) = self.model {
            cmd.push_str(" --model ");
            cmd.push_str(&shell_quote(model));
        }
        cmd
    }

    /// The pipeline in a new session. The shell records its PID, which is
    /// also the process group to kill on timeout.
    pub fn argv(&self) -> Vec<String> {
        let script = format!("echo $$ > {}; {}", shell_quote(&self.files.pid), self.shell());
        vec!["setsid".to_string(), "-w".to_string(), "bash".to_string(), "-c".to_string(), script]
    }

    /// Environment for the agent process.
    pub fn env() -> Vec<(String, String)> {
        vec![("NO_COLOR".to_string(), "1".to_string())]
    }
}

/// Single-quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:@=+".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
