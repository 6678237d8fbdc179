// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-report: progress reporting tool the agent calls from inside the sandbox.

mod env;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sw_adapters::{DeployNotifier, HttpCallbacks, LocalGit};
use sw_core::FileStateStore;
use tracing_subscriber::EnvFilter;

use crate::report::Reporter;

#[derive(Parser)]
#[command(name = "sw-report", version, about = "Agent progress reporting tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report the idea and the plan
    Start {
        /// The idea being built
        #[arg(long)]
        idea: String,

        /// Plan step labels
        #[arg(long, num_args = 1.., required = true)]
        steps: Vec<String>,
    },
    /// Report a finished step (commits and pushes the workspace)
    Step {
        /// Step index, passed through as given
        #[arg(long)]
        index: u32,

        /// What the step did
        #[arg(long)]
        summary: String,
    },
    /// Report completion
    Done,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let job = env::job();
    let http = reqwest::Client::builder().build()?;
    let callbacks = HttpCallbacks::new(http.clone(), job.callback_base(), env::CALLBACK_TIMEOUT);
    let workspace = env::workspace();
    let reporter = Reporter::new(
        job,
        LocalGit::new(workspace.clone()),
        callbacks,
        FileStateStore::new(env::state_file()),
        workspace,
    )
    .with_deploy(DeployNotifier::new(http));

    match cli.command {
        Command::Start { idea, steps } => reporter.start(&idea, steps).await,
        Command::Step { index, summary } => reporter.step(index, &summary).await,
        Command::Done => reporter.done().await,
    }
}

/// Compact logs on stderr; stdout belongs to the agent's tool output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
