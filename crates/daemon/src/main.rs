// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! swd: accepts build triggers and runs each job in its own sandbox.

use anyhow::Context;
use sw_daemon::{lifecycle, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = lifecycle::setup_logging(&config).context("failed to set up logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting swd");
    lifecycle::run(config).await?;
    Ok(())
}
