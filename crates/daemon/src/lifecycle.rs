// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, logging, serve, shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use sw_adapters::{DeployNotifier, DockerConfig, DockerSandbox};
use sw_engine::{ExecutorConfig, JobExecutor, JobLogSink, JobLogger};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::env;
use crate::trigger::{router, ExecutorDispatcher};

/// Buffered activity-log batches before job tasks start waiting on the writer.
const JOB_LOG_CAPACITY: usize = 1024;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/sw)
    pub state_dir: PathBuf,
    /// Daemon log files and per-job activity logs
    pub logs_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub docker: DockerConfig,
    pub executor: ExecutorConfig,
    pub callback_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let user = env::sandbox_user();

        let defaults = DockerConfig::default();
        let docker = DockerConfig {
            image: env::sandbox_image().unwrap_or(defaults.image),
            create_timeout: env::sandbox_create_timeout(),
            user: user.clone(),
            ..defaults
        };

        let executor = ExecutorConfig {
            workdir: docker.workdir.clone(),
            agent_home: agent_home(user.as_deref()),
            report_bin: env::report_bin(),
            skills_dir: env::skills_dir(),
            template_dir: env::template_dir(),
            ..ExecutorConfig::default()
        }
        .job_timeout(env::job_timeout())
        .agent_timeout(env::agent_timeout())
        .drain_grace(env::drain_grace())
        .push_timeout(env::push_timeout())
        .max_turns(env::max_turns());

        Ok(Self {
            logs_path: state_dir.join("logs"),
            listen_addr: env::listen_addr()?,
            docker,
            executor,
            callback_timeout: env::callback_timeout(),
            state_dir,
        })
    }
}

/// Home directory of the sandbox user the agent runs as.
pub fn agent_home(user: Option<&str>) -> String {
    match user {
        None | Some("root") => "/root".to_string(),
        Some(user) => format!("/home/{}", user),
    }
}

/// Install the global subscriber: stderr plus a daily-rolling file in `logs/`.
///
/// The returned guard flushes the file writer on drop and must outlive `run`.
pub fn setup_logging(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    std::fs::create_dir_all(&config.logs_path)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("swd")
        .filename_suffix("log")
        .build(&config.logs_path)
        .map_err(|e| LifecycleError::Logging(e.to_string()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| LifecycleError::Logging(e.to_string()))?;

    Ok(guard)
}

/// Serve triggers until a shutdown signal, then wait for in-flight jobs.
pub async fn run(config: Config) -> Result<(), LifecycleError> {
    let http = reqwest::Client::builder().build()?;

    let (log_tx, log_rx) = mpsc::channel(JOB_LOG_CAPACITY);
    let log_writer = JobLogger::spawn_writer(config.logs_path.clone(), log_rx);

    let executor = JobExecutor::new(DockerSandbox::new(config.docker.clone()), config.executor.clone())
        .with_log(JobLogSink::new(log_tx))
        .with_deploy(DeployNotifier::new(http.clone()));

    let tracker = TaskTracker::new();
    let dispatcher = ExecutorDispatcher::new(executor, http, config.callback_timeout, tracker.clone());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen_addr, e))?;
    info!(
        addr = %config.listen_addr,
        image = %config.docker.image,
        state_dir = %config.state_dir.display(),
        "swd listening"
    );

    axum::serve(listener, router(dispatcher)).with_graceful_shutdown(shutdown_signal()).await?;

    tracker.close();
    if !tracker.is_empty() {
        info!(in_flight = tracker.len(), "waiting for running jobs");
    }
    tracker.wait().await;

    // Every sink clone is gone once the jobs and the router are dropped.
    if let Err(e) = log_writer.await {
        warn!(error = %e, "job log writer exited abnormally");
    }
    info!("swd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}

/// Errors that stop the daemon.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
