// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-job activity logs.
//!
//! Writes human-readable timestamped activity lines to:
//!   `<log_dir>/jobs/<job_id>.log`

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use sw_core::JobId;
use tokio::sync::mpsc;

/// One timestamped activity line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLogEntry {
    pub timestamp: String,
    pub line: String,
}

impl JobLogEntry {
    /// Entry stamped with the current UTC time, second precision.
    pub fn now(line: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            line: line.into(),
        }
    }
}

impl fmt::Display for JobLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.line)
    }
}

pub type JobLogMessage = (JobId, Vec<JobLogEntry>);

/// Sending half handed to job executors. A disconnected sink drops lines.
#[derive(Debug, Clone, Default)]
pub struct JobLogSink {
    tx: Option<mpsc::Sender<JobLogMessage>>,
}

impl JobLogSink {
    pub fn new(tx: mpsc::Sender<JobLogMessage>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn send(&self, job_id: &JobId, lines: Vec<String>) {
        let Some(ref tx) = self.tx else {
            return;
        };
        if lines.is_empty() {
            return;
        }
        let entries = lines.into_iter().map(JobLogEntry::now).collect();
        if tx.send((job_id.clone(), entries)).await.is_err() {
            tracing::debug!(job_id = %job_id, "job log writer is gone");
        }
    }
}

/// Append-only logger for per-job activity logs.
///
/// Receives `(JobId, Vec<JobLogEntry>)` tuples over a channel and writes
/// formatted lines to `<log_dir>/jobs/<job_id>.log`.
pub struct JobLogger {
    log_dir: PathBuf,
}

impl JobLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    /// Append formatted entries to the job log file.
    ///
    /// Failures are logged via tracing but do not propagate.
    pub fn append_entries(&self, job_id: &str, entries: &[JobLogEntry]) {
        if entries.is_empty() {
            return;
        }

        let path = self.log_path(job_id);
        let Some(job_dir) = path.parent() else {
            return;
        };

        if let Err(e) = write_entries(job_dir, &path, entries) {
            tracing::warn!(job_id, error = %e, "failed to write job log");
        }
    }

    /// Return the path to a job's log file.
    pub fn log_path(&self, job_id: &str) -> PathBuf {
        self.log_dir.join("jobs").join(format!("{}.log", job_id))
    }

    /// Spawn a background task that reads from the channel and writes entries.
    pub fn spawn_writer(
        log_dir: PathBuf,
        mut rx: mpsc::Receiver<JobLogMessage>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let logger = JobLogger::new(log_dir);
            while let Some((job_id, entries)) = rx.recv().await {
                logger.append_entries(job_id.as_str(), &entries);
            }
        })
    }
}

fn write_entries(dir: &Path, path: &Path, entries: &[JobLogEntry]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for entry in entries {
        writeln!(file, "{}", entry)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "job_logger_tests.rs"]
mod tests;
