//! Import worker process runner
//!
//! Imports run in a separate `tracer-import` process so a slow or crashing
//! import never takes the web server down with it. The worker prints one JSON
//! object; log lines may surround it, so the runner takes the text from the
//! first `{` to the last `}`.

use super::ImportKind;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracer_common::config::ImportConfig;

/// Worker binary name, looked up next to the server executable
pub const WORKER_BINARY: &str = "tracer-import";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Import worker not found: {0}")]
    WorkerNotFound(String),

    #[error("Failed to start import worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Import timed out after {0} seconds")]
    Timeout(u64),

    /// Worker ran and reported `success: false`
    #[error("{0}")]
    Failed(String),

    /// Worker exited without printing a JSON report
    #[error("Import worker produced no result: {0}")]
    NoOutput(String),
}

/// Bounded launcher for import worker processes
#[derive(Debug, Clone)]
pub struct ImportRunner {
    worker: PathBuf,
    database: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ImportRunner {
    pub fn new(worker: PathBuf, database: PathBuf, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            worker,
            database,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &ImportConfig, database: PathBuf) -> Self {
        let worker = config
            .worker_path
            .clone()
            .unwrap_or_else(default_worker_path);
        Self::new(
            worker,
            database,
            Duration::from_secs(config.timeout_secs),
            config.max_concurrent,
        )
    }

    pub fn worker_path(&self) -> &Path {
        &self.worker
    }

    /// Run one import and return the worker's JSON report (`success: true`)
    pub async fn run(&self, kind: ImportKind, csv_path: &Path) -> Result<Value, RunnerError> {
        if !self.worker.exists() {
            return Err(RunnerError::WorkerNotFound(self.worker.display().to_string()));
        }

        // Closed only on drop, so acquire cannot fail while `self` lives
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| RunnerError::Failed(e.to_string()))?;

        tracing::info!(
            kind = %kind,
            file = %csv_path.display(),
            worker = %self.worker.display(),
            "Starting import worker"
        );

        let child = Command::new(&self.worker)
            .arg("--database")
            .arg(&self.database)
            .arg(kind.as_arg())
            .arg(csv_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(kind = %kind, "Import worker timed out, killed");
                return Err(RunnerError::Timeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let report = extract_json(&stdout)
            .or_else(|| extract_json(&stderr))
            .ok_or_else(|| {
                let tail = last_line(&stderr).unwrap_or("no output");
                tracing::error!(status = %output.status, stderr = %stderr, "Import worker printed no JSON");
                RunnerError::NoOutput(tail.to_string())
            })?;

        if report.get("success").and_then(Value::as_bool) == Some(true) {
            tracing::info!(kind = %kind, "Import worker finished");
            Ok(report)
        } else {
            let message = report
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Import gagal")
                .to_string();
            tracing::warn!(kind = %kind, status = %output.status, "Import worker failed: {}", message);
            Err(RunnerError::Failed(message))
        }
    }
}

/// `tracer-import` in the directory of the running executable
pub fn default_worker_path() -> PathBuf {
    let name = format!("{}{}", WORKER_BINARY, std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Parse the text between the first `{` and the last `}` as JSON
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}
