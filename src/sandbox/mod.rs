// src/sandbox/mod.rs

//! Sandboxed snippet execution.
//!
//! One call runs one snippet:
//! 1. Stage: write the code to a uniquely named file in the shared directory
//! 2. Dispatch: pick the command for the language (unknown → `cat`)
//! 3. Invoke: run it through the launcher with a hard wall-clock timeout
//! 4. Classify: exit 0 → passed, exit > 0 → failed, anything else → error
//! 5. Collect: stdout and stderr merged in arrival order
//! 6. Cleanup: remove the staged file in a detached task, on every path
//!
//! A non-zero exit means either failed assertions or an uncaught error;
//! the two are not told apart.
//!
//! No state is shared between calls.

pub mod artifact;
pub mod language;

use crate::config::SandboxConfig;
use crate::util::elapsed_ms;
use artifact::StagedArtifact;
use language::{lookup, shell_quote, LanguageSpec};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to stage snippet at {0:?}: {1}")]
    Stage(PathBuf, #[source] std::io::Error),

    #[error("failed to start sandbox process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed while waiting for sandbox process: {0}")]
    Io(#[source] std::io::Error),

    #[error("sandbox execution timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("sandbox execution cancelled by shutdown")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Passed => "passed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Error => "error",
        }
    }
}

/// Map a process exit to a status.
pub fn classify(status: ExitStatus) -> ExecutionStatus {
    match status.code() {
        Some(0) => ExecutionStatus::Passed,
        Some(code) if code > 0 => ExecutionStatus::Failed,
        _ => ExecutionStatus::Error,
    }
}

/// Input for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
}

/// Output of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub log: String,
    pub duration_ms: u64,
}

/// Runs snippets inside the isolated environment.
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    launcher: Vec<String>,
    host_dir: PathBuf,
    sandbox_dir: PathBuf,
    timeout: Duration,
    shutdown: CancellationToken,
}

enum Outcome {
    SpawnFailed(std::io::Error),
    Finished(std::io::Result<(ExitStatus, String)>),
    TimedOut,
    Cancelled,
}

impl SandboxRunner {
    pub fn new(cfg: &SandboxConfig, shutdown: CancellationToken) -> Self {
        Self {
            launcher: cfg.launcher.clone(),
            host_dir: cfg.host_dir.clone(),
            sandbox_dir: cfg.sandbox_dir.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            shutdown,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, req: &ExecutionRequest) -> Result<ExecutionResult, SandboxError> {
        self.run_tests_in_sandbox(&req.code, &req.language).await
    }

    /// Run `code` as `language` and report status, merged log and duration.
    pub async fn run_tests_in_sandbox(
        &self,
        code: &str,
        language: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        let spec = lookup(language);

        let artifact = StagedArtifact::stage(code, spec, &self.host_dir, &self.sandbox_dir)
            .await
            .map_err(|e| SandboxError::Stage(self.host_dir.clone(), e))?;

        tracing::info!(
            run_id = %artifact.run_id,
            language = spec.name,
            path = %artifact.sandbox_path.display(),
            "sandbox run started"
        );

        let start = Instant::now();
        let outcome = self.invoke(spec, &artifact).await;
        self.schedule_cleanup(artifact.clone());
        let duration_ms = elapsed_ms(start);

        let result = match outcome {
            Outcome::Finished(Ok((status, log))) => Ok(ExecutionResult {
                status: classify(status),
                log,
                duration_ms,
            }),
            Outcome::Finished(Err(e)) => Err(SandboxError::Io(e)),
            Outcome::SpawnFailed(e) => Err(SandboxError::Spawn(e)),
            Outcome::TimedOut => Err(SandboxError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
            Outcome::Cancelled => Err(SandboxError::Cancelled),
        };

        match &result {
            Ok(r) => tracing::info!(
                run_id = %artifact.run_id,
                status = r.status.as_str(),
                duration_ms,
                "sandbox run finished"
            ),
            Err(e) => tracing::warn!(run_id = %artifact.run_id, error = %e, "sandbox run failed"),
        }

        result
    }

    /// Build the launcher command for a shell snippet.
    fn command(&self, script: &str) -> Command {
        let mut cmd = match self.launcher.split_first() {
            Some((program, args)) => {
                let mut c = Command::new(program);
                c.args(args).arg("/bin/bash").arg("-c").arg(script);
                c
            }
            None => {
                let mut c = Command::new("bash");
                c.arg("-c").arg(script);
                c
            }
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn invoke(&self, spec: &LanguageSpec, artifact: &StagedArtifact) -> Outcome {
        let script = spec.render(&artifact.sandbox_path_str());

        let mut child = match self.command(&script).spawn() {
            Ok(c) => c,
            Err(e) => return Outcome::SpawnFailed(e),
        };

        let outcome = tokio::select! {
            res = collect_output(&mut child) => Outcome::Finished(res),
            _ = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
            _ = self.shutdown.cancelled() => Outcome::Cancelled,
        };

        if matches!(outcome, Outcome::TimedOut | Outcome::Cancelled) {
            if let Err(e) = child.kill().await {
                tracing::debug!(run_id = %artifact.run_id, error = %e, "kill after abort failed");
            }
        }

        outcome
    }

    /// Remove the staged file without waiting for it.
    ///
    /// Failures are logged and never reach the caller.
    fn schedule_cleanup(&self, artifact: StagedArtifact) {
        let remote = (!self.launcher.is_empty())
            .then(|| self.command(&format!("rm -f {}", shell_quote(&artifact.sandbox_path_str()))));

        tokio::spawn(async move {
            if let Some(mut cmd) = remote {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
                match cmd.status().await {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        tracing::warn!(run_id = %artifact.run_id, %status, "sandbox cleanup exited non-zero")
                    }
                    Err(e) => {
                        tracing::warn!(run_id = %artifact.run_id, error = %e, "sandbox cleanup failed")
                    }
                }
            }

            match tokio::fs::remove_file(&artifact.host_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(run_id = %artifact.run_id, error = %e, "staged file removal failed")
                }
            }
        });
    }
}

/// Read both pipes line by line, in arrival order, then wait for exit.
async fn collect_output(child: &mut Child) -> std::io::Result<(ExitStatus, String)> {
    let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

    let mut out = BufReader::new(stdout).split(b'\n');
    let mut err = BufReader::new(stderr).split(b'\n');
    let (mut out_open, mut err_open) = (true, true);
    let mut log = String::new();

    while out_open || err_open {
        tokio::select! {
            line = out.next_segment(), if out_open => {
                out_open = push_line(&mut log, line?);
            }
            line = err.next_segment(), if err_open => {
                err_open = push_line(&mut log, line?);
            }
        }
    }

    let status = child.wait().await?;
    Ok((status, log))
}

/// Append a line to the log; returns false at end of stream.
fn push_line(log: &mut String, segment: Option<Vec<u8>>) -> bool {
    match segment {
        Some(bytes) => {
            log.push_str(&String::from_utf8_lossy(&bytes));
            log.push('\n');
            true
        }
        None => false,
    }
}

fn missing_pipe(name: &str) -> std::io::Error {
    std::io::Error::other(format!("child {} was not captured", name))
}
