//! Tokio-backed command runner.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use repograph_core::{CommandError, CommandInvocation, CommandOutput, CommandRunner};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs tools as child processes with captured output.
///
/// A timed out child is killed when its future is dropped.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    timeout: Option<Duration>,
}

impl TokioCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(300)))
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: CommandInvocation) -> Result<CommandOutput, CommandError> {
        let start = Instant::now();
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %invocation, dir = ?invocation.current_dir, "Executing command");

        let mut child = cmd.spawn().map_err(|e| CommandError::Spawn {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        if let (Some(input), Some(mut stdin)) = (invocation.stdin.clone(), child.stdin.take()) {
            let program = invocation.program.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(program = %program, error = %e, "Failed to write stdin");
                }
            });
        }

        let output_future = child.wait_with_output();
        let output = match self.timeout {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        command = %invocation,
                        timeout_secs = duration.as_secs(),
                        "Command timed out"
                    );
                    return Err(CommandError::Timeout {
                        program: invocation.program.clone(),
                        timeout: duration,
                    });
                }
            },
            None => output_future.await,
        }
        .map_err(|e| CommandError::Spawn {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        tracing::debug!(
            program = %invocation.program,
            code = ?output.status.code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Command finished"
        );

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: invocation.program,
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
