//! Process Runner Implementation using tokio::process

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    process::{ProcessOutput, ProcessRunner},
};
use tokio::process::Command;
use tracing::debug;

/// Tokio-backed process runner
///
/// Spawns the command directly (no shell), captures stdout and stderr,
/// and waits for exit.
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        debug!(program = program, args = ?args, "Spawning external process");

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to execute {}: {}", program, e))
            })?;

        debug!(
            program = program,
            exit_code = ?output.status.code(),
            "External process finished"
        );

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
