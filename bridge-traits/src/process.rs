//! External Process Abstraction
//!
//! The metadata store shells out to a probe tool (JSON container
//! description) and a mux tool (full-container tag rewrite). This trait is
//! the only path to those tools so that the adapter can be tested without
//! either installed.

use async_trait::async_trait;

use crate::error::Result;

/// Captured output of a finished external process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Process exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr as lossy UTF-8, for diagnostics
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs an external command to completion, capturing output
///
/// Arguments are passed as a vector, never through a shell, so paths with
/// spaces or metacharacters need no quoting.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, blocking the caller until exit.
    ///
    /// # Errors
    ///
    /// Returns error only when the process cannot be spawned or its output
    /// cannot be collected. A non-zero exit is reported through
    /// [`ProcessOutput::exit_code`], not as an error.
    async fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput>;
}
