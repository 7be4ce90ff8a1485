//! Session error type.
//!
//! A single job's upload failure is not an error here: the engine marks
//! the job and continues. These variants cover cross-job faults only.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Sidecar or state file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar or state file holds invalid JSON
    #[error("State file error: {0}")]
    State(#[from] serde_json::Error),

    /// Container tag write-back failed
    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),
}
