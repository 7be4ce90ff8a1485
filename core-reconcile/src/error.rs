//! Reconciliation error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Tag store read or write-back failed
    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),

    /// Remote record lookup failed (transport or provider fault)
    #[error("Remote lookup failed: {0}")]
    Lookup(String),

    /// A stored upload_state tag holds an unknown value
    #[error("Invalid file status: {0}")]
    InvalidStatus(String),
}
