//! Runtime error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
