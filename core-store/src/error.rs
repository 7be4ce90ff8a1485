use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Failed to parse probe output: {0}")]
    Parse(String),

    #[error("Container rewrite failed: {stderr}")]
    Rewrite { stderr: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bridge(#[from] bridge_traits::BridgeError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
