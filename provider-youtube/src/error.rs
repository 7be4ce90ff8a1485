//! Platform client error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Input file rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Client-side quota guard blocked the operation before the attempt
    #[error("Daily quota exceeded for operation '{operation}'")]
    QuotaExceeded { operation: String },

    /// Retryable server-busy class of HTTP status
    #[error("Transient API error: status {status}")]
    Transient { status: u16 },

    /// Non-retryable API failure
    #[error("API error: status {status}: {message}")]
    Permanent { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Programmer-facing misuse, e.g. an empty video id
    #[error("Missing required identifier: {0}")]
    MissingId(String),

    /// Transport-level failure from the HTTP bridge
    #[error("Transport error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    /// Local file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether the chunk retry loop should try again after backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Bridge(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Transient { status: 503 }.is_transient());
        assert!(!ProviderError::Permanent {
            status: 403,
            message: "forbidden".to_string()
        }
        .is_transient());
        assert!(!ProviderError::Validation("too big".to_string()).is_transient());
    }
}
