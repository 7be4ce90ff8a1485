//! # File Publish Status
//!
//! The per-file lifecycle derived by reconciliation and stored in the
//! container's `upload_state` bookkeeping tag.
//!
//! ## State Machine
//!
//! ```text
//! Undefined → Acknowledged → Provisioned → QueuedNew → Uploading → Finished
//!                                 ↑            ↓           ↓          ↓
//!                                 └── (no title)      Hindered ← QueuedEdit
//! ```
//!
//! `Hindered` is terminal-but-recoverable: a later pass can leave it once
//! the underlying condition is fixed.

use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The publish status of one media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Never seen before; no bookkeeping tags at all
    Undefined,
    /// Seen and tagged, but not yet ready to publish
    Acknowledged,
    /// Bookkeeping present, still missing a title
    Provisioned,
    /// Ready for its first upload
    QueuedNew,
    /// An upload was started and has not been confirmed finished
    Uploading,
    /// Published and in sync with the remote record
    Finished,
    /// Published but local edits have drifted from the remote record
    QueuedEdit,
    /// Blocked by an error; holds an error_message tag
    Hindered,
}

impl FileStatus {
    /// Check if reconciliation still wants a transfer for this status
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::QueuedNew | Self::Uploading | Self::QueuedEdit)
    }

    /// Check if this status carries an error_message tag
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Hindered)
    }

    /// Get the string representation stored in the container tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Acknowledged => "acknowledged",
            Self::Provisioned => "provisioned",
            Self::QueuedNew => "queued_new",
            Self::Uploading => "uploading",
            Self::Finished => "finished",
            Self::QueuedEdit => "queued_edit",
            Self::Hindered => "hindered",
        }
    }
}

impl FromStr for FileStatus {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "undefined" => Ok(Self::Undefined),
            "acknowledged" => Ok(Self::Acknowledged),
            "provisioned" => Ok(Self::Provisioned),
            "queued_new" => Ok(Self::QueuedNew),
            "uploading" => Ok(Self::Uploading),
            "finished" => Ok(Self::Finished),
            "queued_edit" => Ok(Self::QueuedEdit),
            "hindered" => Ok(Self::Hindered),
            _ => Err(ReconcileError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_statuses() {
        let all = [
            FileStatus::Undefined,
            FileStatus::Acknowledged,
            FileStatus::Provisioned,
            FileStatus::QueuedNew,
            FileStatus::Uploading,
            FileStatus::Finished,
            FileStatus::QueuedEdit,
            FileStatus::Hindered,
        ];
        for status in all {
            assert_eq!(status.as_str().parse::<FileStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("halfway_done".parse::<FileStatus>().is_err());
    }

    #[test]
    fn test_actionable_statuses() {
        assert!(FileStatus::QueuedNew.is_actionable());
        assert!(FileStatus::QueuedEdit.is_actionable());
        assert!(!FileStatus::Finished.is_actionable());
        assert!(!FileStatus::Hindered.is_actionable());
    }
}
