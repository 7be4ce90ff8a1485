//! Upload job model and its two persisted halves.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Lifecycle of one job within and across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a session to pick it up
    Pending,
    /// A session has started (or crashed during) this job's upload
    Uploading,
    /// Uploaded; `remote_id` is set
    Done,
    /// Last attempt failed; `last_msg` has the reason
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "uploading" => Ok(Self::Uploading),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown job state '{}'", s)),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Editable fields persisted next to the media file.
///
/// Lifecycle fields are deliberately excluded: re-scanning a directory
/// re-reads sidecars without touching in-flight state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<PathBuf>,
}

/// Lifecycle fields persisted in the per-directory state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatileRecord {
    pub state: JobState,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_msg: Option<String>,
}

impl Default for VolatileRecord {
    fn default() -> Self {
        Self {
            state: JobState::Pending,
            remote_id: None,
            attempts: 0,
            last_msg: None,
        }
    }
}

/// One upload job: a media file, what to publish it as, and where its
/// lifecycle stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: Option<String>,
    pub privacy: Option<String>,
    pub thumbnail: Option<PathBuf>,
    pub state: JobState,
    pub remote_id: Option<String>,
    pub attempts: u32,
    pub last_msg: Option<String>,
}

impl Job {
    pub fn from_parts(path: PathBuf, sidecar: SidecarRecord, volatile: VolatileRecord) -> Self {
        Self {
            path,
            title: sidecar.title,
            description: sidecar.description,
            tags: sidecar.tags,
            category_id: sidecar.category_id,
            privacy: sidecar.privacy,
            thumbnail: sidecar.thumbnail,
            state: volatile.state,
            remote_id: volatile.remote_id,
            attempts: volatile.attempts,
            last_msg: volatile.last_msg,
        }
    }

    pub fn sidecar(&self) -> SidecarRecord {
        SidecarRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            category_id: self.category_id.clone(),
            privacy: self.privacy.clone(),
            thumbnail: self.thumbnail.clone(),
        }
    }

    pub fn volatile(&self) -> VolatileRecord {
        VolatileRecord {
            state: self.state,
            remote_id: self.remote_id.clone(),
            attempts: self.attempts,
            last_msg: self.last_msg.clone(),
        }
    }
}
