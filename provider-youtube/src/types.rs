//! YouTube Data API v3 wire types and upload progress reporting.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Request-side types
// ============================================================================

/// Privacy applied to an uploaded video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Private,
    Unlisted,
    Public,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Unlisted => "unlisted",
            Self::Public => "public",
        }
    }
}

impl FromStr for PrivacyStatus {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            "public" => Ok(Self::Public),
            _ => Err(ProviderError::Validation(format!("Unknown privacy '{}'", s))),
        }
    }
}

impl std::fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The metadata sent with an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
    pub embeddable: bool,
    pub license: String,
    pub made_for_kids: bool,
    /// RFC 3339 scheduled publish time, only honored for private videos
    pub publish_at: Option<String>,
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            category_id: "22".to_string(),
            privacy: PrivacyStatus::Private,
            embeddable: true,
            license: "youtube".to_string(),
            made_for_kids: false,
            publish_at: None,
        }
    }

    /// Body for the resumable-session initiation and the blind part of an
    /// update: snippet + status as the API expects them.
    pub fn to_body(&self) -> serde_json::Value {
        let mut status = serde_json::json!({
            "privacyStatus": self.privacy.as_str(),
            "embeddable": self.embeddable,
            "license": self.license,
            "selfDeclaredMadeForKids": self.made_for_kids,
        });
        if let Some(publish_at) = &self.publish_at {
            status["publishAt"] = serde_json::Value::String(publish_at.clone());
        }
        serde_json::json!({
            "snippet": {
                "title": self.title,
                "description": self.description,
                "tags": self.tags,
                "categoryId": self.category_id,
            },
            "status": status,
        })
    }

    /// Overlay this metadata onto a fetched resource, preserving every
    /// field the caller did not ask to change.
    pub fn merge_into(&self, resource: &mut VideoResource) {
        let snippet = resource.snippet.get_or_insert_with(Default::default);
        snippet.title = self.title.clone();
        snippet.description = self.description.clone();
        snippet.tags = Some(self.tags.clone());
        snippet.category_id = self.category_id.clone();

        let status = resource.status.get_or_insert_with(Default::default);
        status.privacy_status = Some(self.privacy.as_str().to_string());
        status.embeddable = Some(self.embeddable);
        status.license = Some(self.license.clone());
        status.self_declared_made_for_kids = Some(self.made_for_kids);
        if self.publish_at.is_some() {
            status.publish_at = self.publish_at.clone();
        }
    }
}

// ============================================================================
// Response-side types
// ============================================================================

/// A `videos` resource, the subset of parts this client touches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_declared_made_for_kids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<Channel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<ChannelSnippet>,
    #[serde(default)]
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedPlaylists {
    #[serde(default)]
    pub uploads: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub video_id: String,
}

// ============================================================================
// Upload progress
// ============================================================================

/// State of one upload as seen by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Queued,
    Uploading,
    Processing,
    Completed,
    Error,
    Cancelled,
    Retry,
}

/// Progress of one upload call. Owned by that call; no shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub state: UploadState,
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    pub percent: f64,
    pub video_id: Option<String>,
    pub watch_url: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    /// Unix seconds of the latest state change
    pub last_update: i64,
}

impl UploadProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            state: UploadState::Queued,
            bytes_uploaded: 0,
            total_bytes,
            percent: 0.0,
            video_id: None,
            watch_url: None,
            error_message: None,
            retry_count: 0,
            last_update: chrono::Utc::now().timestamp(),
        }
    }

    /// Record bytes confirmed by the server and refresh the percentage.
    pub fn advance(&mut self, bytes_uploaded: u64) {
        self.bytes_uploaded = bytes_uploaded;
        self.percent = if self.total_bytes == 0 {
            100.0
        } else {
            (bytes_uploaded as f64 / self.total_bytes as f64) * 100.0
        };
        self.last_update = chrono::Utc::now().timestamp();
    }
}

/// Receiver for upload progress events.
///
/// The client calls [`ProgressSink::on_progress`] at most once per
/// acknowledged chunk, plus once with the final `Completed` state.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &UploadProgress);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _progress: &UploadProgress) {}
}
