//! YouTube Data API v3 client
//!
//! Resumable chunked uploads, merge-style metadata updates, thumbnail and
//! listing operations, all guarded by a client-side daily quota tracker.

pub mod client;
pub mod error;
pub mod quota;
pub mod types;

pub use client::{watch_url, YouTubeClient};
pub use error::{ProviderError, Result};
pub use quota::{Quota, QuotaOperation};
pub use types::{
    NoopProgressSink, PrivacyStatus, ProgressSink, UploadProgress, UploadState, VideoMetadata,
    VideoResource,
};
