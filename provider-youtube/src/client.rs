//! YouTube Data API client implementation.
//!
//! Implements the resumable upload protocol, merge-style metadata updates
//! and the auxiliary video/channel operations, with a client-side quota
//! guard around every billed call.

use crate::error::{ProviderError, Result};
use crate::quota::{Quota, QuotaOperation};
use crate::types::{
    Channel, ChannelListResponse, PlaylistItem, PlaylistItemListResponse, ProgressSink,
    UploadProgress, UploadState, VideoListResponse, VideoMetadata, VideoResource,
};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_reconcile::{RemoteLookup, RemoteRecord};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// YouTube Data API base URL
const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Upload endpoint base URL
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Platform ceiling for a single video file
const MAX_FILE_SIZE: u64 = 128 * 1024 * 1024 * 1024;

/// Container extensions the platform accepts
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "wmv", "flv", "webm", "mkv", "3gpp", "mpg",
];

/// Default resumable upload chunk size (must be a multiple of 256 KiB)
const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Default retry ceiling for transient chunk failures
const DEFAULT_MAX_RETRIES: u32 = 8;

/// Exponential backoff cap, in seconds
const MAX_BACKOFF_SECS: u64 = 64;

/// Public watch URL for a platform video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// YouTube Data API v3 client.
///
/// All state is instance-owned: the quota tracker lives on the client, so
/// two clients never share a budget.
///
/// # Example
///
/// ```ignore
/// use provider_youtube::{YouTubeClient, VideoMetadata, NoopProgressSink};
/// use tokio_util::sync::CancellationToken;
///
/// let client = YouTubeClient::new(http_client, access_token);
/// let meta = VideoMetadata::new("Trip");
/// let progress = client
///     .upload_video(path, &meta, &NoopProgressSink, &CancellationToken::new())
///     .await?;
/// ```
pub struct YouTubeClient {
    http: Arc<dyn HttpClient>,
    access_token: String,
    quota: Mutex<Quota>,
    chunk_size: u64,
    max_retries: u32,
}

impl YouTubeClient {
    pub fn new(http: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            quota: Mutex::new(Quota::default()),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = Mutex::new(quota);
        self
    }

    /// Snapshot of the current quota window.
    pub async fn quota_snapshot(&self) -> Quota {
        self.quota.lock().await.clone()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check a file is uploadable before any network call.
    ///
    /// Returns the file size on success; rejects with a descriptive reason
    /// otherwise.
    pub async fn validate_file(&self, path: &Path) -> Result<u64> {
        let metadata = tokio::fs::metadata(path).await.map_err(|_| {
            ProviderError::Validation(format!("File not found: {}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(ProviderError::Validation(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let size = metadata.len();
        if size == 0 {
            return Err(ProviderError::Validation(format!(
                "File is empty: {}",
                path.display()
            )));
        }
        if size > MAX_FILE_SIZE {
            return Err(ProviderError::Validation(format!(
                "File exceeds the {} GiB limit: {}",
                MAX_FILE_SIZE / (1024 * 1024 * 1024),
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ProviderError::Validation(format!(
                "Unsupported container '.{}' (expected one of {:?})",
                extension, SUPPORTED_EXTENSIONS
            )));
        }

        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::VIDEO {
            return Err(ProviderError::Validation(format!(
                "Not a video MIME type: {}",
                mime
            )));
        }

        Ok(size)
    }

    // ========================================================================
    // Resumable upload
    // ========================================================================

    /// Upload a video with the resumable protocol.
    ///
    /// Chunks are sent sequentially; a transient server status retries the
    /// same chunk after exponential backoff up to the retry ceiling.
    /// `sink` receives at most one event per acknowledged chunk plus one
    /// final `Completed` event. `cancel` is honored before each chunk and
    /// during backoff sleeps.
    pub async fn upload_video(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<UploadProgress> {
        let total = self.validate_file(path).await?;
        self.quota.lock().await.check(QuotaOperation::VideoInsert)?;

        let mut progress = UploadProgress::new(total);
        if cancel.is_cancelled() {
            progress.state = UploadState::Cancelled;
            return Ok(progress);
        }

        let session_uri = self.initiate_upload(path, meta, total).await?;
        info!(file = %path.display(), size = total, "Resumable upload session opened");

        let mut file = tokio::fs::File::open(path).await?;
        let mut offset = 0u64;
        let mut retries = 0u32;
        progress.state = UploadState::Uploading;

        let resource = loop {
            if cancel.is_cancelled() {
                progress.state = UploadState::Cancelled;
                return Ok(progress);
            }

            let chunk = read_chunk(&mut file, offset, self.chunk_size, total).await?;
            let end = offset + chunk.len() as u64 - 1;
            let request = HttpRequest::new(HttpMethod::Put, session_uri.clone())
                .bearer_token(&self.access_token)
                .header(
                    "Content-Range",
                    format!("bytes {}-{}/{}", offset, end, total),
                )
                .body(chunk);

            let outcome = match self.http.execute(request).await {
                Ok(response) if response.status == 308 => {
                    let committed = committed_offset(&response).unwrap_or(end + 1);
                    if committed > total {
                        Err(ProviderError::Parse(format!(
                            "server acknowledged byte {} past file size {}",
                            committed, total
                        )))
                    } else {
                        retries = 0;
                        offset = committed;
                        progress.advance(offset);
                        debug!(offset, total, percent = progress.percent, "Chunk accepted");
                        sink.on_progress(&progress);
                        continue;
                    }
                }
                Ok(response) if response.status == 200 || response.status == 201 => {
                    let resource: VideoResource = response
                        .json()
                        .map_err(|e| ProviderError::Parse(e.to_string()))?;
                    break resource;
                }
                Ok(response) if is_transient_status(response.status) => {
                    Err(ProviderError::Transient {
                        status: response.status,
                    })
                }
                Ok(response) => Err(ProviderError::Permanent {
                    status: response.status,
                    message: String::from_utf8_lossy(&response.body).to_string(),
                }),
                Err(e) => Err(ProviderError::Bridge(e)),
            };

            match outcome {
                Err(e) if e.is_transient() => {
                    retries += 1;
                    progress.retry_count = retries;
                    progress.state = UploadState::Retry;
                    if retries >= self.max_retries {
                        progress.state = UploadState::Error;
                        progress.error_message = Some(e.to_string());
                        warn!(
                            file = %path.display(),
                            retries,
                            "Upload aborted after exhausting retries"
                        );
                        return Err(e);
                    }
                    let backoff = 2u64.pow(retries).min(MAX_BACKOFF_SECS);
                    debug!(retries, backoff, "Transient chunk failure, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            progress.state = UploadState::Cancelled;
                            return Ok(progress);
                        }
                        _ = tokio::time::sleep(Duration::from_secs(backoff)) => {}
                    }
                }
                Err(e) => {
                    progress.state = UploadState::Error;
                    progress.error_message = Some(e.to_string());
                    return Err(e);
                }
                Ok(()) => unreachable!("success paths continue or break above"),
            }
        };

        self.quota.lock().await.consume(QuotaOperation::VideoInsert);

        progress.advance(total);
        progress.state = UploadState::Completed;
        progress.video_id = Some(resource.id.clone());
        progress.watch_url = Some(watch_url(&resource.id));
        sink.on_progress(&progress);
        info!(video_id = %resource.id, "Upload complete");

        // Touch-up so the created record matches the requested metadata
        // exactly, against server-side defaulting. The upload itself has
        // succeeded, so a failure here is logged, not raised.
        match self.update_metadata(&resource.id, meta).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(video_id = %resource.id, "Post-upload metadata touch-up failed"),
            Err(e) => warn!(video_id = %resource.id, error = %e, "Post-upload metadata touch-up failed"),
        }

        Ok(progress)
    }

    async fn initiate_upload(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        total: u64,
    ) -> Result<String> {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let url = format!(
            "{}/videos?uploadType=resumable&part=snippet,status",
            UPLOAD_BASE
        );
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(&self.access_token)
            .header("X-Upload-Content-Length", total.to_string())
            .header("X-Upload-Content-Type", mime.essence_str())
            .json(&meta.to_body())
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            if is_transient_status(response.status) {
                return Err(ProviderError::Transient {
                    status: response.status,
                });
            }
            return Err(ProviderError::Permanent {
                status: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        response
            .header("Location")
            .or_else(|| response.header("location"))
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Parse("Session initiation returned no Location header".to_string())
            })
    }

    // ========================================================================
    // Metadata update
    // ========================================================================

    /// Update a video's snippet/status, preserving untouched fields.
    ///
    /// Reads the current resource back first and overlays the requested
    /// metadata, so repeated calls with the same input are idempotent.
    /// API failures are logged and return `Ok(None)`.
    pub async fn update_metadata(
        &self,
        video_id: &str,
        meta: &VideoMetadata,
    ) -> Result<Option<VideoResource>> {
        if video_id.is_empty() {
            return Err(ProviderError::MissingId("video_id".to_string()));
        }
        self.quota.lock().await.check(QuotaOperation::VideoUpdate)?;

        let mut current = match self.fetch_video(video_id).await {
            Ok(Some(resource)) => resource,
            Ok(None) => {
                warn!(video_id, "Cannot update: remote record not found");
                return Ok(None);
            }
            Err(e) => {
                warn!(video_id, error = %e, "Cannot update: fetch failed");
                return Ok(None);
            }
        };
        meta.merge_into(&mut current);

        let url = format!("{}/videos?part=snippet,status", API_BASE);
        let request = HttpRequest::new(HttpMethod::Put, url)
            .bearer_token(&self.access_token)
            .json(&current)
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                self.quota.lock().await.consume(QuotaOperation::VideoUpdate);
                let updated: VideoResource = response
                    .json()
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                debug!(video_id, "Metadata updated");
                Ok(Some(updated))
            }
            Ok(response) => {
                warn!(video_id, status = response.status, "Metadata update failed");
                Ok(None)
            }
            Err(e) => {
                warn!(video_id, error = %e, "Metadata update failed");
                Ok(None)
            }
        }
    }

    // ========================================================================
    // Auxiliary operations
    // ========================================================================

    /// Fetch a video resource. API failures are logged and return `Ok(None)`.
    pub async fn get_video(&self, video_id: &str) -> Result<Option<VideoResource>> {
        if video_id.is_empty() {
            return Err(ProviderError::MissingId("video_id".to_string()));
        }
        self.quota.lock().await.check(QuotaOperation::VideoList)?;

        match self.fetch_video(video_id).await {
            Ok(found) => {
                self.quota.lock().await.consume(QuotaOperation::VideoList);
                Ok(found)
            }
            Err(e) => {
                warn!(video_id, error = %e, "Video fetch failed");
                Ok(None)
            }
        }
    }

    /// Strict fetch: transport and API failures are errors, a missing
    /// record is `Ok(None)`. Used where "gone" and "failed" must not be
    /// conflated (reconciliation).
    async fn fetch_video(&self, video_id: &str) -> Result<Option<VideoResource>> {
        let url = format!(
            "{}/videos?part=snippet,status&id={}",
            API_BASE,
            urlencoding::encode(video_id)
        );
        let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(&self.access_token);

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }
        let list: VideoListResponse = response
            .json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(list.items.into_iter().next())
    }

    /// Delete a video. Failures are logged and return `Ok(false)`.
    pub async fn delete_video(&self, video_id: &str) -> Result<bool> {
        if video_id.is_empty() {
            return Err(ProviderError::MissingId("video_id".to_string()));
        }
        self.quota.lock().await.check(QuotaOperation::VideoDelete)?;

        let url = format!("{}/videos?id={}", API_BASE, urlencoding::encode(video_id));
        let request = HttpRequest::new(HttpMethod::Delete, url).bearer_token(&self.access_token);

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                self.quota.lock().await.consume(QuotaOperation::VideoDelete);
                info!(video_id, "Video deleted");
                Ok(true)
            }
            Ok(response) => {
                warn!(video_id, status = response.status, "Video delete failed");
                Ok(false)
            }
            Err(e) => {
                warn!(video_id, error = %e, "Video delete failed");
                Ok(false)
            }
        }
    }

    /// Set a video's thumbnail from a local image. Failures are logged and
    /// return `Ok(false)`.
    pub async fn set_thumbnail(&self, video_id: &str, image_path: &Path) -> Result<bool> {
        if video_id.is_empty() {
            return Err(ProviderError::MissingId("video_id".to_string()));
        }
        if !image_path.is_file() {
            return Err(ProviderError::Validation(format!(
                "Thumbnail not found: {}",
                image_path.display()
            )));
        }
        self.quota.lock().await.check(QuotaOperation::ThumbnailSet)?;

        let body = tokio::fs::read(image_path).await?;
        let mime = mime_guess::from_path(image_path).first_or_octet_stream();
        let url = format!(
            "{}/thumbnails/set?videoId={}",
            UPLOAD_BASE,
            urlencoding::encode(video_id)
        );
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(&self.access_token)
            .header("Content-Type", mime.essence_str())
            .body(Bytes::from(body));

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                self.quota.lock().await.consume(QuotaOperation::ThumbnailSet);
                debug!(video_id, "Thumbnail set");
                Ok(true)
            }
            Ok(response) => {
                warn!(video_id, status = response.status, "Thumbnail set failed");
                Ok(false)
            }
            Err(e) => {
                warn!(video_id, error = %e, "Thumbnail set failed");
                Ok(false)
            }
        }
    }

    /// List the account's channels. Failures are logged and return an
    /// empty list.
    pub async fn list_channels(&self) -> Result<Vec<Channel>> {
        self.quota.lock().await.check(QuotaOperation::ChannelList)?;

        let url = format!("{}/channels?part=snippet,contentDetails&mine=true", API_BASE);
        let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(&self.access_token);

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                self.quota.lock().await.consume(QuotaOperation::ChannelList);
                let list: ChannelListResponse = response
                    .json()
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                Ok(list.items)
            }
            Ok(response) => {
                warn!(status = response.status, "Channel list failed");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "Channel list failed");
                Ok(Vec::new())
            }
        }
    }

    /// List the most recent uploads of the account's first channel.
    /// Failures are logged and return an empty list.
    pub async fn list_uploads(&self, max_results: u32) -> Result<Vec<PlaylistItem>> {
        let channels = self.list_channels().await?;
        let Some(playlist_id) = channels.iter().find_map(|c| {
            c.content_details
                .as_ref()
                .map(|d| d.related_playlists.uploads.clone())
                .filter(|id| !id.is_empty())
        }) else {
            warn!("No uploads playlist found for this account");
            return Ok(Vec::new());
        };

        self.quota
            .lock()
            .await
            .check(QuotaOperation::PlaylistItemList)?;

        let url = format!(
            "{}/playlistItems?part=snippet&playlistId={}&maxResults={}",
            API_BASE,
            urlencoding::encode(&playlist_id),
            max_results
        );
        let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(&self.access_token);

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                self.quota
                    .lock()
                    .await
                    .consume(QuotaOperation::PlaylistItemList);
                let list: PlaylistItemListResponse = response
                    .json()
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                Ok(list.items)
            }
            Ok(response) => {
                warn!(status = response.status, "Uploads list failed");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "Uploads list failed");
                Ok(Vec::new())
            }
        }
    }
}

/// Adapts the client to reconciliation's remote-resolvability seam.
///
/// Transport faults error (so reconciliation lands the file in `hindered`
/// with the fault text), while a genuinely missing record is `None`.
#[async_trait]
impl RemoteLookup for YouTubeClient {
    async fn find(
        &self,
        platform_id: &str,
    ) -> core_reconcile::Result<Option<RemoteRecord>> {
        self.quota
            .lock()
            .await
            .check(QuotaOperation::VideoList)
            .map_err(|e| core_reconcile::ReconcileError::Lookup(e.to_string()))?;

        let found = self
            .fetch_video(platform_id)
            .await
            .map_err(|e| core_reconcile::ReconcileError::Lookup(e.to_string()))?;
        self.quota.lock().await.consume(QuotaOperation::VideoList);

        Ok(found.map(|resource| RemoteRecord {
            url: Some(watch_url(&resource.id)),
            title: resource.snippet.map(|s| s.title),
            id: resource.id,
        }))
    }
}

fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn status_error(response: &HttpResponse) -> ProviderError {
    if is_transient_status(response.status) {
        ProviderError::Transient {
            status: response.status,
        }
    } else {
        ProviderError::Permanent {
            status: response.status,
            message: String::from_utf8_lossy(&response.body).to_string(),
        }
    }
}

/// Highest byte the server confirmed, from a 308 `Range: bytes=0-N` header.
fn committed_offset(response: &HttpResponse) -> Option<u64> {
    let range = response
        .header("Range")
        .or_else(|| response.header("range"))?;
    let (_, upper) = range.rsplit_once('-')?;
    upper.trim().parse::<u64>().ok().map(|n| n + 1)
}

async fn read_chunk(
    file: &mut tokio::fs::File,
    offset: u64,
    chunk_size: u64,
    total: u64,
) -> Result<Bytes> {
    let len = chunk_size.min(total - offset) as usize;
    let mut buf = vec![0u8; len];
    file.seek(SeekFrom::Start(offset)).await?;
    file.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}
