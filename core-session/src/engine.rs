//! The sequential session loop.

use crate::error::Result;
use crate::job::{Job, JobState};
use crate::store::SessionStore;
use async_trait::async_trait;
use core_schema::{MetadataKey, Role, TagMap};
use core_store::MetadataStore;
use provider_youtube::client::watch_url;
use provider_youtube::types::{ProgressSink, UploadProgress, UploadState, VideoMetadata};
use provider_youtube::{PrivacyStatus, YouTubeClient};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the engine needs from the platform client.
///
/// Narrowed from the full client surface so sessions can be exercised
/// against a mock.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        cancel: &CancellationToken,
    ) -> provider_youtube::Result<UploadProgress>;

    async fn set_thumbnail(
        &self,
        video_id: &str,
        image: &Path,
    ) -> provider_youtube::Result<bool>;
}

/// Sink that surfaces chunk progress as log lines.
struct LoggingProgressSink;

impl ProgressSink for LoggingProgressSink {
    fn on_progress(&self, progress: &UploadProgress) {
        debug!(
            bytes = progress.bytes_uploaded,
            total = progress.total_bytes,
            percent = format!("{:.1}", progress.percent),
            "Upload progress"
        );
    }
}

#[async_trait]
impl Uploader for YouTubeClient {
    async fn upload(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        cancel: &CancellationToken,
    ) -> provider_youtube::Result<UploadProgress> {
        self.upload_video(path, meta, &LoggingProgressSink, cancel)
            .await
    }

    async fn set_thumbnail(
        &self,
        video_id: &str,
        image: &Path,
    ) -> provider_youtube::Result<bool> {
        YouTubeClient::set_thumbnail(self, video_id, image).await
    }
}

/// Knobs for one session run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cooldown between consecutive jobs
    pub interval: Duration,
    /// Stop after this many non-skipped jobs
    pub max_jobs: Option<usize>,
    /// Privacy applied when a job carries none
    pub default_privacy: String,
    /// Category applied when a job carries none
    pub default_category: String,
    /// Log intended actions without calling the client
    pub dry_run: bool,
    /// Extra pause after a failed job, before the regular interval
    pub failure_pause: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_jobs: None,
            default_privacy: "private".to_string(),
            default_category: "22".to_string(),
            dry_run: false,
            failure_pause: Duration::from_secs(15),
        }
    }
}

/// Tally of one session run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Runs jobs one at a time against the platform, persisting every job
/// mutation as it happens.
pub struct SessionEngine {
    uploader: Arc<dyn Uploader>,
    store: SessionStore,
    tags: Option<Arc<MetadataStore>>,
    config: SessionConfig,
}

impl SessionEngine {
    pub fn new(uploader: Arc<dyn Uploader>, store: SessionStore, config: SessionConfig) -> Self {
        Self {
            uploader,
            store,
            tags: None,
            config,
        }
    }

    /// Also record each successful upload's platform id into the media
    /// file's container tags, so reconciliation can confirm it later.
    pub fn with_tag_store(mut self, tags: Arc<MetadataStore>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Run the job list strictly sequentially.
    ///
    /// `Done` jobs are skipped. A job failure marks that job and moves
    /// on; only cross-job faults (persistence) abort the run. Every
    /// inter-job gap sleeps the configured interval, with one extra pause
    /// after a failure. The cancellation token is honored at every sleep
    /// and before every upload.
    pub async fn run(
        &mut self,
        jobs: Vec<Job>,
        cancel: &CancellationToken,
    ) -> Result<SessionReport> {
        let mut report = SessionReport::default();

        for mut job in jobs {
            if let Some(cap) = self.config.max_jobs {
                if report.attempted >= cap {
                    debug!(cap, "Job cap reached, stopping early");
                    break;
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if job.state == JobState::Done {
                debug!(file = %job.path.display(), "Already done, skipping");
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            if self.config.dry_run {
                info!(
                    file = %job.path.display(),
                    title = %job.title,
                    "Dry run: would upload"
                );
                continue;
            }

            job.state = JobState::Uploading;
            job.attempts += 1;
            self.store.persist(&job).await?;

            let meta = self.build_metadata(&job);
            let failed = match self.uploader.upload(&job.path, &meta, cancel).await {
                Ok(progress) if progress.state == UploadState::Completed => {
                    self.finish_job(&mut job, &progress).await?;
                    report.uploaded += 1;
                    false
                }
                Ok(progress) if progress.state == UploadState::Cancelled => {
                    job.state = JobState::Pending;
                    job.last_msg = Some("Cancelled mid-upload".to_string());
                    self.store.persist(&job).await?;
                    report.cancelled = true;
                    break;
                }
                Ok(progress) => {
                    let message = progress
                        .error_message
                        .unwrap_or_else(|| "Upload did not complete".to_string());
                    self.fail_job(&mut job, message).await?;
                    report.failed += 1;
                    true
                }
                Err(e) => {
                    self.fail_job(&mut job, e.to_string()).await?;
                    report.failed += 1;
                    true
                }
            };

            if failed && !sleep_or_cancelled(cancel, self.config.failure_pause).await {
                report.cancelled = true;
                break;
            }
            if !sleep_or_cancelled(cancel, self.config.interval).await {
                report.cancelled = true;
                break;
            }
        }

        info!(
            attempted = report.attempted,
            uploaded = report.uploaded,
            failed = report.failed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "Session finished"
        );
        Ok(report)
    }

    async fn finish_job(&mut self, job: &mut Job, progress: &UploadProgress) -> Result<()> {
        let video_id = progress.video_id.clone().unwrap_or_default();

        // Best-effort: a thumbnail failure is recorded, not fatal.
        if let Some(thumbnail) = job.thumbnail.clone() {
            match self.uploader.set_thumbnail(&video_id, &thumbnail).await {
                Ok(true) => {}
                Ok(false) => {
                    job.last_msg = Some("Thumbnail set failed".to_string());
                }
                Err(e) => {
                    job.last_msg = Some(format!("Thumbnail set failed: {}", e));
                }
            }
        }

        job.state = JobState::Done;
        job.remote_id = progress.video_id.clone();
        self.store.persist(job).await?;
        info!(file = %job.path.display(), video_id = %video_id, "Job done");

        self.record_platform_id(job).await;
        Ok(())
    }

    async fn fail_job(&mut self, job: &mut Job, message: String) -> Result<()> {
        warn!(file = %job.path.display(), error = %message, "Job failed");
        job.state = JobState::Failed;
        job.last_msg = Some(message);
        self.store.persist(job).await
    }

    /// Write the remote id into the container so the next reconciliation
    /// pass can confirm the upload. Best-effort: the job is already done.
    async fn record_platform_id(&self, job: &Job) {
        let (Some(tags), Some(remote_id)) = (&self.tags, &job.remote_id) else {
            return;
        };

        let mut entries = TagMap::new();
        entries.insert(MetadataKey::PlatformId.name().to_string(), remote_id.clone());
        entries.insert(
            MetadataKey::PlatformUrl.name().to_string(),
            watch_url(remote_id),
        );
        entries.insert(
            MetadataKey::UploadState.name().to_string(),
            "uploading".to_string(),
        );
        if let Err(e) = tags.set_many(&job.path, &entries, Role::System).await {
            warn!(file = %job.path.display(), error = %e, "Tag write-back failed");
        }
    }

    fn build_metadata(&self, job: &Job) -> VideoMetadata {
        let mut meta = VideoMetadata::new(job.title.clone());
        meta.description = job.description.clone();
        meta.tags = job.tags.clone();
        meta.category_id = job
            .category_id
            .clone()
            .unwrap_or_else(|| self.config.default_category.clone());

        let privacy_raw = job
            .privacy
            .as_deref()
            .unwrap_or(&self.config.default_privacy);
        meta.privacy = match privacy_raw.parse() {
            Ok(privacy) => privacy,
            Err(_) => {
                warn!(privacy = privacy_raw, "Unknown privacy, using private");
                PrivacyStatus::Private
            }
        };
        meta
    }
}

/// Sleep unless cancelled first; returns false when cancelled.
async fn sleep_or_cancelled(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use std::path::PathBuf;
    use tempfile::TempDir;

    mock! {
        Client {}

        #[async_trait]
        impl Uploader for Client {
            async fn upload(
                &self,
                path: &Path,
                meta: &VideoMetadata,
                cancel: &CancellationToken,
            ) -> provider_youtube::Result<UploadProgress>;

            async fn set_thumbnail(
                &self,
                video_id: &str,
                image: &Path,
            ) -> provider_youtube::Result<bool>;
        }
    }

    fn completed(video_id: &str) -> UploadProgress {
        let mut progress = UploadProgress::new(100);
        progress.advance(100);
        progress.state = UploadState::Completed;
        progress.video_id = Some(video_id.to_string());
        progress.watch_url = Some(watch_url(video_id));
        progress
    }

    async fn job_dir(names: &[&str]) -> (TempDir, SessionStore, Vec<Job>) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        let store = SessionStore::open(dir.path()).await.unwrap();
        let mut jobs = store.scan_dir(&["mp4"]).await.unwrap();
        for job in &mut jobs {
            job.title = job
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
        }
        (dir, store, jobs)
    }

    fn config(interval_secs: u64) -> SessionConfig {
        SessionConfig {
            interval: Duration::from_secs(interval_secs),
            failure_pause: Duration::from_secs(1),
            ..SessionConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_uploads_all_jobs_and_persists_outcomes() {
        let (dir, store, jobs) = job_dir(&["a.mp4", "b.mp4"]).await;

        let mut client = MockClient::new();
        client
            .expect_upload()
            .times(2)
            .returning(|_, _, _| Ok(completed("vid-1")));

        let mut engine = SessionEngine::new(Arc::new(client), store, config(1));
        let report = engine.run(jobs, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failed, 0);

        let reopened = SessionStore::open(dir.path()).await.unwrap();
        let jobs = reopened.scan_dir(&["mp4"]).await.unwrap();
        assert!(jobs.iter().all(|j| j.state == JobState::Done));
        assert!(jobs.iter().all(|j| j.remote_id.as_deref() == Some("vid-1")));
        assert!(jobs.iter().all(|j| j.attempts == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedules_interval_waits_between_jobs() {
        let (_dir, store, jobs) = job_dir(&["a.mp4", "b.mp4", "c.mp4"]).await;

        let mut client = MockClient::new();
        client
            .expect_upload()
            .times(3)
            .returning(|_, _, _| Ok(completed("vid-1")));

        let start = tokio::time::Instant::now();
        let mut engine = SessionEngine::new(Arc::new(client), store, config(10));
        engine.run(jobs, &CancellationToken::new()).await.unwrap();

        // At least N-1 interval waits for N jobs.
        assert!(start.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_marks_job_and_continues() {
        let (dir, store, jobs) = job_dir(&["a.mp4", "b.mp4"]).await;

        let mut client = MockClient::new();
        let first = jobs[0].path.clone();
        client
            .expect_upload()
            .times(2)
            .returning(move |path, _, _| {
                if path == first {
                    Err(provider_youtube::ProviderError::Transient { status: 503 })
                } else {
                    Ok(completed("vid-2"))
                }
            });

        let mut engine = SessionEngine::new(Arc::new(client), store, config(1));
        let report = engine.run(jobs, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.uploaded, 1);

        let reopened = SessionStore::open(dir.path()).await.unwrap();
        let jobs = reopened.scan_dir(&["mp4"]).await.unwrap();
        assert_eq!(jobs[0].state, JobState::Failed);
        assert!(jobs[0].last_msg.as_deref().unwrap().contains("503"));
        assert_eq!(jobs[1].state, JobState::Done);
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_the_client() {
        let (dir, store, jobs) = job_dir(&["a.mp4"]).await;

        // No expectations: any call would panic.
        let client = MockClient::new();
        let mut engine = SessionEngine::new(
            Arc::new(client),
            store,
            SessionConfig {
                dry_run: true,
                ..config(0)
            },
        );
        let report = engine.run(jobs, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.uploaded, 0);

        let reopened = SessionStore::open(dir.path()).await.unwrap();
        let jobs = reopened.scan_dir(&["mp4"]).await.unwrap();
        assert_eq!(jobs[0].state, JobState::Pending);
        assert_eq!(jobs[0].attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_jobs_cap_stops_early() {
        let (_dir, store, jobs) = job_dir(&["a.mp4", "b.mp4", "c.mp4"]).await;

        let mut client = MockClient::new();
        client
            .expect_upload()
            .times(1)
            .returning(|_, _, _| Ok(completed("vid-1")));

        let mut engine = SessionEngine::new(
            Arc::new(client),
            store,
            SessionConfig {
                max_jobs: Some(1),
                ..config(1)
            },
        );
        let report = engine.run(jobs, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.uploaded, 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_upload() {
        let (_dir, store, jobs) = job_dir(&["a.mp4"]).await;

        let client = MockClient::new();
        let mut engine = SessionEngine::new(Arc::new(client), store, config(1));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = engine.run(jobs, &cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_jobs_are_skipped() {
        let (_dir, store, mut jobs) = job_dir(&["a.mp4", "b.mp4"]).await;
        jobs[0].state = JobState::Done;

        let mut client = MockClient::new();
        client
            .expect_upload()
            .times(1)
            .returning(|_, _, _| Ok(completed("vid-1")));

        let mut engine = SessionEngine::new(Arc::new(client), store, config(1));
        let report = engine.run(jobs, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.attempted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thumbnail_failure_does_not_fail_the_job() {
        let (dir, store, mut jobs) = job_dir(&["a.mp4"]).await;
        let thumb = dir.path().join("cover.jpg");
        tokio::fs::write(&thumb, b"jpg").await.unwrap();
        jobs[0].thumbnail = Some(thumb);

        let mut client = MockClient::new();
        client
            .expect_upload()
            .times(1)
            .returning(|_, _, _| Ok(completed("vid-1")));
        client
            .expect_set_thumbnail()
            .times(1)
            .returning(|_, _| Ok(false));

        let mut engine = SessionEngine::new(Arc::new(client), store, config(1));
        let report = engine.run(jobs, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.uploaded, 1);
        let reopened = SessionStore::open(dir.path()).await.unwrap();
        let jobs = reopened.scan_dir(&["mp4"]).await.unwrap();
        assert_eq!(jobs[0].state, JobState::Done);
        assert!(jobs[0].last_msg.as_deref().unwrap().contains("Thumbnail"));
    }
}
