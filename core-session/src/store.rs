//! Persistence for jobs: per-file sidecars plus one volatile state file
//! per scanned directory.

use crate::error::Result;
use crate::job::{Job, SidecarRecord, VolatileRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix appended to the media file name for its sidecar
const SIDECAR_SUFFIX: &str = ".vidpub.json";

/// Volatile state file kept at the directory root
const STATE_FILE: &str = ".vidpub_state.json";

/// Sidecar path for a media file (`clip.mp4` -> `clip.mp4.vidpub.json`).
pub fn sidecar_path(media: &Path) -> PathBuf {
    let mut name = media.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Job persistence rooted at one media directory.
///
/// The volatile map is held in memory and flushed whole on every persist;
/// the session is the only writer, so there is no locking discipline.
pub struct SessionStore {
    dir: PathBuf,
    state: BTreeMap<String, VolatileRecord>,
}

impl SessionStore {
    /// Open the store, loading the volatile state file if present.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let state_path = dir.join(STATE_FILE);
        let state = match tokio::fs::read_to_string(&state_path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(_) => BTreeMap::new(),
        };
        Ok(Self { dir, state })
    }

    /// Build the job list for this directory: every media file with a
    /// matching extension, merged with its sidecar (if any) and its
    /// volatile record (if any), sorted by path.
    pub async fn scan_dir(&self, extensions: &[&str]) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            if !extensions.contains(&ext.as_str()) {
                continue;
            }

            let sidecar = self.read_sidecar(&path).await;
            let volatile = self
                .state
                .get(&path.display().to_string())
                .cloned()
                .unwrap_or_default();
            jobs.push(Job::from_parts(path, sidecar, volatile));
        }

        jobs.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(dir = %self.dir.display(), jobs = jobs.len(), "Directory scanned");
        Ok(jobs)
    }

    async fn read_sidecar(&self, media: &Path) -> SidecarRecord {
        let path = sidecar_path(media);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(record) => record,
                Err(e) => {
                    warn!(sidecar = %path.display(), error = %e, "Ignoring malformed sidecar");
                    SidecarRecord::default()
                }
            },
            Err(_) => SidecarRecord::default(),
        }
    }

    /// Persist one job: its sidecar next to the media file and its
    /// volatile record into the state file, immediately.
    pub async fn persist(&mut self, job: &Job) -> Result<()> {
        let sidecar = serde_json::to_string_pretty(&job.sidecar())?;
        tokio::fs::write(sidecar_path(&job.path), sidecar).await?;

        self.state
            .insert(job.path.display().to_string(), job.volatile());
        let state = serde_json::to_string_pretty(&self.state)?;
        tokio::fs::write(self.dir.join(STATE_FILE), state).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;

    async fn touch(path: &Path) {
        tokio::fs::write(path, b"x").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_merges_sidecar_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        touch(&a).await;
        touch(&b).await;
        touch(&dir.path().join("notes.txt")).await;

        tokio::fs::write(
            sidecar_path(&a),
            r#"{"title": "Trip", "tags": ["travel"]}"#,
        )
        .await
        .unwrap();

        let state = format!(
            r#"{{"{}": {{"state": "done", "remote_id": "vid-1", "attempts": 1}}}}"#,
            b.display()
        );
        tokio::fs::write(dir.path().join(STATE_FILE), state)
            .await
            .unwrap();

        let store = SessionStore::open(dir.path()).await.unwrap();
        let jobs = store.scan_dir(&["mp4"]).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].path, a);
        assert_eq!(jobs[0].title, "Trip");
        assert_eq!(jobs[0].state, JobState::Pending);
        assert_eq!(jobs[1].state, JobState::Done);
        assert_eq!(jobs[1].remote_id.as_deref(), Some("vid-1"));
    }

    #[tokio::test]
    async fn test_persist_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mp4");
        touch(&media).await;

        let mut store = SessionStore::open(dir.path()).await.unwrap();
        let mut jobs = store.scan_dir(&["mp4"]).await.unwrap();
        let mut job = jobs.remove(0);
        job.title = "Clip".to_string();
        job.state = JobState::Failed;
        job.attempts = 3;
        job.last_msg = Some("busy".to_string());
        store.persist(&job).await.unwrap();

        let reopened = SessionStore::open(dir.path()).await.unwrap();
        let jobs = reopened.scan_dir(&["mp4"]).await.unwrap();
        assert_eq!(jobs[0].title, "Clip");
        assert_eq!(jobs[0].state, JobState::Failed);
        assert_eq!(jobs[0].attempts, 3);
        assert_eq!(jobs[0].last_msg.as_deref(), Some("busy"));
    }

    #[tokio::test]
    async fn test_malformed_sidecar_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mp4");
        touch(&media).await;
        tokio::fs::write(sidecar_path(&media), b"{not json").await.unwrap();

        let store = SessionStore::open(dir.path()).await.unwrap();
        let jobs = store.scan_dir(&["mp4"]).await.unwrap();
        assert_eq!(jobs[0].title, "");
    }
}
