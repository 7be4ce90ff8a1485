//! # Reconciliation Engine
//!
//! The pure status transition function plus the [`Reconciler`] that wires
//! it to the tag store and the remote platform.

use crate::error::Result;
use crate::status::FileStatus;
use async_trait::async_trait;
use chrono::Utc;
use core_schema::{fingerprint, file_uuid, MetadataKey, Role, TagMap};
use core_store::{lookup, MetadataStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a remote lookup resolved for a stored platform id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Platform-assigned video id
    pub id: String,
    /// Public watch URL, when the platform exposes one
    pub url: Option<String>,
    /// Remote title, informational only
    pub title: Option<String>,
}

/// Narrow remote-resolvability seam; the platform client adapts to it.
#[async_trait]
pub trait RemoteLookup: Send + Sync {
    /// Resolve a stored platform id. `Ok(None)` means the platform answered
    /// and the record is gone; transport faults are errors.
    async fn find(&self, platform_id: &str) -> Result<Option<RemoteRecord>>;
}

/// Transfer the reconciliation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    None,
    Upload,
    Update,
}

/// The tag-derived inputs to one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub status: FileStatus,
    pub title: Option<String>,
    pub platform_id: Option<String>,
    pub sync_hash: Option<String>,
    pub fingerprint: String,
}

impl Snapshot {
    /// Build a snapshot from a raw tag map.
    ///
    /// A missing `upload_state` tag means the file was never reconciled;
    /// an unparseable one is a fault and surfaces as an error.
    pub fn from_tags(tags: &TagMap) -> Result<Self> {
        let status = match lookup(tags, MetadataKey::UploadState) {
            Some(raw) => raw.parse()?,
            None => FileStatus::Undefined,
        };
        Ok(Self {
            status,
            title: lookup(tags, MetadataKey::Title).map(str::to_string),
            platform_id: lookup(tags, MetadataKey::PlatformId).map(str::to_string),
            sync_hash: lookup(tags, MetadataKey::SyncHash).map(str::to_string),
            fingerprint: fingerprint(tags, Role::User),
        })
    }

    fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// One evaluation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: FileStatus,
    pub action: Action,
    pub error: Option<String>,
}

impl Outcome {
    fn new(status: FileStatus, action: Action) -> Self {
        Self {
            status,
            action,
            error: None,
        }
    }

    fn hindered(message: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Hindered,
            action: Action::None,
            error: Some(message.into()),
        }
    }
}

/// Pure status transition function.
///
/// `remote` is the lookup outcome for the snapshot's stored platform id
/// (`None` both when no id is stored and when the record is gone; the
/// snapshot's `platform_id` disambiguates). Every (status, condition)
/// pair yields exactly one outcome.
pub fn evaluate(snapshot: &Snapshot, remote: Option<&RemoteRecord>) -> Outcome {
    match snapshot.status {
        FileStatus::Undefined => Outcome::new(FileStatus::Acknowledged, Action::None),

        FileStatus::Acknowledged | FileStatus::Provisioned => {
            if snapshot.has_title() {
                Outcome::new(FileStatus::QueuedNew, Action::Upload)
            } else {
                Outcome::new(FileStatus::Provisioned, Action::None)
            }
        }

        FileStatus::QueuedNew | FileStatus::Uploading => match (remote, &snapshot.platform_id) {
            (Some(_), _) => Outcome::new(FileStatus::Finished, Action::None),
            (None, None) => Outcome::new(snapshot.status, Action::Upload),
            (None, Some(_)) => Outcome::hindered("uploaded video not found"),
        },

        FileStatus::Finished => {
            if snapshot.sync_hash.as_deref() != Some(snapshot.fingerprint.as_str()) {
                Outcome::new(FileStatus::QueuedEdit, Action::Update)
            } else if snapshot.platform_id.is_none() || remote.is_some() {
                // Resolvability is only checked against a stored id.
                Outcome::new(FileStatus::Finished, Action::None)
            } else {
                Outcome::hindered("remote record no longer exists")
            }
        }

        FileStatus::QueuedEdit | FileStatus::Hindered => {
            if remote.is_some() {
                Outcome::new(snapshot.status, Action::Update)
            } else {
                Outcome::hindered("cannot update remote record")
            }
        }
    }
}

/// Per-file result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub action: Action,
    pub error: Option<String>,
}

/// Reconciles files against the remote platform and writes the derived
/// bookkeeping back into each container.
pub struct Reconciler {
    store: Arc<MetadataStore>,
    remote: Arc<dyn RemoteLookup>,
}

impl Reconciler {
    pub fn new(store: Arc<MetadataStore>, remote: Arc<dyn RemoteLookup>) -> Self {
        Self { store, remote }
    }

    /// Reconcile one file. Never errors: any fault forces the file to
    /// `hindered` with the fault text recorded.
    pub async fn reconcile(&self, path: &Path) -> FileReport {
        match self.reconcile_inner(path).await {
            Ok(report) => report,
            Err(e) => {
                let message = e.to_string();
                warn!(file = %path.display(), error = %message, "Reconciliation fault");
                // Best-effort: record the fault in the container too.
                let mut entries = TagMap::new();
                entries.insert(
                    MetadataKey::UploadState.name().to_string(),
                    FileStatus::Hindered.as_str().to_string(),
                );
                entries.insert(
                    MetadataKey::ErrorMessage.name().to_string(),
                    message.clone(),
                );
                if let Err(wb) = self.store.set_many(path, &entries, Role::System).await {
                    warn!(file = %path.display(), error = %wb, "Hindered write-back failed");
                }
                FileReport {
                    path: path.to_path_buf(),
                    status: FileStatus::Hindered,
                    action: Action::None,
                    error: Some(message),
                }
            }
        }
    }

    async fn reconcile_inner(&self, path: &Path) -> Result<FileReport> {
        let tags = self.store.get_all(path).await?;
        let snapshot = Snapshot::from_tags(&tags)?;

        let remote = match &snapshot.platform_id {
            Some(id) => self.remote.find(id).await?,
            None => None,
        };

        let outcome = evaluate(&snapshot, remote.as_ref());
        debug!(
            file = %path.display(),
            from = %snapshot.status,
            to = %outcome.status,
            action = ?outcome.action,
            "Evaluated"
        );

        self.write_back(path, &tags, &snapshot, &outcome, remote.as_ref())
            .await?;

        Ok(FileReport {
            path: path.to_path_buf(),
            status: outcome.status,
            action: outcome.action,
            error: outcome.error,
        })
    }

    /// One combined bookkeeping rewrite per file.
    async fn write_back(
        &self,
        path: &Path,
        tags: &TagMap,
        snapshot: &Snapshot,
        outcome: &Outcome,
        remote: Option<&RemoteRecord>,
    ) -> Result<()> {
        let mut entries = TagMap::new();

        if lookup(tags, MetadataKey::FileUuid).is_none() {
            entries.insert(
                MetadataKey::FileUuid.name().to_string(),
                file_uuid(&path.display().to_string()),
            );
        }

        entries.insert(
            MetadataKey::UploadState.name().to_string(),
            outcome.status.as_str().to_string(),
        );

        if let Some(record) = remote {
            entries.insert(MetadataKey::PlatformId.name().to_string(), record.id.clone());
            if let Some(url) = &record.url {
                entries.insert(MetadataKey::PlatformUrl.name().to_string(), url.clone());
            }
        }

        if outcome.status == FileStatus::Finished && snapshot.status != FileStatus::Finished {
            entries.insert(
                MetadataKey::SyncHash.name().to_string(),
                snapshot.fingerprint.clone(),
            );
        }

        entries.insert(
            MetadataKey::LastSync.name().to_string(),
            Utc::now().timestamp().to_string(),
        );

        // Empty value drops the tag on rewrite.
        let error_text = match (&outcome.status, &outcome.error) {
            (FileStatus::Hindered, Some(message)) => message.clone(),
            _ => String::new(),
        };
        entries.insert(MetadataKey::ErrorMessage.name().to_string(), error_text);

        self.store.set_many(path, &entries, Role::System).await?;
        Ok(())
    }

    /// Reconcile a batch sequentially; one report per input path.
    pub async fn reconcile_all(&self, paths: &[PathBuf]) -> Vec<FileReport> {
        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            reports.push(self.reconcile(path).await);
        }
        reports
    }
}
