//! Container tag store over the external probe/mux tools.

use crate::delta::{DeltaOp, MetadataDelta};
use crate::error::{Result, StoreError};
use crate::probe::{Intrinsic, ProbeOutput};
use bridge_traits::process::ProcessRunner;
use core_schema::{can_edit, MetadataKey, Role, TagMap, TAG_PREFIX};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Look a schema key up in a raw tag map.
///
/// Tags may be stored under the key's container tag name or its bare
/// schema name, depending on who wrote them.
pub fn lookup<'a>(tags: &'a TagMap, key: MetadataKey) -> Option<&'a str> {
    tags.get(key.tag_name())
        .or_else(|| tags.get(key.name()))
        .map(String::as_str)
}

/// Metadata store adapter for one probe/mux tool pair.
///
/// Every mutating call reads the full current tag map, applies its change,
/// and rewrites the entire container exactly once. The rewrite goes to a
/// temporary sibling file that atomically replaces the original on
/// success; on failure the temporary is removed and the original is left
/// untouched.
pub struct MetadataStore {
    runner: Arc<dyn ProcessRunner>,
    probe_cmd: String,
    mux_cmd: String,
}

/// User-owned flag marking a file as cleared for upload.
pub const READY_FLAG_KEY: &str = "ready_to_upload";

impl MetadataStore {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_commands(runner, "ffprobe", "ffmpeg")
    }

    /// Use non-default tool binaries (e.g. absolute paths).
    pub fn with_commands(
        runner: Arc<dyn ProcessRunner>,
        probe_cmd: impl Into<String>,
        mux_cmd: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            probe_cmd: probe_cmd.into(),
            mux_cmd: mux_cmd.into(),
        }
    }

    async fn probe(&self, file: &Path, show_streams: bool) -> Result<ProbeOutput> {
        if !file.exists() {
            return Err(StoreError::FileNotFound(file.display().to_string()));
        }

        let mut args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
        ];
        if show_streams {
            args.push("-show_streams".to_string());
        }
        args.push(file.display().to_string());

        let output = self.runner.run(&self.probe_cmd, &args).await?;
        if !output.success() {
            return Err(StoreError::Probe(output.stderr_text()));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// All tags currently embedded in the container.
    pub async fn get_all(&self, file: &Path) -> Result<TagMap> {
        let probe = self.probe(file, false).await?;
        Ok(probe.format.map(|f| f.tags).unwrap_or_default())
    }

    /// Read-only attributes derived from the file itself.
    pub async fn intrinsic(&self, file: &Path) -> Result<Intrinsic> {
        let probe = self.probe(file, true).await?;
        Ok(Intrinsic::from_probe(&probe))
    }

    /// Value of a single schema key, if present.
    pub async fn get(&self, file: &Path, key: MetadataKey) -> Result<Option<String>> {
        let tags = self.get_all(file).await?;
        Ok(lookup(&tags, key).map(str::to_string))
    }

    /// Set a single tag.
    ///
    /// Returns `Ok(false)` without side effects when `cardinal` may not
    /// edit `key` (policy violations are a no-op, not an error).
    pub async fn set(&self, file: &Path, key: &str, value: &str, cardinal: Role) -> Result<bool> {
        if !can_edit(key, cardinal) {
            debug!(key = key, cardinal = %cardinal, "Write denied, ignoring");
            return Ok(false);
        }

        let mut tags = self.get_all(file).await?;
        tags.insert(actual_tag_name(key), value.to_string());
        self.rewrite(file, &tags).await?;
        Ok(true)
    }

    /// Set several tags in one container rewrite.
    ///
    /// Entries the cardinal may not edit are skipped silently. Returns
    /// `Ok(false)` when nothing was applied (no rewrite happens).
    pub async fn set_many(&self, file: &Path, entries: &TagMap, cardinal: Role) -> Result<bool> {
        let mut tags = self.get_all(file).await?;
        let mut applied = false;

        for (key, value) in entries {
            if !can_edit(key, cardinal) {
                debug!(key = %key, cardinal = %cardinal, "Write denied, ignoring");
                continue;
            }
            tags.insert(actual_tag_name(key), value.clone());
            applied = true;
        }

        if !applied {
            return Ok(false);
        }
        self.rewrite(file, &tags).await?;
        Ok(true)
    }

    /// Delete a tag. Returns `Ok(false)` if denied or not present.
    pub async fn delete(&self, file: &Path, key: &str, cardinal: Role) -> Result<bool> {
        if !can_edit(key, cardinal) {
            debug!(key = key, cardinal = %cardinal, "Delete denied, ignoring");
            return Ok(false);
        }

        let mut tags = self.get_all(file).await?;
        if !remove_tag_variants(&mut tags, key) {
            return Ok(false);
        }
        self.rewrite(file, &tags).await?;
        Ok(true)
    }

    /// Diff the file's tags against a target set, scoped to what
    /// `cardinal` may edit.
    ///
    /// Both sides are normalized into schema-name space before comparison
    /// so that a target `description` matches a container `comment`.
    pub async fn compare(
        &self,
        file: &Path,
        target: &TagMap,
        cardinal: Role,
    ) -> Result<Vec<MetadataDelta>> {
        let current = self.get_all(file).await?;

        let normalized_current = normalize_editable(&current, cardinal);
        let normalized_target = normalize_editable(target, cardinal);

        let keys: BTreeSet<&String> = normalized_current
            .keys()
            .chain(normalized_target.keys())
            .collect();

        let mut deltas = Vec::with_capacity(keys.len());
        for key in keys {
            let delta = match (normalized_current.get(key), normalized_target.get(key)) {
                (None, Some(target_value)) => {
                    MetadataDelta::new(key.clone(), target_value.clone(), DeltaOp::Added)
                }
                (Some(current_value), None) => {
                    MetadataDelta::new(key.clone(), current_value.clone(), DeltaOp::Deleted)
                }
                (Some(current_value), Some(target_value)) if current_value != target_value => {
                    MetadataDelta::new(key.clone(), target_value.clone(), DeltaOp::Changed)
                }
                (Some(current_value), Some(_)) => {
                    MetadataDelta::new(key.clone(), current_value.clone(), DeltaOp::Equal)
                }
                (None, None) => unreachable!("key came from one of the two sets"),
            };
            deltas.push(delta);
        }

        Ok(deltas)
    }

    /// Make the file's editable tags match `target` in one rewrite.
    ///
    /// Applies only added/changed/deleted entries; if the delta is all
    /// equal, the container is not touched.
    pub async fn sync(&self, file: &Path, target: &TagMap, cardinal: Role) -> Result<bool> {
        let deltas = self.compare(file, target, cardinal).await?;
        if deltas.iter().all(|d| !d.is_change()) {
            return Ok(true);
        }

        let mut tags = self.get_all(file).await?;
        for delta in &deltas {
            match delta.op {
                DeltaOp::Deleted => {
                    remove_tag_variants(&mut tags, &delta.key);
                }
                DeltaOp::Added | DeltaOp::Changed => {
                    tags.insert(actual_tag_name(&delta.key), delta.value.clone());
                }
                DeltaOp::Equal => {}
            }
        }

        self.rewrite(file, &tags).await?;
        Ok(true)
    }

    /// Mark the file ready for upload.
    pub async fn set_ready(&self, file: &Path) -> Result<bool> {
        self.set(file, READY_FLAG_KEY, "true", Role::User).await
    }

    /// Clear the ready-for-upload mark.
    pub async fn unset_ready(&self, file: &Path) -> Result<bool> {
        self.set(file, READY_FLAG_KEY, "false", Role::User).await
    }

    /// Whether the file carries the ready-for-upload mark.
    pub async fn is_ready(&self, file: &Path) -> Result<bool> {
        let tags = self.get_all(file).await?;
        Ok(tags
            .get(READY_FLAG_KEY)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false))
    }

    /// Drop every tag `cardinal` may edit, in one rewrite.
    pub async fn clear_editable(&self, file: &Path, cardinal: Role) -> Result<bool> {
        let tags = self.get_all(file).await?;
        let kept: TagMap = tags
            .into_iter()
            .filter(|(k, _)| !can_edit(k, cardinal))
            .collect();
        self.rewrite(file, &kept).await?;
        Ok(true)
    }

    /// Rewrite the whole container with exactly `tags`.
    ///
    /// Empty values are dropped rather than written, which is how tags are
    /// cleared. The mux tool strips all existing metadata and re-applies
    /// the full set while copying streams without re-encoding.
    async fn rewrite(&self, file: &Path, tags: &TagMap) -> Result<()> {
        let temp = temp_path(file);

        let mut args = vec![
            "-i".to_string(),
            file.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-y".to_string(),
        ];
        for (key, value) in tags {
            if value.is_empty() {
                continue;
            }
            args.push("-metadata".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(temp.display().to_string());

        let output = self.runner.run(&self.mux_cmd, &args).await?;
        if !output.success() {
            let stderr = output.stderr_text();
            warn!(file = %file.display(), "Container rewrite failed: {}", stderr);
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StoreError::Rewrite { stderr });
        }

        tokio::fs::rename(&temp, file).await?;
        debug!(file = %file.display(), tags = tags.len(), "Container rewritten");
        Ok(())
    }
}

/// Container tag name to write a (possibly schema) key under.
fn actual_tag_name(key: &str) -> String {
    match MetadataKey::normalize(key) {
        Some(schema_key) => schema_key.tag_name().to_string(),
        None => key.to_string(),
    }
}

/// Remove all container spellings of `key`. Returns whether any existed.
fn remove_tag_variants(tags: &mut TagMap, key: &str) -> bool {
    let mut candidates = vec![key.to_string(), format!("{}{}", TAG_PREFIX, key)];
    if let Some(schema_key) = MetadataKey::normalize(key) {
        candidates.push(schema_key.tag_name().to_string());
        candidates.push(schema_key.name().to_string());
    }

    let mut removed = false;
    for candidate in candidates {
        removed |= tags.remove(&candidate).is_some();
    }
    removed
}

/// Tags restricted to what `cardinal` may edit, keyed by schema name.
fn normalize_editable(tags: &TagMap, cardinal: Role) -> TagMap {
    tags.iter()
        .filter(|(k, _)| can_edit(k, cardinal))
        .map(|(k, v)| {
            let name = MetadataKey::normalize(k)
                .map(|key| key.name().to_string())
                .unwrap_or_else(|| k.clone());
            (name, v.clone())
        })
        .collect()
}

/// Temporary sibling used for the atomic replace; keeps the original
/// extension so the mux tool can infer the container format.
fn temp_path(file: &Path) -> PathBuf {
    match file.extension().and_then(|e| e.to_str()) {
        Some(ext) => file.with_extension(format!("tmp.{}", ext)),
        None => file.with_extension("tmp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::process::ProcessOutput;
    use mockall::mock;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    mock! {
        Runner {}

        #[async_trait]
        impl ProcessRunner for Runner {
            async fn run(&self, program: &str, args: &[String]) -> bridge_traits::Result<ProcessOutput>;
        }
    }

    const PROBE_JSON: &str = r#"{
        "format": {
            "format_name": "mp4",
            "tags": {
                "title": "Trip",
                "comment": "holiday",
                "VP:upload_state": "finished"
            }
        }
    }"#;

    fn probe_ok() -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(0),
            stdout: PROBE_JSON.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    fn media_file() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        file.write_all(b"not really a video").unwrap();
        file
    }

    fn expect_probe(mock: &mut MockRunner) {
        mock.expect_run()
            .withf(|prog, _| prog == "ffprobe")
            .returning(|_, _| Ok(probe_ok()));
    }

    /// Expect one mux invocation; creates the temp output file the way the
    /// real tool would, so the atomic rename can succeed.
    fn expect_mux_success(mock: &mut MockRunner) {
        mock.expect_run()
            .withf(|prog, _| prog == "ffmpeg")
            .times(1)
            .returning(|_, args| {
                let temp = args.last().unwrap();
                std::fs::write(temp, b"rewritten").unwrap();
                Ok(ProcessOutput {
                    exit_code: Some(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
            });
    }

    /// Probe/mux pair backed by a shared in-memory tag map, so each
    /// rewrite is visible to the next probe. Returns the mock and a
    /// rewrite counter.
    fn stateful_runner(initial: TagMap) -> (MockRunner, Arc<AtomicU32>) {
        let tags = Arc::new(Mutex::new(initial));
        let rewrites = Arc::new(AtomicU32::new(0));
        let mut mock = MockRunner::new();

        let probe_tags = tags.clone();
        mock.expect_run()
            .withf(|prog, _| prog == "ffprobe")
            .returning(move |_, _| {
                let tags = probe_tags.lock().unwrap();
                let json = serde_json::json!({ "format": { "tags": &*tags } });
                Ok(ProcessOutput {
                    exit_code: Some(0),
                    stdout: json.to_string().into_bytes(),
                    stderr: Vec::new(),
                })
            });

        let mux_tags = tags.clone();
        let mux_count = rewrites.clone();
        mock.expect_run()
            .withf(|prog, _| prog == "ffmpeg")
            .returning(move |_, args| {
                let mut next = TagMap::new();
                let mut iter = args.iter();
                while let Some(arg) = iter.next() {
                    if arg == "-metadata" {
                        if let Some((k, v)) = iter.next().and_then(|kv| kv.split_once('=')) {
                            next.insert(k.to_string(), v.to_string());
                        }
                    }
                }
                std::fs::write(args.last().unwrap(), b"rewritten").unwrap();
                *mux_tags.lock().unwrap() = next;
                mux_count.fetch_add(1, Ordering::SeqCst);
                Ok(ProcessOutput {
                    exit_code: Some(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
            });

        (mock, rewrites)
    }

    #[tokio::test]
    async fn test_get_all_reads_format_tags() {
        let file = media_file();
        let mut mock = MockRunner::new();
        expect_probe(&mut mock);

        let store = MetadataStore::new(Arc::new(mock));
        let tags = store.get_all(file.path()).await.unwrap();

        assert_eq!(tags.get("title").map(String::as_str), Some("Trip"));
        assert_eq!(
            tags.get("VP:upload_state").map(String::as_str),
            Some("finished")
        );
    }

    #[tokio::test]
    async fn test_get_resolves_schema_tag_names() {
        let file = media_file();
        let mut mock = MockRunner::new();
        expect_probe(&mut mock);

        let store = MetadataStore::new(Arc::new(mock));
        let description = store.get(file.path(), MetadataKey::Description).await.unwrap();
        assert_eq!(description.as_deref(), Some("holiday"));
    }

    #[tokio::test]
    async fn test_set_denied_is_silent_noop() {
        let file = media_file();
        // No expectations: an unauthorized write must not touch the tools.
        let mock = MockRunner::new();

        let store = MetadataStore::new(Arc::new(mock));
        let applied = store
            .set(file.path(), "VP:sync_hash", "ABCD", Role::User)
            .await
            .unwrap();

        assert!(!applied);
    }

    #[tokio::test]
    async fn test_set_rewrites_whole_container() {
        let file = media_file();
        let mut mock = MockRunner::new();
        expect_probe(&mut mock);

        mock.expect_run()
            .withf(|prog, args| {
                prog == "ffmpeg"
                    && args.contains(&"-map_metadata".to_string())
                    && args.contains(&"title=Trip 2".to_string())
                    // existing tags are carried through the rewrite
                    && args.contains(&"comment=holiday".to_string())
            })
            .times(1)
            .returning(|_, args| {
                std::fs::write(args.last().unwrap(), b"rewritten").unwrap();
                Ok(ProcessOutput {
                    exit_code: Some(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
            });

        let store = MetadataStore::new(Arc::new(mock));
        let applied = store
            .set(file.path(), "title", "Trip 2", Role::User)
            .await
            .unwrap();

        assert!(applied);
        assert_eq!(std::fs::read(file.path()).unwrap(), b"rewritten");
    }

    #[tokio::test]
    async fn test_failed_rewrite_leaves_original_untouched() {
        let file = media_file();
        let original = std::fs::read(file.path()).unwrap();

        let mut mock = MockRunner::new();
        expect_probe(&mut mock);
        mock.expect_run()
            .withf(|prog, _| prog == "ffmpeg")
            .times(1)
            .returning(|_, _| {
                Ok(ProcessOutput {
                    exit_code: Some(1),
                    stdout: Vec::new(),
                    stderr: b"muxer exploded".to_vec(),
                })
            });

        let store = MetadataStore::new(Arc::new(mock));
        let result = store.set(file.path(), "title", "Trip 2", Role::User).await;

        match result {
            Err(StoreError::Rewrite { stderr }) => assert!(stderr.contains("muxer exploded")),
            other => panic!("expected rewrite error, got {:?}", other),
        }
        assert_eq!(std::fs::read(file.path()).unwrap(), original);
        assert!(!temp_path(file.path()).exists());
    }

    #[tokio::test]
    async fn test_compare_classifies_all_ops() {
        let file = media_file();
        let mut mock = MockRunner::new();
        expect_probe(&mut mock);

        let store = MetadataStore::new(Arc::new(mock));

        let mut target = TagMap::new();
        target.insert("title".to_string(), "Trip".to_string()); // equal
        target.insert("description".to_string(), "new words".to_string()); // changed (comment)
        target.insert("artist".to_string(), "Someone".to_string()); // added
        // "VP:upload_state" is not user-editable: excluded from the delta

        let deltas = store.compare(file.path(), &target, Role::User).await.unwrap();

        let op_of = |key: &str| deltas.iter().find(|d| d.key == key).map(|d| d.op);
        assert_eq!(op_of("title"), Some(DeltaOp::Equal));
        assert_eq!(op_of("description"), Some(DeltaOp::Changed));
        assert_eq!(op_of("artist"), Some(DeltaOp::Added));
        assert_eq!(op_of("upload_state"), None);
    }

    #[tokio::test]
    async fn test_sync_applies_delta_in_single_rewrite() {
        let file = media_file();
        let mut mock = MockRunner::new();
        expect_probe(&mut mock);
        expect_mux_success(&mut mock);

        let store = MetadataStore::new(Arc::new(mock));

        let mut target = TagMap::new();
        target.insert("title".to_string(), "Renamed".to_string());
        target.insert("description".to_string(), "holiday".to_string());

        let applied = store.sync(file.path(), &target, Role::User).await.unwrap();
        assert!(applied);
    }

    #[tokio::test]
    async fn test_sync_with_no_changes_skips_rewrite() {
        let file = media_file();
        let mut mock = MockRunner::new();
        expect_probe(&mut mock);
        // No ffmpeg expectation: equal target must not rewrite.

        let store = MetadataStore::new(Arc::new(mock));

        let mut target = TagMap::new();
        target.insert("title".to_string(), "Trip".to_string());
        target.insert("description".to_string(), "holiday".to_string());

        let applied = store.sync(file.path(), &target, Role::User).await.unwrap();
        assert!(applied);
    }

    #[tokio::test]
    async fn test_sync_converges_and_recompare_is_all_equal() {
        let file = media_file();
        let mut initial = TagMap::new();
        initial.insert("title".to_string(), "Trip".to_string());
        initial.insert("comment".to_string(), "holiday".to_string());
        let (mock, rewrites) = stateful_runner(initial);
        let store = MetadataStore::new(Arc::new(mock));

        let mut target = TagMap::new();
        target.insert("title".to_string(), "Renamed".to_string());
        target.insert("description".to_string(), "new words".to_string());
        target.insert("artist".to_string(), "Someone".to_string());

        let applied = store.sync(file.path(), &target, Role::User).await.unwrap();
        assert!(applied);
        assert_eq!(rewrites.load(Ordering::SeqCst), 1);

        // A second sync sees its own writes and leaves the container alone.
        let applied = store.sync(file.path(), &target, Role::User).await.unwrap();
        assert!(applied);
        assert_eq!(rewrites.load(Ordering::SeqCst), 1);

        let deltas = store.compare(file.path(), &target, Role::User).await.unwrap();
        assert_eq!(deltas.len(), 3);
        assert!(deltas.iter().all(|d| d.op == DeltaOp::Equal));
    }

    #[tokio::test]
    async fn test_ready_flag_round_trip() {
        let file = media_file();
        let (mock, _) = stateful_runner(TagMap::new());
        let store = MetadataStore::new(Arc::new(mock));

        assert!(!store.is_ready(file.path()).await.unwrap());

        assert!(store.set_ready(file.path()).await.unwrap());
        assert!(store.is_ready(file.path()).await.unwrap());

        assert!(store.unset_ready(file.path()).await.unwrap());
        assert!(!store.is_ready(file.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_errors_before_tool_call() {
        let mock = MockRunner::new();
        let store = MetadataStore::new(Arc::new(mock));

        let result = store.get_all(Path::new("/no/such/file.mp4")).await;
        assert!(matches!(result, Err(StoreError::FileNotFound(_))));
    }
}
