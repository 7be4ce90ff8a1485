//! The closed metadata key table.
//!
//! Each key knows its human label, the container tag it is stored under,
//! the role required to edit it, and a default stub value. Bookkeeping
//! keys live under the [`TAG_PREFIX`] namespace so they never collide
//! with user-facing container tags.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Tag-name prefix for internal bookkeeping keys.
pub const TAG_PREFIX: &str = "VP:";

/// All metadata keys the schema knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKey {
    // Intrinsic - derived from the file itself, read-only
    Duration,
    Size,
    BitRate,
    FormatName,
    FormatLongName,
    Width,
    Height,
    CodecName,
    CodecType,
    Filename,
    Filepath,

    // Core user metadata
    Title,
    Description,
    Tags,
    Category,
    Artist,
    Album,
    Date,
    Copyright,

    // Internal bookkeeping
    UploadState,
    UploadProgress,
    FileUuid,
    LastSync,
    PlatformId,
    PlatformUrl,
    UploadUser,
    SyncHash,
    RetryCount,
    ErrorMessage,
}

impl MetadataKey {
    pub const ALL: [MetadataKey; 29] = [
        MetadataKey::Duration,
        MetadataKey::Size,
        MetadataKey::BitRate,
        MetadataKey::FormatName,
        MetadataKey::FormatLongName,
        MetadataKey::Width,
        MetadataKey::Height,
        MetadataKey::CodecName,
        MetadataKey::CodecType,
        MetadataKey::Filename,
        MetadataKey::Filepath,
        MetadataKey::Title,
        MetadataKey::Description,
        MetadataKey::Tags,
        MetadataKey::Category,
        MetadataKey::Artist,
        MetadataKey::Album,
        MetadataKey::Date,
        MetadataKey::Copyright,
        MetadataKey::UploadState,
        MetadataKey::UploadProgress,
        MetadataKey::FileUuid,
        MetadataKey::LastSync,
        MetadataKey::PlatformId,
        MetadataKey::PlatformUrl,
        MetadataKey::UploadUser,
        MetadataKey::SyncHash,
        MetadataKey::RetryCount,
        MetadataKey::ErrorMessage,
    ];

    /// Schema name, used in sidecars and lookups.
    pub fn name(&self) -> &'static str {
        match self {
            MetadataKey::Duration => "duration",
            MetadataKey::Size => "size",
            MetadataKey::BitRate => "bit_rate",
            MetadataKey::FormatName => "format_name",
            MetadataKey::FormatLongName => "format_long_name",
            MetadataKey::Width => "width",
            MetadataKey::Height => "height",
            MetadataKey::CodecName => "codec_name",
            MetadataKey::CodecType => "codec_type",
            MetadataKey::Filename => "filename",
            MetadataKey::Filepath => "filepath",
            MetadataKey::Title => "title",
            MetadataKey::Description => "description",
            MetadataKey::Tags => "tags",
            MetadataKey::Category => "category",
            MetadataKey::Artist => "artist",
            MetadataKey::Album => "album",
            MetadataKey::Date => "date",
            MetadataKey::Copyright => "copyright",
            MetadataKey::UploadState => "upload_state",
            MetadataKey::UploadProgress => "upload_progress",
            MetadataKey::FileUuid => "file_uuid",
            MetadataKey::LastSync => "last_sync",
            MetadataKey::PlatformId => "platform_id",
            MetadataKey::PlatformUrl => "platform_url",
            MetadataKey::UploadUser => "upload_user",
            MetadataKey::SyncHash => "sync_hash",
            MetadataKey::RetryCount => "retry_count",
            MetadataKey::ErrorMessage => "error_message",
        }
    }

    /// Container tag this key is stored under.
    ///
    /// Core user keys map onto the container's conventional tag names
    /// (description lives in `comment`, tags in `keywords`, category in
    /// `genre`); bookkeeping keys carry the `VP:` prefix.
    pub fn tag_name(&self) -> &'static str {
        match self {
            MetadataKey::Description => "comment",
            MetadataKey::Tags => "keywords",
            MetadataKey::Category => "genre",
            MetadataKey::UploadState => "VP:upload_state",
            MetadataKey::UploadProgress => "VP:upload_progress",
            MetadataKey::FileUuid => "VP:file_uuid",
            MetadataKey::LastSync => "VP:last_sync",
            MetadataKey::PlatformId => "VP:platform_id",
            MetadataKey::PlatformUrl => "VP:platform_url",
            MetadataKey::UploadUser => "VP:upload_user",
            MetadataKey::SyncHash => "VP:sync_hash",
            MetadataKey::RetryCount => "VP:retry_count",
            MetadataKey::ErrorMessage => "VP:error_message",
            other => other.name(),
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            MetadataKey::Duration => "Duration",
            MetadataKey::Size => "File Size",
            MetadataKey::BitRate => "Bit Rate",
            MetadataKey::FormatName => "Format",
            MetadataKey::FormatLongName => "Format Description",
            MetadataKey::Width => "Width",
            MetadataKey::Height => "Height",
            MetadataKey::CodecName => "Codec",
            MetadataKey::CodecType => "Stream Type",
            MetadataKey::Filename => "Filename",
            MetadataKey::Filepath => "File Path",
            MetadataKey::Title => "Title",
            MetadataKey::Description => "Description",
            MetadataKey::Tags => "Tags",
            MetadataKey::Category => "Category",
            MetadataKey::Artist => "Artist",
            MetadataKey::Album => "Album",
            MetadataKey::Date => "Date",
            MetadataKey::Copyright => "Copyright",
            MetadataKey::UploadState => "Upload State",
            MetadataKey::UploadProgress => "Upload Progress",
            MetadataKey::FileUuid => "File UUID",
            MetadataKey::LastSync => "Last Sync",
            MetadataKey::PlatformId => "Platform ID",
            MetadataKey::PlatformUrl => "Platform URL",
            MetadataKey::UploadUser => "Upload User",
            MetadataKey::SyncHash => "Sync Hash",
            MetadataKey::RetryCount => "Retry Count",
            MetadataKey::ErrorMessage => "Error Message",
        }
    }

    /// Role required to edit this key.
    pub fn editable_by(&self) -> Role {
        match self {
            MetadataKey::Duration
            | MetadataKey::Size
            | MetadataKey::BitRate
            | MetadataKey::FormatName
            | MetadataKey::FormatLongName
            | MetadataKey::Width
            | MetadataKey::Height
            | MetadataKey::CodecName
            | MetadataKey::CodecType
            | MetadataKey::Filename
            | MetadataKey::Filepath => Role::Noone,

            MetadataKey::Title
            | MetadataKey::Description
            | MetadataKey::Tags
            | MetadataKey::Category
            | MetadataKey::Artist
            | MetadataKey::Album
            | MetadataKey::Date
            | MetadataKey::Copyright
            | MetadataKey::UploadUser => Role::User,

            MetadataKey::UploadState
            | MetadataKey::UploadProgress
            | MetadataKey::FileUuid
            | MetadataKey::LastSync
            | MetadataKey::PlatformId
            | MetadataKey::PlatformUrl
            | MetadataKey::SyncHash
            | MetadataKey::RetryCount
            | MetadataKey::ErrorMessage => Role::System,
        }
    }

    /// Default stub value for a freshly provisioned file.
    pub fn stub(&self) -> &'static str {
        match self {
            MetadataKey::Duration => "0.0",
            MetadataKey::Size | MetadataKey::BitRate => "0",
            MetadataKey::Width | MetadataKey::Height => "0",
            MetadataKey::FormatName
            | MetadataKey::FormatLongName
            | MetadataKey::CodecName
            | MetadataKey::CodecType
            | MetadataKey::Filename
            | MetadataKey::Filepath => "unknown",
            MetadataKey::Title => "Untitled",
            MetadataKey::UploadState => "queued",
            MetadataKey::UploadProgress => "0",
            MetadataKey::FileUuid => "mock",
            MetadataKey::LastSync => "never",
            MetadataKey::UploadUser => "default",
            MetadataKey::RetryCount => "0",
            _ => "",
        }
    }

    pub fn is_intrinsic(&self) -> bool {
        self.editable_by() == Role::Noone
    }

    /// Resolve a raw container or schema key to its schema entry.
    ///
    /// Accepts the schema name, the container tag name, or either with the
    /// bookkeeping prefix stripped. Returns `None` for keys outside the
    /// schema.
    pub fn normalize(raw: &str) -> Option<MetadataKey> {
        let stripped = raw.strip_prefix(TAG_PREFIX).unwrap_or(raw);

        Self::ALL.iter().copied().find(|key| {
            stripped == key.name() || raw == key.tag_name() || stripped == key.tag_name()
        })
    }
}

/// Whether `cardinal` may edit the key named `raw`.
///
/// Keys outside the schema are always editable (fail open).
pub fn can_edit(raw: &str, cardinal: Role) -> bool {
    match MetadataKey::normalize(raw) {
        Some(key) => cardinal.outranks(key.editable_by()),
        None => true,
    }
}

/// All schema keys editable by `cardinal`.
pub fn editable_keys(cardinal: Role) -> Vec<MetadataKey> {
    MetadataKey::ALL
        .iter()
        .copied()
        .filter(|k| cardinal.outranks(k.editable_by()))
        .collect()
}

/// All schema keys `cardinal` may not touch.
pub fn blacklisted_keys(cardinal: Role) -> Vec<MetadataKey> {
    MetadataKey::ALL
        .iter()
        .copied()
        .filter(|k| !cardinal.outranks(k.editable_by()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_intrinsic_keys_locked_for_all_roles() {
        for key in MetadataKey::ALL.iter().filter(|k| k.is_intrinsic()) {
            for role in [Role::God, Role::System, Role::Sync, Role::User, Role::Mouse] {
                assert!(
                    !can_edit(key.name(), role),
                    "{} must not edit {}",
                    role,
                    key.name()
                );
            }
        }
    }

    #[test]
    fn test_unknown_keys_fail_open() {
        assert!(can_edit("x_custom_tag", Role::Mouse));
        assert!(can_edit("x_custom_tag", Role::God));
    }

    #[test]
    fn test_editable_sets_are_supersets_up_the_ladder() {
        let ladder = [Role::Mouse, Role::User, Role::Sync, Role::System, Role::God];
        for pair in ladder.windows(2) {
            let lower: HashSet<_> = editable_keys(pair[0]).into_iter().collect();
            let higher: HashSet<_> = editable_keys(pair[1]).into_iter().collect();
            assert!(
                lower.is_subset(&higher),
                "{} editable set must contain {}'s",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn test_upload_user_is_user_editable_bookkeeping() {
        assert_eq!(MetadataKey::UploadUser.editable_by(), Role::User);
        assert!(can_edit("VP:upload_user", Role::User));
        assert!(!can_edit("VP:upload_state", Role::User));
        assert!(can_edit("VP:upload_state", Role::System));
    }

    #[test]
    fn test_normalize_resolves_mapped_and_prefixed_names() {
        assert_eq!(MetadataKey::normalize("comment"), Some(MetadataKey::Description));
        assert_eq!(MetadataKey::normalize("keywords"), Some(MetadataKey::Tags));
        assert_eq!(MetadataKey::normalize("genre"), Some(MetadataKey::Category));
        assert_eq!(
            MetadataKey::normalize("VP:sync_hash"),
            Some(MetadataKey::SyncHash)
        );
        assert_eq!(MetadataKey::normalize("sync_hash"), Some(MetadataKey::SyncHash));
        assert_eq!(MetadataKey::normalize("nonsense"), None);
    }

    #[test]
    fn test_bookkeeping_tags_carry_prefix() {
        for key in [
            MetadataKey::UploadState,
            MetadataKey::SyncHash,
            MetadataKey::PlatformId,
            MetadataKey::ErrorMessage,
        ] {
            assert!(key.tag_name().starts_with(TAG_PREFIX));
        }
        assert!(!MetadataKey::Title.tag_name().starts_with(TAG_PREFIX));
    }
}
