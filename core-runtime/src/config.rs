//! # Application Configuration
//!
//! Account credentials and upload settings, persisted as a JSON file.
//!
//! ## Overview
//!
//! [`AppConfig`] holds one publishing account plus the upload defaults the
//! session engine applies to every job. Validation is fail-fast: a config
//! that would later break mid-session (empty API key on an enabled account,
//! a chunk size the resumable protocol rejects) is refused at load time
//! with an actionable message.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Resumable uploads require chunk sizes in multiples of 256 KiB.
const CHUNK_ALIGNMENT: u64 = 256 * 1024;

/// One publishing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Human-readable account name
    pub name: String,
    /// API key / access token used for all platform calls
    pub api_key: String,
    /// Channel to publish to, when the account owns more than one
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Daily upload cap enforced locally, on top of the platform quota
    #[serde(default)]
    pub max_uploads_per_day: Option<u32>,
    /// Disabled accounts are kept in the config but never used
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Defaults applied to every upload job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Privacy applied when a file carries none ("private", "unlisted", "public")
    pub default_privacy: String,
    /// Platform category id applied when a file carries none
    pub default_category: String,
    /// Retry ceiling for transient upload failures
    pub max_retries: u32,
    /// Resumable upload chunk size, in bytes
    pub chunk_size_bytes: u64,
    /// Pause between consecutive jobs, in seconds
    pub interval_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            default_privacy: "private".to_string(),
            default_category: "22".to_string(),
            max_retries: 8,
            chunk_size_bytes: 8 * 1024 * 1024,
            interval_secs: 10,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub account: AccountConfig,
    #[serde(default)]
    pub upload: UploadSettings,
}

impl AppConfig {
    /// Load and validate a config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), account = %config.account.name, "Config loaded");
        Ok(config)
    }

    /// Persist the config as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), contents).await?;
        Ok(())
    }

    /// Fail-fast validation of everything a session would trip over later.
    pub fn validate(&self) -> Result<()> {
        if self.account.name.trim().is_empty() {
            return Err(Error::Config("Account name must not be empty".to_string()));
        }
        if self.account.enabled && self.account.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "Account '{}' is enabled but has no API key",
                self.account.name
            )));
        }
        if !matches!(
            self.upload.default_privacy.as_str(),
            "private" | "unlisted" | "public"
        ) {
            return Err(Error::Config(format!(
                "Unknown privacy '{}': expected private, unlisted or public",
                self.upload.default_privacy
            )));
        }
        if self.upload.max_retries == 0 {
            return Err(Error::Config("max_retries must be at least 1".to_string()));
        }
        if self.upload.chunk_size_bytes == 0
            || self.upload.chunk_size_bytes % CHUNK_ALIGNMENT != 0
        {
            return Err(Error::Config(format!(
                "chunk_size_bytes must be a positive multiple of {} bytes",
                CHUNK_ALIGNMENT
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            account: AccountConfig {
                name: "main".to_string(),
                api_key: "key-123".to_string(),
                channel_id: None,
                max_uploads_per_day: Some(10),
                enabled: true,
            },
            upload: UploadSettings::default(),
        }
    }

    #[test]
    fn test_default_settings_validate() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_enabled_account_requires_api_key() {
        let mut config = valid_config();
        config.account.api_key = "  ".to_string();
        assert!(config.validate().is_err());

        config.account.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunk_size_must_be_aligned() {
        let mut config = valid_config();
        config.upload.chunk_size_bytes = 1_000_000;
        assert!(config.validate().is_err());

        config.upload.chunk_size_bytes = 256 * 1024;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_privacy_rejected() {
        let mut config = valid_config();
        config.upload.default_privacy = "secret".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = valid_config();
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"account":{"name":"","api_key":""}}"#)
            .await
            .unwrap();

        assert!(AppConfig::load(&path).await.is_err());
    }
}
