//! Client-side daily quota tracking.
//!
//! The platform bills each API operation a fixed unit cost against a daily
//! budget. This guard is advisory: it blocks an operation locally before
//! the attempt when the budget would be exceeded, and records consumption
//! only after a successful call. The platform remains authoritative.

use crate::error::{ProviderError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default daily unit budget of an API project.
pub const DEFAULT_DAILY_LIMIT: u64 = 10_000;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Billable operation categories with their unit costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaOperation {
    VideoInsert,
    VideoUpdate,
    VideoDelete,
    VideoList,
    ChannelList,
    ThumbnailSet,
    PlaylistItemList,
}

impl QuotaOperation {
    pub fn cost(&self) -> u64 {
        match self {
            Self::VideoInsert => 1600,
            Self::VideoUpdate => 50,
            Self::VideoDelete => 50,
            Self::VideoList => 1,
            Self::ChannelList => 1,
            Self::ThumbnailSet => 50,
            Self::PlaylistItemList => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VideoInsert => "video_insert",
            Self::VideoUpdate => "video_update",
            Self::VideoDelete => "video_delete",
            Self::VideoList => "video_list",
            Self::ChannelList => "channel_list",
            Self::ThumbnailSet => "thumbnail_set",
            Self::PlaylistItemList => "playlist_item_list",
        }
    }
}

impl std::fmt::Display for QuotaOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instance-owned quota state; each client carries its own.
///
/// The budget window resets when more than 24 hours have elapsed since the
/// last reset (wall-clock elapsed, not calendar-aligned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub daily_limit: u64,
    pub used_today: u64,
    /// Unix seconds of the last window reset
    pub last_reset: i64,
    /// Successful calls per operation in the current window
    pub counts: BTreeMap<QuotaOperation, u64>,
}

impl Quota {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            daily_limit,
            used_today: 0,
            last_reset: Utc::now().timestamp(),
            counts: BTreeMap::new(),
        }
    }

    /// Block the operation when its cost would exceed the remaining budget.
    pub fn check(&mut self, operation: QuotaOperation) -> Result<()> {
        self.check_at(operation, Utc::now().timestamp())
    }

    /// Record a successful, billed call.
    pub fn consume(&mut self, operation: QuotaOperation) {
        self.consume_at(operation, Utc::now().timestamp());
    }

    /// Units still available in the current window.
    pub fn remaining(&self) -> u64 {
        self.daily_limit.saturating_sub(self.used_today)
    }

    fn reset_if_stale(&mut self, now: i64) {
        if now - self.last_reset > SECONDS_PER_DAY {
            self.used_today = 0;
            self.counts.clear();
            self.last_reset = now;
        }
    }

    pub(crate) fn check_at(&mut self, operation: QuotaOperation, now: i64) -> Result<()> {
        self.reset_if_stale(now);
        if self.used_today + operation.cost() > self.daily_limit {
            return Err(ProviderError::QuotaExceeded {
                operation: operation.as_str().to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn consume_at(&mut self, operation: QuotaOperation, now: i64) {
        self.reset_if_stale(now);
        self.used_today += operation.cost();
        *self.counts.entry(operation).or_insert(0) += 1;
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_costs_dominate_budget() {
        let mut quota = Quota::new(10_000);
        let now = 1_000_000;
        quota.last_reset = now;

        for _ in 0..6 {
            quota.check_at(QuotaOperation::VideoInsert, now).unwrap();
            quota.consume_at(QuotaOperation::VideoInsert, now);
        }
        // 6 * 1600 = 9600 used; a seventh insert would need 11200
        assert!(quota.check_at(QuotaOperation::VideoInsert, now).is_err());
        // but a cheap list still fits
        assert!(quota.check_at(QuotaOperation::VideoList, now).is_ok());
    }

    #[test]
    fn test_window_resets_after_24h_elapsed() {
        let mut quota = Quota::new(100);
        let start = 1_000_000;
        quota.last_reset = start;
        quota.consume_at(QuotaOperation::ThumbnailSet, start);
        quota.consume_at(QuotaOperation::ThumbnailSet, start);
        assert!(quota
            .check_at(QuotaOperation::ThumbnailSet, start)
            .is_err());

        // Exactly 24h is not enough; strictly more is.
        assert!(quota
            .check_at(QuotaOperation::ThumbnailSet, start + SECONDS_PER_DAY)
            .is_err());
        assert!(quota
            .check_at(QuotaOperation::ThumbnailSet, start + SECONDS_PER_DAY + 1)
            .is_ok());
        assert_eq!(quota.used_today, 0);
    }

    #[test]
    fn test_consumption_only_recorded_on_success_path() {
        let mut quota = Quota::new(1_000);
        let now = 1_000_000;
        quota.last_reset = now;
        // check alone never changes usage
        quota.check_at(QuotaOperation::VideoUpdate, now).unwrap();
        assert_eq!(quota.used_today, 0);

        quota.consume_at(QuotaOperation::VideoUpdate, now);
        assert_eq!(quota.used_today, 50);
        assert_eq!(quota.counts.get(&QuotaOperation::VideoUpdate), Some(&1));
        assert_eq!(quota.remaining(), 950);
    }
}
