//! Printable roll-up of a reconciliation pass.

use crate::engine::{Action, FileReport};
use crate::status::FileStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts per status plus the pending work a pass uncovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub undefined: usize,
    pub acknowledged: usize,
    pub provisioned: usize,
    pub queued_new: usize,
    pub uploading: usize,
    pub finished: usize,
    pub queued_edit: usize,
    pub hindered: usize,
    pub needs_upload: usize,
    pub needs_update: usize,
}

impl Summary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report.status {
                FileStatus::Undefined => summary.undefined += 1,
                FileStatus::Acknowledged => summary.acknowledged += 1,
                FileStatus::Provisioned => summary.provisioned += 1,
                FileStatus::QueuedNew => summary.queued_new += 1,
                FileStatus::Uploading => summary.uploading += 1,
                FileStatus::Finished => summary.finished += 1,
                FileStatus::QueuedEdit => summary.queued_edit += 1,
                FileStatus::Hindered => summary.hindered += 1,
            }
            match report.action {
                Action::Upload => summary.needs_upload += 1,
                Action::Update => summary.needs_update += 1,
                Action::None => {}
            }
        }
        summary
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files scanned: {}", self.total)?;
        for (label, count) in [
            ("acknowledged", self.acknowledged),
            ("provisioned", self.provisioned),
            ("queued_new", self.queued_new),
            ("uploading", self.uploading),
            ("finished", self.finished),
            ("queued_edit", self.queued_edit),
            ("hindered", self.hindered),
        ] {
            if count > 0 {
                writeln!(f, "  {}: {}", label, count)?;
            }
        }
        write!(
            f,
            "Pending: {} upload(s), {} update(s)",
            self.needs_upload, self.needs_update
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(status: FileStatus, action: Action) -> FileReport {
        FileReport {
            path: PathBuf::from("/videos/a.mp4"),
            status,
            action,
            error: None,
        }
    }

    #[test]
    fn test_counts_statuses_and_actions() {
        let reports = vec![
            report(FileStatus::QueuedNew, Action::Upload),
            report(FileStatus::QueuedEdit, Action::Update),
            report(FileStatus::Finished, Action::None),
            report(FileStatus::Hindered, Action::None),
        ];
        let summary = Summary::from_reports(&reports);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.queued_new, 1);
        assert_eq!(summary.hindered, 1);
        assert_eq!(summary.needs_upload, 1);
        assert_eq!(summary.needs_update, 1);
    }

    #[test]
    fn test_display_skips_empty_buckets() {
        let reports = vec![report(FileStatus::Finished, Action::None)];
        let rendered = Summary::from_reports(&reports).to_string();

        assert!(rendered.contains("finished: 1"));
        assert!(!rendered.contains("hindered"));
    }
}
