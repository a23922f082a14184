//! Path-length compliance for audiobook torrent folders
//!
//! Plans renames that bring `folder/file` paths under a tracker's length
//! limit while keeping identifying tokens (ASIN, title, volume, group) intact,
//! verifies them, and applies them with a full audit trail.
//!
//! Planning is pure and synchronous; only [`apply`] and the batch apply path
//! touch the filesystem, and only when the config confirms writes.

pub mod batch;
pub mod compliance;
pub mod config;
pub mod error;
pub mod file;

pub use batch::{BatchReport, BatchScanner};
pub use compliance::{
    analyze_directory, analyze_names, classify_tracker_intent, verify_plan, AuditLog,
    ComplianceAnalysis, ComplianceLogEntry, PlanExport, PriorityTruncator, RenamePlan,
    TrackerIntent,
};
pub use config::{BatchOptions, ComplianceConfig};
pub use error::{ComplianceError, Result};
pub use file::{ApplyReport, FileManager};

use std::path::Path;

/// Plan a compliant rename for one folder and its files
///
/// Never fails: a plan that cannot reach the budget comes back with
/// `succeeded == false`, the original names, and the steps it tried.
pub fn plan(folder_name: &str, file_names: &[String], config: &ComplianceConfig) -> RenamePlan {
    PriorityTruncator::new(config).plan(folder_name, file_names)
}

/// Like [`plan`], but a failed plan is a `PlanningFailure`
pub fn plan_checked(
    folder_name: &str,
    file_names: &[String],
    config: &ComplianceConfig,
) -> Result<RenamePlan> {
    PriorityTruncator::new(config).plan_checked(folder_name, file_names)
}

/// Apply `plan` to the folder of that name inside `parent_dir`
pub fn apply(plan: &RenamePlan, parent_dir: &Path, config: &ComplianceConfig) -> Result<ApplyReport> {
    FileManager::new(parent_dir).apply_plan(plan, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_is_pure_for_compliant_input() {
        let files = vec!["01.m4b".to_string()];
        let plan = plan("Book", &files, &ComplianceConfig::default());
        assert!(plan.succeeded);
        assert!(!plan.has_changes());
        assert!(plan.log.is_empty());
    }

    #[test]
    fn test_plan_checked_surfaces_failure() {
        let config = ComplianceConfig::default().with_max_full_path(10);
        let files = vec!["01.m4b".to_string()];
        let err = plan_checked("Book {ASIN.B0036S4B0U}", &files, &config).unwrap_err();
        assert!(matches!(err, ComplianceError::PlanningFailure { .. }));
    }
}
