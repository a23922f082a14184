// LibriSync Compliance - Path length compliance for audiobook torrents
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Batch scan and apply
//!
//! Directories are handled one at a time. A directory that cannot be read or
//! renamed is counted and skipped; the run carries on with the rest.

use crate::compliance::analyzer::analyze_listed;
use crate::compliance::models::{HardLinkStatus, TrackerIntent};
use crate::compliance::tracker::classify_tracker_intent;
use crate::compliance::truncator::PriorityTruncator;
use crate::config::{BatchOptions, ComplianceConfig};
use crate::error::{ComplianceError, Result};
use crate::file::manager::FileManager;
use crate::file::scanner::{folder_name, list_files, DirectoryScanner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of a direct batch apply for one directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied {
        files_renamed: usize,
        folder_renamed: bool,
        final_path: PathBuf,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

/// Per-directory summary in a batch report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryResult {
    /// Absolute path of the directory at scan time
    pub path: PathBuf,
    pub folder_name: String,
    pub file_count: usize,
    pub compliant: bool,
    pub violation_count: usize,
    pub max_overage: usize,
    pub total_overage: usize,
    /// Non-compliant and the planner found a compliant rename
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_folder: Option<String>,
    /// Number of shortening steps in the dry-run plan
    pub planned_changes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_error: Option<String>,
    pub hard_link_status: HardLinkStatus,
    pub hard_linked_files: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub hard_link_groups: BTreeMap<u64, Vec<String>>,
    pub tracker: TrackerIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_status: Option<ApplyStatus>,
}

impl DirectoryResult {
    /// Fixable and not flagged for another tracker
    pub fn ready_to_fix(&self) -> bool {
        self.auto_fixable && self.tracker.safe_for_target
    }
}

/// Aggregate counts for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_directories: usize,
    pub compliant_directories: usize,
    pub non_compliant_directories: usize,
    pub auto_fixable_directories: usize,
    /// Flagged as prepared for a tracker other than the target
    pub unsafe_directories: usize,
    pub scan_errors: usize,
    pub applied_directories: usize,
    pub failed_directories: usize,
}

/// Batch JSON export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub scan_path: PathBuf,
    pub max_length: usize,
    pub summary: BatchSummary,
    pub results: Vec<DirectoryResult>,
    /// Directories skipped because they could not be read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Results that are non-compliant, in scan order
    pub fn non_compliant(&self) -> impl Iterator<Item = &DirectoryResult> {
        self.results.iter().filter(|r| !r.compliant)
    }
}

/// Scans and optionally fixes every candidate directory under a root
#[derive(Debug, Clone)]
pub struct BatchScanner {
    config: ComplianceConfig,
    options: BatchOptions,
    scanner: DirectoryScanner,
}

impl BatchScanner {
    pub fn new(config: ComplianceConfig, options: BatchOptions) -> Self {
        Self {
            config,
            options,
            scanner: DirectoryScanner::new(),
        }
    }

    /// Replace the directory walker (depth limit, symlink handling)
    pub fn with_directory_scanner(mut self, scanner: DirectoryScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Analyze every candidate directory under `root` without writing
    pub fn scan(&self, root: &Path) -> Result<BatchReport> {
        let root = std::fs::canonicalize(root).map_err(|e| {
            ComplianceError::scan_failed(root.display().to_string(), e.to_string())
        })?;
        let (candidates, stats) = self.scanner.find_candidates(&root)?;

        let mut report = BatchReport {
            scan_path: root.clone(),
            max_length: self.config.max_full_path,
            summary: BatchSummary::default(),
            results: Vec::new(),
            errors: candidates.issues.iter().map(|e| e.to_string()).collect(),
        };

        for dir in candidates.directories {
            if !self.options.matches(&dir.display().to_string()) {
                tracing::debug!(path = %dir.display(), "Filtered out");
                continue;
            }
            match self.scan_directory(&dir) {
                Ok(result) => report.results.push(result),
                Err(e) if e.is_recoverable_in_batch() => {
                    tracing::warn!(path = %dir.display(), error = %e, "Skipping directory");
                    report.errors.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        report.summary = summarize(&report.results, report.errors.len());
        tracing::info!(
            root = %root.display(),
            visited = stats.directories_visited,
            total = report.summary.total_directories,
            non_compliant = report.summary.non_compliant_directories,
            auto_fixable = report.summary.auto_fixable_directories,
            unsafe_dirs = report.summary.unsafe_directories,
            "Batch scan finished"
        );
        Ok(report)
    }

    /// Analyze one directory and estimate fixability with a dry-run plan
    pub fn scan_directory(&self, dir: &Path) -> Result<DirectoryResult> {
        let files = list_files(dir)?;
        let analysis = analyze_listed(dir, &files, self.config.max_full_path)?;
        let tracker =
            classify_tracker_intent(&analysis.folder_name, self.config.target_tracker.as_deref());

        let mut result = DirectoryResult {
            path: dir.to_path_buf(),
            folder_name: analysis.folder_name.clone(),
            file_count: analysis.file_count,
            compliant: analysis.compliant,
            violation_count: analysis.violations.len(),
            max_overage: analysis.max_overage,
            total_overage: analysis.total_overage,
            auto_fixable: false,
            proposed_folder: None,
            planned_changes: 0,
            planning_error: None,
            hard_link_status: analysis.hard_link_status,
            hard_linked_files: analysis.hard_linked_files,
            hard_link_groups: analysis.hard_link_groups,
            tracker,
            apply_status: None,
        };

        if !result.compliant {
            let plan = PriorityTruncator::new(&self.config).plan(&result.folder_name, &files);
            result.auto_fixable = plan.succeeded;
            result.planned_changes = plan.log.len();
            if plan.succeeded && plan.folder_changed() {
                result.proposed_folder = Some(plan.new_folder.clone());
            }
            result.planning_error = plan.failure_reason;
        }

        Ok(result)
    }

    /// Fix every ready directory in `report` in place
    ///
    /// Requires confirmed writes. Each directory's file list is read again
    /// and re-planned right before renaming. Directories flagged unsafe are
    /// skipped unless the batch options override it.
    ///
    /// Deeper directories are renamed first so a nested candidate is fixed
    /// before its parent folder moves.
    pub fn apply_all(&self, report: &mut BatchReport) -> Result<()> {
        if !self.config.writes_enabled() {
            return Err(ComplianceError::NotConfirmed(
                "batch apply requires explicit confirmation".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..report.results.len())
            .filter(|&i| report.results[i].auto_fixable)
            .collect();
        order.sort_by_key(|&i| std::cmp::Reverse(report.results[i].path.components().count()));

        for i in order {
            let result = &mut report.results[i];
            if !result.tracker.safe_for_target && !self.options.include_unsafe {
                let tracker = result
                    .tracker
                    .primary_intent
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::info!(path = %result.path.display(), %tracker, "Skipping unsafe directory");
                result.apply_status = Some(ApplyStatus::Skipped {
                    reason: format!("detected tracker: {}", tracker),
                });
                continue;
            }

            let status = match self.apply_directory(&result.path) {
                Ok(status) => status,
                Err(e) if e.is_recoverable_in_batch() => {
                    tracing::warn!(path = %result.path.display(), error = %e, "Apply failed");
                    ApplyStatus::Failed {
                        error: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };
            result.apply_status = Some(status);
        }

        report.summary = summarize(&report.results, report.summary.scan_errors);
        tracing::info!(
            applied = report.summary.applied_directories,
            failed = report.summary.failed_directories,
            "Batch apply finished"
        );
        Ok(())
    }

    fn apply_directory(&self, dir: &Path) -> Result<ApplyStatus> {
        let folder = folder_name(dir)?;
        let files = list_files(dir)?;
        let plan = PriorityTruncator::new(&self.config).plan_checked(&folder, &files)?;

        let parent = dir.parent().ok_or_else(|| {
            ComplianceError::InvalidPath(format!("Directory has no parent: {}", dir.display()))
        })?;
        let applied = FileManager::new(parent).apply_plan(&plan, &self.config)?;

        Ok(ApplyStatus::Applied {
            files_renamed: applied.files_renamed,
            folder_renamed: applied.folder_renamed,
            final_path: applied.final_path,
        })
    }
}

fn summarize(results: &[DirectoryResult], scan_errors: usize) -> BatchSummary {
    let mut summary = BatchSummary {
        total_directories: results.len(),
        scan_errors,
        ..BatchSummary::default()
    };
    for result in results {
        if result.compliant {
            summary.compliant_directories += 1;
        } else {
            summary.non_compliant_directories += 1;
        }
        if result.auto_fixable {
            summary.auto_fixable_directories += 1;
        }
        if !result.tracker.safe_for_target {
            summary.unsafe_directories += 1;
        }
        match result.apply_status {
            Some(ApplyStatus::Applied { .. }) => summary.applied_directories += 1,
            Some(ApplyStatus::Failed { .. }) => summary.failed_directories += 1,
            _ => {}
        }
    }
    summary
}
