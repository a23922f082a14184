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


//! Filesystem side of a rename plan
//!
//! Applies a verified [`RenamePlan`] to a directory on disk, or walks a saved
//! export backwards. All renames stay inside the parent directory: files are
//! renamed in the old folder first, the folder itself last.
//!
//! # Key Operations
//! - Re-verification before any write
//! - Pre-checks (sources exist, targets free) so most failures touch nothing
//! - Sequential renames with a count of how far a failed run got

use crate::compliance::audit::PlanExport;
use crate::compliance::models::RenamePlan;
use crate::compliance::verifier::{verify_names, verify_plan};
use crate::config::ComplianceConfig;
use crate::error::{ComplianceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What an apply call did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Renames were carried out (false for dry runs)
    pub applied: bool,
    pub files_renamed: usize,
    pub folder_renamed: bool,
    /// Directory path after the run
    pub final_path: PathBuf,
}

/// Applies rename plans under one parent directory
#[derive(Debug, Clone)]
pub struct FileManager {
    /// Directory containing the torrent folder
    parent_dir: PathBuf,
}

impl FileManager {
    /// Create a new file manager
    pub fn new<P: Into<PathBuf>>(parent_dir: P) -> Self {
        Self {
            parent_dir: parent_dir.into(),
        }
    }

    /// Apply a plan produced by the truncator
    ///
    /// The plan is verified again first. A plan that failed planning, or whose
    /// names do not hold up, is rejected before anything is read from disk.
    /// Without explicit confirmation in `config` the call reports what it
    /// would do and returns.
    pub fn apply_plan(&self, plan: &RenamePlan, config: &ComplianceConfig) -> Result<ApplyReport> {
        let report = verify_plan(plan);
        if !plan.succeeded {
            return Err(ComplianceError::planning(
                plan.original_folder.clone(),
                plan.failure_reason
                    .clone()
                    .unwrap_or_else(|| "plan did not reach compliance".to_string()),
            ));
        }
        if !report.passes() || !report.consistent {
            return Err(ComplianceError::VerificationFailed {
                folder: plan.original_folder.clone(),
                reason: report
                    .failure_reason()
                    .unwrap_or_else(|| "plan disagrees with its own verification".to_string()),
            });
        }

        self.execute(plan, config)
    }

    /// Rename a directory back to the names recorded in an export
    ///
    /// `export` is read as-is: pass `PlanExport::inverse()` of a saved plan to
    /// undo it. The length budget is not enforced, since the original names
    /// were over budget to begin with; counts and collisions still are.
    pub fn revert(&self, export: &PlanExport, config: &ComplianceConfig) -> Result<ApplyReport> {
        let report = verify_names(
            &export.original_folder,
            &export.original_files,
            &export.new_folder,
            &export.new_files,
            export.max_length,
            true,
        );
        if !report.count_matches || !report.duplicate_names.is_empty() {
            return Err(ComplianceError::VerificationFailed {
                folder: export.original_folder.clone(),
                reason: report
                    .failure_reason()
                    .unwrap_or_else(|| "export is malformed".to_string()),
            });
        }

        let mut plan = export.to_plan();
        plan.succeeded = true;
        plan.failure_reason = None;
        self.execute(&plan, config)
    }

    fn execute(&self, plan: &RenamePlan, config: &ComplianceConfig) -> Result<ApplyReport> {
        let folder_path = self.parent_dir.join(&plan.original_folder);
        let final_path = self.parent_dir.join(&plan.new_folder);

        if !config.writes_enabled() {
            tracing::info!(
                directory = %folder_path.display(),
                files = plan.file_renames().count(),
                folder = plan.folder_changed(),
                "Dry run, nothing renamed"
            );
            return Ok(ApplyReport {
                applied: false,
                files_renamed: 0,
                folder_renamed: false,
                final_path: folder_path,
            });
        }

        self.precheck(plan, &folder_path, &final_path)?;

        let directory = folder_path.display().to_string();
        let mut renamed = 0;
        for (old, new) in plan.file_renames() {
            let source = folder_path.join(old);
            let destination = folder_path.join(new);
            fs::rename(&source, &destination).map_err(|e| {
                ComplianceError::apply_failed(
                    directory.clone(),
                    renamed,
                    format!("{} -> {}: {}", old, new, e),
                )
            })?;
            tracing::debug!(from = old, to = new, "Renamed file");
            renamed += 1;
        }

        let folder_renamed = plan.folder_changed();
        if folder_renamed {
            fs::rename(&folder_path, &final_path).map_err(|e| {
                ComplianceError::apply_failed(
                    directory.clone(),
                    renamed,
                    format!("folder -> {}: {}", plan.new_folder, e),
                )
            })?;
        }

        tracing::info!(
            directory = %directory,
            files_renamed = renamed,
            folder_renamed,
            final_path = %final_path.display(),
            "Applied rename plan"
        );

        Ok(ApplyReport {
            applied: true,
            files_renamed: renamed,
            folder_renamed,
            final_path,
        })
    }

    /// Sources exist and no rename would overwrite an existing entry
    fn precheck(&self, plan: &RenamePlan, folder_path: &Path, final_path: &Path) -> Result<()> {
        if !folder_path.is_dir() {
            return Err(ComplianceError::FileNotFound(folder_path.display().to_string()));
        }

        for (old, new) in plan.file_renames() {
            let source = folder_path.join(old);
            if !file_exists(&source) {
                return Err(ComplianceError::FileNotFound(source.display().to_string()));
            }
            let destination = folder_path.join(new);
            if file_exists(&destination) {
                return Err(ComplianceError::FileAlreadyExists(
                    destination.display().to_string(),
                ));
            }
        }

        if plan.folder_changed() && file_exists(final_path) {
            return Err(ComplianceError::FileAlreadyExists(
                final_path.display().to_string(),
            ));
        }
        Ok(())
    }
}

/// Check if a path exists without following a final symlink
fn file_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
