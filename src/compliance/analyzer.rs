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


//! Read-only compliance analysis of existing directories
//!
//! Measures every `folder/file` path against the budget and surfaces files
//! sharing an inode. Renaming one hard-linked name never affects its siblings,
//! so the groups are reported for awareness only. Nothing here mutates the
//! filesystem.

use crate::compliance::models::{ComplianceAnalysis, HardLinkStatus};
use crate::compliance::verifier::collect_violations;
use crate::error::Result;
use crate::file::scanner::{folder_name, list_files};
use std::collections::BTreeMap;
use std::path::Path;

/// Inode groups found in one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardLinkReport {
    pub status: HardLinkStatus,
    pub linked_files: usize,
    pub groups: BTreeMap<u64, Vec<String>>,
}

/// Analyze names without touching the filesystem
///
/// Hard-link status is `Unsupported` since there is no metadata to consult.
pub fn analyze_names(folder: &str, files: &[String], max_full_path: usize) -> ComplianceAnalysis {
    build_analysis(
        folder,
        files,
        max_full_path,
        HardLinkReport {
            status: HardLinkStatus::Unsupported,
            linked_files: 0,
            groups: BTreeMap::new(),
        },
    )
}

/// Scan an existing directory
pub fn analyze_directory(dir: &Path, max_full_path: usize) -> Result<ComplianceAnalysis> {
    let files = list_files(dir)?;
    analyze_listed(dir, &files, max_full_path)
}

/// Scan a directory whose file list was already read
pub fn analyze_listed(dir: &Path, files: &[String], max_full_path: usize) -> Result<ComplianceAnalysis> {
    let folder = folder_name(dir)?;
    let links = detect_hard_links(dir, files)?;
    let analysis = build_analysis(&folder, files, max_full_path, links);

    tracing::debug!(
        directory = %dir.display(),
        files = analysis.file_count,
        violations = analysis.violations.len(),
        max_overage = analysis.max_overage,
        hard_linked = analysis.hard_linked_files,
        "Analyzed directory"
    );

    Ok(analysis)
}

fn build_analysis(
    folder: &str,
    files: &[String],
    max_full_path: usize,
    links: HardLinkReport,
) -> ComplianceAnalysis {
    let violations = collect_violations(folder, files, max_full_path);
    let max_overage = violations.iter().map(|v| v.overage).max().unwrap_or(0);
    let total_overage = violations.iter().map(|v| v.overage).sum();

    ComplianceAnalysis {
        folder_name: folder.to_string(),
        file_count: files.len(),
        max_length: max_full_path,
        compliant: violations.is_empty(),
        violations,
        max_overage,
        total_overage,
        hard_link_status: links.status,
        hard_linked_files: links.linked_files,
        hard_link_groups: links.groups,
    }
}

/// Group files by inode (unix)
#[cfg(unix)]
pub fn detect_hard_links(dir: &Path, files: &[String]) -> Result<HardLinkReport> {
    use std::os::unix::fs::MetadataExt;

    let mut linked_files = 0;
    let mut groups: BTreeMap<u64, Vec<String>> = BTreeMap::new();

    for name in files {
        let path = dir.join(name);
        let metadata = std::fs::symlink_metadata(&path)?;
        if metadata.is_file() && metadata.nlink() > 1 {
            linked_files += 1;
            groups
                .entry(metadata.ino())
                .or_default()
                .push(path.display().to_string());
        }
    }

    let status = if linked_files > 0 {
        HardLinkStatus::Detected
    } else {
        HardLinkStatus::NoneFound
    };

    Ok(HardLinkReport {
        status,
        linked_files,
        groups,
    })
}

/// Inode metadata is not available on this platform
#[cfg(not(unix))]
pub fn detect_hard_links(_dir: &Path, _files: &[String]) -> Result<HardLinkReport> {
    Ok(HardLinkReport {
        status: HardLinkStatus::Unsupported,
        linked_files: 0,
        groups: BTreeMap::new(),
    })
}
