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


//! Directory discovery for compliance scans
//!
//! Finds candidate torrent directories (any directory directly containing an
//! audio file) and lists the flat file names the planner works on.

use crate::error::{ComplianceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions that mark a directory as audiobook content
const AUDIO_EXTENSIONS: &[&str] = &["m4b", "mp3", "m4a", "aac", "flac", "ogg", "opus", "wav"];

/// Directories that never hold content (NAS metadata, trash, OS bookkeeping)
const SKIP_DIRS: &[&str] = &[
    "@eaDir",
    "#recycle",
    "lost+found",
    "$RECYCLE.BIN",
    "System Volume Information",
    "__MACOSX",
];

/// Check if file is an audio file
pub fn is_audio_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        AUDIO_EXTENSIONS.contains(&ext.as_str())
    } else {
        false
    }
}

/// Names of the non-directory entries directly inside `dir`, sorted
///
/// Subdirectories are ignored. Names that are not valid UTF-8 cannot be
/// planned safely and are reported as `InvalidPath`.
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ComplianceError::scan_failed(dir.display().to_string(), format!("Failed to read directory: {}", e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            ComplianceError::scan_failed(
                dir.display().to_string(),
                format!("Failed to read directory entry: {}", e),
            )
        })?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            tracing::debug!(path = %entry.path().display(), "Ignoring nested directory");
            continue;
        }
        let name = entry.file_name().into_string().map_err(|raw| {
            ComplianceError::InvalidPath(format!(
                "Non UTF-8 file name in {}: {}",
                dir.display(),
                raw.to_string_lossy()
            ))
        })?;
        files.push(name);
    }

    files.sort();
    Ok(files)
}

/// Whether `dir` directly contains at least one audio file
pub fn directory_has_audio(dir: &Path) -> Result<bool> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ComplianceError::scan_failed(dir.display().to_string(), format!("Failed to read directory: {}", e))
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if entry.file_type().map(|t| !t.is_dir()).unwrap_or(false) && is_audio_file(&path) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// UTF-8 name of the last path component
pub fn folder_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ComplianceError::InvalidPath(format!(
                "Directory has no usable name: {}",
                dir.display()
            ))
        })
}

/// Discovery results
#[derive(Debug, Default)]
pub struct CandidateScan {
    /// Directories directly containing audio, in walk order
    pub directories: Vec<PathBuf>,
    /// Directories skipped because they could not be read
    pub issues: Vec<ComplianceError>,
}

/// Summary counts for logging and reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    pub directories_visited: usize,
    pub candidates_found: usize,
    pub directories_skipped: usize,
}

/// Walks a tree looking for candidate torrent directories
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    /// Whether to follow symbolic links
    follow_links: bool,
    /// Maximum depth to traverse
    max_depth: Option<usize>,
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self {
            follow_links: false,
            max_depth: None,
        }
    }
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Find every directory under `root` (inclusive) that directly holds audio
    ///
    /// Unreadable directories are recorded as `ScanFailure` issues and the
    /// walk continues elsewhere.
    pub fn find_candidates(&self, root: &Path) -> Result<(CandidateScan, DiscoveryStats)> {
        if !root.exists() {
            return Err(ComplianceError::FileNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(ComplianceError::InvalidPath(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let mut walker = WalkDir::new(root).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut scan = CandidateScan::default();
        let mut stats = DiscoveryStats::default();

        for entry in walker.into_iter().filter_entry(|e| !is_skipped_dir(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    tracing::warn!(%path, error = %e, "Skipping unreadable directory");
                    scan.issues.push(ComplianceError::scan_failed(path, e.to_string()));
                    stats.directories_skipped += 1;
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }
            stats.directories_visited += 1;

            match directory_has_audio(entry.path()) {
                Ok(true) => {
                    scan.directories.push(entry.path().to_path_buf());
                    stats.candidates_found += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Skipping unreadable directory");
                    scan.issues.push(e);
                    stats.directories_skipped += 1;
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            visited = stats.directories_visited,
            candidates = stats.candidates_found,
            skipped = stats.directories_skipped,
            "Candidate discovery finished"
        );

        Ok((scan, stats))
    }
}

/// Candidate directories under `root` with the default walk settings
pub fn find_candidate_directories(root: &Path) -> Result<CandidateScan> {
    DirectoryScanner::new().find_candidates(root).map(|(scan, _)| scan)
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref())
}
