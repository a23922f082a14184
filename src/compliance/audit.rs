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


//! Shortening step log, preview rendering, and JSON export
//!
//! Every step the truncator takes is recorded in production order. The export
//! pairs the original and new name sets with the full step log, which is
//! enough to rebuild the inverse rename later.

use crate::compliance::models::{ComplianceLogEntry, RenamePlan, Scope};
use crate::compliance::verifier::verify_names;
use crate::error::{ComplianceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Ordered log of shortening steps for one plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<ComplianceLogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ComplianceLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ComplianceLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn folder_entries(&self) -> impl Iterator<Item = &ComplianceLogEntry> {
        self.entries.iter().filter(|e| e.scope == Scope::Folder)
    }

    pub fn file_entries(&self) -> impl Iterator<Item = &ComplianceLogEntry> {
        self.entries.iter().filter(|e| e.scope == Scope::File)
    }

    /// Characters removed across all steps
    pub fn total_saved(&self) -> usize {
        self.entries.iter().map(|e| e.saved_chars).sum()
    }

    /// Human-readable preview: folder changes first, then file changes
    /// grouped by the file they touched
    pub fn preview(&self) -> String {
        let mut out = String::new();

        let folder: Vec<_> = self.folder_entries().collect();
        if !folder.is_empty() {
            out.push_str("Folder changes:\n");
            for entry in folder {
                write_entry(&mut out, entry);
            }
        }

        let mut targets: Vec<&str> = Vec::new();
        for entry in self.file_entries() {
            if !targets.contains(&entry.target.as_str()) {
                targets.push(&entry.target);
            }
        }
        if !targets.is_empty() {
            out.push_str("File changes:\n");
            for target in targets {
                let _ = writeln!(out, "  {}", target);
                for entry in self.file_entries().filter(|e| e.target == target) {
                    write_entry(&mut out, entry);
                }
            }
        }

        if out.is_empty() {
            out.push_str("No changes needed.\n");
        }
        out
    }
}

fn write_entry(out: &mut String, entry: &ComplianceLogEntry) {
    let _ = writeln!(
        out,
        "    [p{}] {} (-{} chars, {} -> {}){}",
        entry.priority,
        entry.step,
        entry.saved_chars,
        entry.before_len,
        entry.after_len,
        if entry.compliant { " ✓" } else { "" }
    );
    let _ = writeln!(out, "      before: {}", entry.before_text);
    let _ = writeln!(out, "      after:  {}", entry.after_text);
}

/// Single-directory JSON export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanExport {
    pub original_folder: String,
    pub original_files: Vec<String>,
    pub new_folder: String,
    pub new_files: Vec<String>,
    pub max_length: usize,
    pub changes: Vec<ComplianceLogEntry>,
}

impl PlanExport {
    pub fn from_plan(plan: &RenamePlan) -> Self {
        Self {
            original_folder: plan.original_folder.clone(),
            original_files: plan.original_files.clone(),
            new_folder: plan.new_folder.clone(),
            new_files: plan.new_files.clone(),
            max_length: plan.max_length,
            changes: plan.log.entries().to_vec(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ComplianceError::FileNotFound(format!("{}: {}", path.display(), e))
        })?;
        let export: PlanExport = serde_json::from_str(&data)?;
        if export.original_files.len() != export.new_files.len() {
            return Err(ComplianceError::InvalidPath(format!(
                "export {} pairs {} original files with {} new files",
                path.display(),
                export.original_files.len(),
                export.new_files.len()
            )));
        }
        Ok(export)
    }

    /// Export describing the rename back to the original names
    ///
    /// Only valid as long as nothing outside depended on the old names in
    /// the meantime.
    pub fn inverse(&self) -> Self {
        Self {
            original_folder: self.new_folder.clone(),
            original_files: self.new_files.clone(),
            new_folder: self.original_folder.clone(),
            new_files: self.original_files.clone(),
            max_length: self.max_length,
            changes: Vec::new(),
        }
    }

    /// Rebuild a plan from the export, re-verifying the new names
    pub fn to_plan(&self) -> RenamePlan {
        let report = verify_names(
            &self.original_folder,
            &self.original_files,
            &self.new_folder,
            &self.new_files,
            self.max_length,
            true,
        );
        let mut log = AuditLog::new();
        for entry in &self.changes {
            log.record(entry.clone());
        }
        RenamePlan {
            original_folder: self.original_folder.clone(),
            new_folder: self.new_folder.clone(),
            original_files: self.original_files.clone(),
            new_files: self.new_files.clone(),
            max_length: self.max_length,
            log,
            succeeded: report.passes(),
            failure_reason: report.failure_reason(),
        }
    }
}
