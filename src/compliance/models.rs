//! Data model for path compliance
//!
//! Tokens, log entries, analyses, tracker intents and rename plans. All types
//! serialize with serde so they can be exported as JSON.

use crate::compliance::audit::AuditLog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// LENGTH HELPERS
// ============================================================================

/// Length in characters, the unit the tracker budget is expressed in
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Length of `folder + '/' + file`
pub fn full_path_len(folder: &str, file: &str) -> usize {
    char_len(folder) + 1 + char_len(file)
}

/// Characters over budget for one file (zero when it fits)
pub fn overage(folder: &str, file: &str, max_full_path: usize) -> usize {
    full_path_len(folder, file).saturating_sub(max_full_path)
}

// ============================================================================
// TOKENS
// ============================================================================

/// Semantic field a token represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Asin,
    Title,
    Volume,
    Group,
    Author,
    Year,
    Generic,
}

impl TokenKind {
    /// Preservation rank; lower is kept longer
    pub fn priority(&self) -> u8 {
        match self {
            TokenKind::Asin => 0,
            TokenKind::Title => 1,
            TokenKind::Volume => 2,
            TokenKind::Group => 3,
            TokenKind::Author => 4,
            TokenKind::Year => 5,
            TokenKind::Generic => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Asin => "asin",
            TokenKind::Title => "title",
            TokenKind::Volume => "volume",
            TokenKind::Group => "group",
            TokenKind::Author => "author",
            TokenKind::Year => "year",
            TokenKind::Generic => "generic",
        }
    }
}

/// Byte range of a token inside its source string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A classified, bounded substring of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationToken {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub priority: u8,
}

impl IdentificationToken {
    pub fn new(kind: TokenKind, source: &str, span: Span) -> Self {
        Self {
            kind,
            text: source[span.start..span.end].to_string(),
            span,
            priority: kind.priority(),
        }
    }
}

// ============================================================================
// AUDIT ENTRIES
// ============================================================================

/// Which name a shortening step touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Folder,
    File,
}

/// One shortening step
///
/// Field order follows the exported `changes` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceLogEntry {
    pub scope: Scope,
    /// Folder name or original filename the step applied to
    pub target: String,
    /// Rank of the token touched
    pub priority: u8,
    pub step: String,
    pub before_len: usize,
    pub after_len: usize,
    pub saved_chars: usize,
    /// Whether this scope met budget after the step
    pub compliant: bool,
    pub before_text: String,
    pub after_text: String,
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// A file whose full path exceeds the budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathViolation {
    pub filename: String,
    /// `folder/filename`
    pub path: String,
    pub length: usize,
    pub overage: usize,
}

/// Whether hard-link detection could run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardLinkStatus {
    /// Inode metadata available and at least one hard link found
    Detected,
    /// Inode metadata available, no hard links present
    NoneFound,
    /// Platform or filesystem gives no inode metadata
    Unsupported,
}

/// Read-only compliance scan of an existing directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceAnalysis {
    pub folder_name: String,
    pub file_count: usize,
    pub max_length: usize,
    pub compliant: bool,
    pub violations: Vec<PathViolation>,
    pub max_overage: usize,
    pub total_overage: usize,
    pub hard_link_status: HardLinkStatus,
    pub hard_linked_files: usize,
    /// inode → paths inside the directory sharing it
    pub hard_link_groups: BTreeMap<u64, Vec<String>>,
}

// ============================================================================
// TRACKER INTENT
// ============================================================================

/// Advisory verdict on which tracker a directory was prepared for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerIntent {
    pub detected_trackers: Vec<String>,
    pub primary_intent: Option<String>,
    pub safe_for_target: bool,
}

// ============================================================================
// RENAME PLAN
// ============================================================================

/// Proposed renames for one folder and its files
///
/// Computed fresh per invocation; position `i` of `new_files` is always the
/// new name of `original_files[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePlan {
    pub original_folder: String,
    pub new_folder: String,
    pub original_files: Vec<String>,
    pub new_files: Vec<String>,
    pub max_length: usize,
    pub log: AuditLog,
    pub succeeded: bool,
    /// Why planning failed, when it did
    pub failure_reason: Option<String>,
}

impl RenamePlan {
    /// Successful plan that changes nothing
    pub fn unchanged(folder: &str, files: &[String], max_length: usize) -> Self {
        Self {
            original_folder: folder.to_string(),
            new_folder: folder.to_string(),
            original_files: files.to_vec(),
            new_files: files.to_vec(),
            max_length,
            log: AuditLog::new(),
            succeeded: true,
            failure_reason: None,
        }
    }

    pub fn folder_changed(&self) -> bool {
        self.original_folder != self.new_folder
    }

    /// `(old, new)` pairs for files whose name changes
    pub fn file_renames(&self) -> impl Iterator<Item = (&str, &str)> {
        self.original_files
            .iter()
            .zip(self.new_files.iter())
            .filter(|(old, new)| old != new)
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    pub fn has_changes(&self) -> bool {
        self.folder_changed() || self.file_renames().next().is_some()
    }

    /// Longest `folder/file` length under the new names
    pub fn longest_new_path(&self) -> usize {
        self.new_files
            .iter()
            .map(|f| full_path_len(&self.new_folder, f))
            .max()
            .unwrap_or_else(|| char_len(&self.new_folder))
    }
}
