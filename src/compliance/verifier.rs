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


//! Post-plan compliance verification
//!
//! Recomputes `len(new_folder) + 1 + len(file)` for every file in a candidate
//! plan and reconciles the result with the plan's own `succeeded` flag. The
//! truncator runs this as its termination check; `apply` runs it again before
//! touching the filesystem.

use crate::compliance::models::{full_path_len, PathViolation, RenamePlan};
use crate::compliance::tokens::TokenExtractor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of re-checking a set of proposed names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Every `folder/file` fits the budget
    pub compliant: bool,
    pub longest_path: usize,
    pub violations: Vec<PathViolation>,
    /// New filenames proposed for more than one file
    pub duplicate_names: Vec<String>,
    /// Every ASIN in the original names survives unchanged
    pub asin_preserved: bool,
    /// Old and new file lists have the same length
    pub count_matches: bool,
    /// The report agrees with the plan's `succeeded` flag
    pub consistent: bool,
}

impl VerificationReport {
    /// Names are safe to apply
    pub fn passes(&self) -> bool {
        self.compliant
            && self.duplicate_names.is_empty()
            && self.asin_preserved
            && self.count_matches
    }

    /// Short description of the first problem found
    pub fn failure_reason(&self) -> Option<String> {
        if !self.count_matches {
            Some("old and new file lists differ in length".to_string())
        } else if !self.asin_preserved {
            Some("an ASIN token would be altered".to_string())
        } else if !self.duplicate_names.is_empty() {
            Some(format!(
                "shortened filenames collide: {}",
                self.duplicate_names.join(", ")
            ))
        } else if let Some(worst) = self.violations.iter().max_by_key(|v| v.overage) {
            Some(format!(
                "{} character(s) over budget on '{}' with every eligible token shortened",
                worst.overage, worst.filename
            ))
        } else {
            None
        }
    }
}

/// Files whose `folder/file` length exceeds `max_full_path`
pub fn collect_violations(folder: &str, files: &[String], max_full_path: usize) -> Vec<PathViolation> {
    files
        .iter()
        .filter_map(|file| {
            let length = full_path_len(folder, file);
            (length > max_full_path).then(|| PathViolation {
                filename: file.clone(),
                path: format!("{}/{}", folder, file),
                length,
                overage: length - max_full_path,
            })
        })
        .collect()
}

/// Check proposed names against the originals they replace
///
/// `claimed_success` is what the producer of the names asserts; the report's
/// `consistent` flag records whether that assertion holds.
pub fn verify_names(
    original_folder: &str,
    original_files: &[String],
    new_folder: &str,
    new_files: &[String],
    max_full_path: usize,
    claimed_success: bool,
) -> VerificationReport {
    let violations = collect_violations(new_folder, new_files, max_full_path);
    let longest_path = new_files
        .iter()
        .map(|f| full_path_len(new_folder, f))
        .max()
        .unwrap_or(0);

    let mut seen = HashSet::new();
    let mut duplicate_names = Vec::new();
    for name in new_files {
        if !seen.insert(name.as_str()) && !duplicate_names.contains(name) {
            duplicate_names.push(name.clone());
        }
    }

    let count_matches = original_files.len() == new_files.len();
    let asin_preserved = asins_survive(original_folder, new_folder)
        && original_files
            .iter()
            .zip(new_files.iter())
            .all(|(old, new)| asins_survive(old, new));

    let mut report = VerificationReport {
        compliant: violations.is_empty(),
        longest_path,
        violations,
        duplicate_names,
        asin_preserved,
        count_matches,
        consistent: true,
    };
    report.consistent = report.passes() == claimed_success;
    report
}

/// Re-verify a finished plan
pub fn verify_plan(plan: &RenamePlan) -> VerificationReport {
    verify_names(
        &plan.original_folder,
        &plan.original_files,
        &plan.new_folder,
        &plan.new_files,
        plan.max_length,
        plan.succeeded,
    )
}

fn asins_survive(before: &str, after: &str) -> bool {
    TokenExtractor::extract(before)
        .asins()
        .all(|asin| after.contains(&asin.text))
}
