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


//! Path compliance engine
//!
//! Plans, verifies and audits renames that bring a torrent folder and its
//! files under a combined `folder/file` length budget while keeping the
//! tokens that identify the release across trackers (ASIN above all).
//!
//! # Components
//! - `tokens` - classify names into identification tokens
//! - `truncator` - priority-ordered shortening (the planner)
//! - `verifier` - recompute lengths for a finished plan
//! - `analyzer` - read-only scan of existing directories, hard-link groups
//! - `tracker` - advisory guess at which tracker a directory was made for
//! - `audit` - step log, preview, JSON export and inverse plans

pub mod analyzer;
pub mod audit;
pub mod models;
pub mod tokens;
pub mod tracker;
pub mod truncator;
pub mod verifier;

// Re-export commonly used types
pub use analyzer::{analyze_directory, analyze_names};
pub use audit::{AuditLog, PlanExport};
pub use models::{
    ComplianceAnalysis, ComplianceLogEntry, HardLinkStatus, IdentificationToken, PathViolation,
    RenamePlan, Scope, TokenKind, TrackerIntent,
};
pub use tokens::{TokenExtractor, TokenizedName};
pub use tracker::classify_tracker_intent;
pub use truncator::PriorityTruncator;
pub use verifier::{verify_plan, VerificationReport};
