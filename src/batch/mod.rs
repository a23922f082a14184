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


//! Multi-directory compliance runs
//!
//! [`BatchScanner`] discovers candidate directories under a root, analyzes
//! each one, estimates fixability with a dry-run plan, and classifies tracker
//! intent. The resulting [`BatchReport`] feeds the JSON export, the generated
//! fix script, or a direct in-process apply.

pub mod scanner;
pub mod script;

pub use scanner::{ApplyStatus, BatchReport, BatchScanner, BatchSummary, DirectoryResult};
pub use script::{generate_fix_script, write_fix_script, ScriptOptions};
