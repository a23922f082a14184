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


//! Fix script generation
//!
//! Turns a [`BatchReport`] into a bash script with one `fix --apply`
//! invocation per safe, fixable directory. Each line re-plans from scratch
//! against the directory's absolute path when the script runs.

use crate::batch::scanner::{BatchReport, DirectoryResult};
use crate::error::Result;
use chrono::Utc;
use shell_escape::escape;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

/// How the script invokes the fixer
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Executable to call, e.g. `librisync-compliance`
    pub program: String,
    /// Emit `--force` lines for unsafe directories instead of commenting them out
    pub include_unsafe: bool,
    pub target_tracker: Option<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            program: env!("CARGO_PKG_NAME").to_string(),
            include_unsafe: false,
            target_tracker: None,
        }
    }
}

/// Render the fix script for every non-compliant directory in `report`
pub fn generate_fix_script(report: &BatchReport, options: &ScriptOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#!/usr/bin/env bash");
    let _ = writeln!(out, "# Path compliance fix script");
    let _ = writeln!(out, "# Generated: {}", Utc::now().to_rfc3339());
    let _ = writeln!(out, "# Scan root: {}", report.scan_path.display());
    let _ = writeln!(out, "# Max length: {}", report.max_length);
    let _ = writeln!(
        out,
        "# Directories: {} non-compliant, {} auto-fixable, {} flagged unsafe",
        report.summary.non_compliant_directories,
        report.summary.auto_fixable_directories,
        report.summary.unsafe_directories
    );
    let _ = writeln!(out, "set -u");
    let _ = writeln!(out);

    for result in report.non_compliant() {
        write_directory(&mut out, result, report.max_length, options);
    }
    out
}

fn write_directory(out: &mut String, result: &DirectoryResult, max_length: usize, options: &ScriptOptions) {
    let path = shell_quote(&result.path.display().to_string());

    if !result.auto_fixable {
        let reason = result.planning_error.as_deref().unwrap_or("planning failed");
        let _ = writeln!(out, "# NOT AUTO-FIXABLE ({}): {}", reason, path);
        return;
    }

    let mut command = format!(
        "{} fix --apply --max-length {}",
        shell_quote(&options.program),
        max_length
    );
    if let Some(tracker) = &options.target_tracker {
        let _ = write!(command, " --target-tracker {}", shell_quote(tracker));
    }

    if result.tracker.safe_for_target {
        let _ = writeln!(out, "{} {}", command, path);
    } else {
        let tracker = result.tracker.primary_intent.as_deref().unwrap_or("unknown");
        if options.include_unsafe {
            let _ = writeln!(out, "# detected tracker: {}", tracker);
            let _ = writeln!(out, "{} --force {}", command, path);
        } else {
            let _ = writeln!(out, "# SKIPPED (detected tracker: {}): {} {}", tracker, command, path);
        }
    }
}

/// Quote a word for POSIX shells; plain words pass through unchanged
pub fn shell_quote(text: &str) -> String {
    escape(Cow::Borrowed(text)).into_owned()
}

/// Write the script and mark it executable (unix)
pub fn write_fix_script(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }

    tracing::info!(path = %path.display(), "Wrote fix script");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::scanner::BatchSummary;
    use crate::compliance::models::{HardLinkStatus, TrackerIntent};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn result(path: &str, fixable: bool, tracker: Option<&str>) -> DirectoryResult {
        DirectoryResult {
            path: PathBuf::from(path),
            folder_name: path.rsplit('/').next().unwrap().to_string(),
            file_count: 1,
            compliant: false,
            violation_count: 1,
            max_overage: 5,
            total_overage: 5,
            auto_fixable: fixable,
            proposed_folder: None,
            planned_changes: 1,
            planning_error: (!fixable).then(|| "ASIN alone exceeds budget".to_string()),
            hard_link_status: HardLinkStatus::NoneFound,
            hard_linked_files: 0,
            hard_link_groups: BTreeMap::new(),
            tracker: TrackerIntent {
                detected_trackers: tracker.map(|t| vec![t.to_string()]).unwrap_or_default(),
                primary_intent: tracker.map(str::to_string),
                safe_for_target: tracker.is_none(),
            },
            apply_status: None,
        }
    }

    fn report() -> BatchReport {
        BatchReport {
            scan_path: PathBuf::from("/data"),
            max_length: 180,
            summary: BatchSummary::default(),
            results: vec![
                result("/data/It's Fine", true, None),
                result("/data/Other [RED]", true, Some("red")),
                result("/data/Hopeless", false, None),
            ],
            errors: Vec::new(),
        }
    }

    fn options() -> ScriptOptions {
        ScriptOptions {
            program: "fixer".to_string(),
            include_unsafe: false,
            target_tracker: None,
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "plain");
        assert_eq!(shell_quote("/data/Book"), "/data/Book");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("It's"), r"'It'\''s'");
    }

    #[test]
    fn test_script_lines() {
        let script = generate_fix_script(&report(), &options());

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("# Generated: "));
        assert!(script.contains("\nfixer fix --apply --max-length 180 '/data/It'\\''s Fine'\n"));
        assert!(script.contains(
            "# SKIPPED (detected tracker: red): fixer fix --apply --max-length 180 '/data/Other [RED]'"
        ));
        assert!(script.contains("# NOT AUTO-FIXABLE (ASIN alone exceeds budget): /data/Hopeless"));
        assert!(!script.contains("--force"));
    }

    #[test]
    fn test_unsafe_override_adds_force() {
        let mut opts = options();
        opts.include_unsafe = true;
        opts.target_tracker = Some("mam".to_string());
        let script = generate_fix_script(&report(), &opts);

        assert!(script.contains(
            "fixer fix --apply --max-length 180 --target-tracker mam --force '/data/Other [RED]'"
        ));
        assert!(!script.contains("# SKIPPED"));
    }

    #[cfg(unix)]
    #[test]
    fn test_written_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fix.sh");
        write_fix_script(&path, "#!/usr/bin/env bash\n").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
