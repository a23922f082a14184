//! End-to-end compliance runs against real directories
//!
//! Builds small audiobook trees in temp directories and drives them through
//! the public API: batch scan, single-directory fix, undo, and hard links.

use librisync_compliance::batch::{generate_fix_script, ApplyStatus, ScriptOptions};
use librisync_compliance::compliance::models::HardLinkStatus;
use librisync_compliance::file::{list_files, DirectoryScanner};
use librisync_compliance::{
    analyze_directory, apply, plan, BatchOptions, BatchScanner, ComplianceConfig, FileManager,
    PlanExport,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAX: usize = 80;
const COLLIDING_STEM: &str =
    "Identical Prefix For Both Files And Then Some More Words To Pad It Out Further";

fn make_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    for file in files {
        fs::write(dir.join(file), b"audio").unwrap();
    }
    dir
}

/// Ten candidates: three over budget (two fixable), one flagged for MAM
fn build_library(root: &Path) {
    make_dir(
        root,
        "A Fairly Long Book Title (2019) (Some Author)",
        &["A Fairly Long Book Title (2019) (Some Author) - Part 01.mp3", "cover.jpg"],
    );
    make_dir(
        root,
        "Second Long Book Title (2020) (Other Writer) {ASIN.B0036S4B0U}",
        &["Second Long Book Title - Part 01.m4b"],
    );
    let a = format!("{} A.mp3", COLLIDING_STEM);
    let b = format!("{} B.mp3", COLLIDING_STEM);
    make_dir(root, "Book {ASIN.B0036S4B0U}", &[a.as_str(), b.as_str()]);

    for i in 4..=9 {
        make_dir(&root.join("shelf"), &format!("Book {:02}", i), &["01.mp3"]);
    }
    make_dir(root, "Short Book [MAM]", &["01.m4b"]);

    // Not candidates: no audio, hidden, NAS metadata
    make_dir(root, "Extras", &["notes.txt"]);
    make_dir(root, ".hidden", &["01.mp3"]);
    make_dir(root, "@eaDir", &["01.mp3"]);
}

fn config() -> ComplianceConfig {
    ComplianceConfig::default().with_max_full_path(MAX)
}

#[test]
fn test_batch_summary_counts() {
    let temp_dir = TempDir::new().unwrap();
    build_library(temp_dir.path());

    let report = BatchScanner::new(config(), BatchOptions::default())
        .scan(temp_dir.path())
        .unwrap();

    assert_eq!(report.summary.total_directories, 10);
    assert_eq!(report.summary.compliant_directories, 7);
    assert_eq!(report.summary.non_compliant_directories, 3);
    assert_eq!(report.summary.auto_fixable_directories, 2);
    assert_eq!(report.summary.unsafe_directories, 1);
    assert_eq!(report.summary.scan_errors, 0);

    let unsafe_dir = report
        .results
        .iter()
        .find(|r| !r.tracker.safe_for_target)
        .unwrap();
    assert!(unsafe_dir.compliant);
    assert_eq!(unsafe_dir.tracker.primary_intent.as_deref(), Some("mam"));

    let hopeless = report
        .results
        .iter()
        .find(|r| r.folder_name == "Book {ASIN.B0036S4B0U}")
        .unwrap();
    assert!(!hopeless.compliant);
    assert!(!hopeless.auto_fixable);
    assert!(hopeless.planning_error.as_ref().unwrap().contains("collide"));
}

#[test]
fn test_batch_filters_and_script() {
    let temp_dir = TempDir::new().unwrap();
    build_library(temp_dir.path());

    let options = BatchOptions {
        include: Vec::new(),
        exclude: vec!["/shelf/".to_string()],
        include_unsafe: false,
    };
    let report = BatchScanner::new(config(), options)
        .scan(temp_dir.path())
        .unwrap();
    assert_eq!(report.summary.total_directories, 4);

    let script = generate_fix_script(&report, &ScriptOptions::default());
    let fix_lines: Vec<&str> = script
        .lines()
        .filter(|line| !line.starts_with('#') && line.contains(" fix --apply"))
        .collect();
    assert_eq!(fix_lines.len(), 2);
    assert!(fix_lines.iter().all(|line| line.contains("--max-length 80")));
    assert!(script.contains("# NOT AUTO-FIXABLE"));
}

#[test]
fn test_batch_apply_fixes_and_rescans_clean() {
    let temp_dir = TempDir::new().unwrap();
    build_library(temp_dir.path());

    let batch = BatchScanner::new(config().confirmed(), BatchOptions::default());
    let mut report = batch.scan(temp_dir.path()).unwrap();
    batch.apply_all(&mut report).unwrap();

    assert_eq!(report.summary.applied_directories, 2);
    assert_eq!(report.summary.failed_directories, 0);
    assert!(report
        .results
        .iter()
        .filter(|r| r.apply_status.is_some())
        .all(|r| matches!(r.apply_status, Some(ApplyStatus::Applied { .. }))));

    let rescan = BatchScanner::new(config(), BatchOptions::default())
        .scan(temp_dir.path())
        .unwrap();
    assert_eq!(rescan.summary.total_directories, 10);
    assert_eq!(rescan.summary.non_compliant_directories, 1);
}

#[test]
fn test_batch_apply_plans_from_current_file_list() {
    let temp_dir = TempDir::new().unwrap();
    build_library(temp_dir.path());

    let batch = BatchScanner::new(config().confirmed(), BatchOptions::default());
    let mut report = batch.scan(temp_dir.path()).unwrap();

    // A file lands after the scan and before the apply
    let folder = "Second Long Book Title (2020) (Other Writer) {ASIN.B0036S4B0U}";
    let late = "Second Long Book Title (2020) (Other Writer) - Bonus Chapter Material.m4b";
    fs::write(temp_dir.path().join(folder).join(late), b"audio").unwrap();

    batch.apply_all(&mut report).unwrap();
    let result = report
        .results
        .iter()
        .find(|r| r.folder_name == folder)
        .unwrap();
    let final_path = match &result.apply_status {
        Some(ApplyStatus::Applied { final_path, .. }) => final_path.clone(),
        other => panic!("unexpected status: {:?}", other),
    };

    assert_eq!(list_files(&final_path).unwrap().len(), 2);
    let after = analyze_directory(&final_path, MAX).unwrap();
    assert!(after.compliant, "{:?}", after.violations);
}

#[test]
fn test_batch_respects_walk_depth() {
    let temp_dir = TempDir::new().unwrap();
    build_library(temp_dir.path());

    let report = BatchScanner::new(config(), BatchOptions::default())
        .with_directory_scanner(DirectoryScanner::new().max_depth(1))
        .scan(temp_dir.path())
        .unwrap();

    assert_eq!(report.summary.total_directories, 4);
    assert!(report
        .results
        .iter()
        .all(|r| !r.path.components().any(|c| c.as_os_str() == "shelf")));
}

#[test]
fn test_fix_then_undo_restores_names() {
    let temp_dir = TempDir::new().unwrap();
    let folder = "Second Long Book Title (2020) (Other Writer) {ASIN.B0036S4B0U}";
    let dir = make_dir(
        temp_dir.path(),
        folder,
        &["Second Long Book Title - Part 01.m4b", "cover.jpg"],
    );

    let files = list_files(&dir).unwrap();
    let plan = plan(folder, &files, &config());
    assert!(plan.succeeded);
    assert!(plan.new_folder.contains("{ASIN.B0036S4B0U}"));

    // Dry run first
    let dry = apply(&plan, temp_dir.path(), &config()).unwrap();
    assert!(!dry.applied);
    assert!(dir.exists());

    let export_path = temp_dir.path().join("plan.json");
    PlanExport::from_plan(&plan).write_json(&export_path).unwrap();

    let applied = apply(&plan, temp_dir.path(), &config().confirmed()).unwrap();
    assert!(applied.applied);
    assert!(!dir.exists());
    let after = analyze_directory(&applied.final_path, MAX).unwrap();
    assert!(after.compliant);

    let undo = PlanExport::from_json_file(&export_path).unwrap().inverse();
    let restored = FileManager::new(temp_dir.path())
        .revert(&undo, &config().confirmed())
        .unwrap();
    assert_eq!(restored.final_path, dir);
    assert_eq!(list_files(&dir).unwrap(), files);
}

#[cfg(unix)]
#[test]
fn test_hard_links_survive_rename() {
    use std::os::unix::fs::MetadataExt;

    let temp_dir = TempDir::new().unwrap();
    let seed = make_dir(temp_dir.path(), "seed", &[]);
    let long_name = "Linked Book Title (2019) (Some Author) - Chapter 01 Of The Long Audiobook.m4b";
    fs::write(seed.join(long_name), b"audio").unwrap();

    let dir = make_dir(temp_dir.path(), "Linked Book", &[]);
    fs::hard_link(seed.join(long_name), dir.join(long_name)).unwrap();
    let inode = fs::metadata(seed.join(long_name)).unwrap().ino();

    let analysis = analyze_directory(&dir, MAX).unwrap();
    assert!(!analysis.compliant);
    assert_eq!(analysis.hard_link_status, HardLinkStatus::Detected);
    assert_eq!(analysis.hard_linked_files, 1);
    assert!(analysis.hard_link_groups.contains_key(&inode));

    let files = list_files(&dir).unwrap();
    let plan = plan("Linked Book", &files, &config());
    assert!(plan.succeeded);
    assert_eq!(plan.file_renames().count(), 1);

    let report = apply(&plan, temp_dir.path(), &config().confirmed()).unwrap();
    let renamed = report.final_path.join(&plan.new_files[0]);
    assert_eq!(fs::metadata(&renamed).unwrap().ino(), inode);
    assert!(seed.join(long_name).exists());
}
