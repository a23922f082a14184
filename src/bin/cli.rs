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


//! Command-line front end for the path compliance engine
//!
//! Everything defaults to a dry run; renames need `--apply`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use librisync_compliance::batch::{generate_fix_script, write_fix_script, ScriptOptions};
use librisync_compliance::compliance::analyzer::analyze_directory;
use librisync_compliance::file::scanner::{folder_name, list_files, DirectoryScanner};
use librisync_compliance::{
    apply, classify_tracker_intent, plan, BatchOptions, BatchScanner, ComplianceConfig,
    ComplianceError, FileManager, PlanExport,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "librisync-compliance")]
#[command(version, about = "Shorten audiobook torrent paths to fit tracker limits", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Maximum length of `folder/file`
    #[arg(long, global = true)]
    max_length: Option<usize>,

    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tracker the content is being prepared for
    #[arg(long, global = true)]
    target_tracker: Option<String>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Report path lengths and hard links for one directory
    Analyze {
        dir: PathBuf,
    },
    /// Show the rename plan for one directory without applying it
    Plan {
        dir: PathBuf,
        /// Write the plan export to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Plan and (with --apply) rename one directory
    Fix {
        dir: PathBuf,
        /// Actually rename files
        #[arg(long)]
        apply: bool,
        /// Proceed even if the directory looks prepared for another tracker
        #[arg(long)]
        force: bool,
        /// Write the plan export to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Scan every candidate directory under a root
    Batch {
        root: PathBuf,
        /// Only directories whose path contains this substring
        #[arg(long)]
        include: Vec<String>,
        /// Skip directories whose path contains this substring
        #[arg(long)]
        exclude: Vec<String>,
        /// Write a fix script for the ready directories
        #[arg(long, conflicts_with = "apply")]
        script: Option<PathBuf>,
        /// Fix every safe, auto-fixable directory now
        #[arg(long)]
        apply: bool,
        /// Include directories flagged for another tracker
        #[arg(long)]
        include_unsafe: bool,
        /// Follow symbolic links while walking
        #[arg(long)]
        follow_links: bool,
        /// Only descend this many levels below the root
        #[arg(long)]
        max_depth: Option<usize>,
        /// Write the batch report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Rename a directory back using a saved plan export
    Undo {
        export: PathBuf,
        /// Directory containing the renamed folder
        #[arg(long, default_value = ".")]
        parent: PathBuf,
        /// Actually rename files
        #[arg(long)]
        apply: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level);

    let config = load_config(&cli.global)?;

    match cli.command {
        Commands::Analyze { dir } => run_analyze(&dir, &config),
        Commands::Plan { dir, json } => run_plan(&dir, &config, json.as_deref()),
        Commands::Fix {
            dir,
            apply,
            force,
            json,
        } => run_fix(&dir, confirm(config, apply), force, json.as_deref()),
        Commands::Batch {
            root,
            include,
            exclude,
            script,
            apply,
            include_unsafe,
            follow_links,
            max_depth,
            json,
        } => {
            let options = BatchOptions {
                include,
                exclude,
                include_unsafe,
            };
            let mut walker = DirectoryScanner::new().follow_links(follow_links);
            if let Some(depth) = max_depth {
                walker = walker.max_depth(depth);
            }
            run_batch(
                &root,
                confirm(config, apply),
                options,
                walker,
                script.as_deref(),
                json.as_deref(),
            )
        }
        Commands::Undo {
            export,
            parent,
            apply,
        } => run_undo(&export, &parent, confirm(config, apply)),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Defaults, then the config file, then command-line flags
fn load_config(args: &GlobalArgs) -> Result<ComplianceConfig> {
    let mut config = match &args.config {
        Some(path) => ComplianceConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ComplianceConfig::default(),
    };
    if let Some(max) = args.max_length {
        config.max_full_path = max;
    }
    if let Some(tracker) = &args.target_tracker {
        config.target_tracker = Some(tracker.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Writes follow `--apply` and nothing else
fn confirm(config: ComplianceConfig, apply: bool) -> ComplianceConfig {
    if apply {
        config.confirmed()
    } else {
        ComplianceConfig {
            dry_run: true,
            apply: false,
            ..config
        }
    }
}

fn run_analyze(dir: &Path, config: &ComplianceConfig) -> Result<()> {
    let dir = &resolve(dir)?;
    let analysis = analyze_directory(dir, config.max_full_path)
        .with_context(|| format!("analyzing {}", dir.display()))?;
    let tracker = classify_tracker_intent(&analysis.folder_name, config.target_tracker.as_deref());

    println!("Directory: {}", dir.display());
    println!("Files: {}", analysis.file_count);
    println!("Max length: {}", analysis.max_length);
    if analysis.compliant {
        println!("✅ Compliant");
    } else {
        println!(
            "❌ {} path(s) over budget (max overage {}, total {})",
            analysis.violations.len(),
            analysis.max_overage,
            analysis.total_overage
        );
        for violation in &analysis.violations {
            println!("   {} chars (+{}): {}", violation.length, violation.overage, violation.filename);
        }
    }

    println!("Hard links: {:?} ({} file(s))", analysis.hard_link_status, analysis.hard_linked_files);
    for (inode, paths) in &analysis.hard_link_groups {
        println!("   inode {}: {}", inode, paths.join(", "));
    }
    print_tracker(&tracker.detected_trackers, tracker.safe_for_target);
    Ok(())
}

fn run_plan(dir: &Path, config: &ComplianceConfig, json: Option<&Path>) -> Result<()> {
    let dir = &resolve(dir)?;
    let folder = folder_name(dir)?;
    let files = list_files(dir).with_context(|| format!("listing {}", dir.display()))?;
    let plan = plan(&folder, &files, config);

    print!("{}", plan.log.preview());
    if plan.succeeded {
        println!("Plan reaches compliance (longest path {} / {})", plan.longest_new_path(), plan.max_length);
    } else {
        println!(
            "⚠️  No compliant plan: {}",
            plan.failure_reason.as_deref().unwrap_or("unknown reason")
        );
    }

    if let Some(path) = json {
        PlanExport::from_plan(&plan).write_json(path)?;
        println!("Plan written to {}", path.display());
    }
    Ok(())
}

fn run_fix(dir: &Path, config: ComplianceConfig, force: bool, json: Option<&Path>) -> Result<()> {
    let dir = &resolve(dir)?;
    let folder = folder_name(dir)?;
    let tracker = classify_tracker_intent(&folder, config.target_tracker.as_deref());
    if !tracker.safe_for_target && !force {
        let err = ComplianceError::UnsafeTarget {
            tracker: tracker.primary_intent.unwrap_or_else(|| "unknown".to_string()),
        };
        bail!(err.user_message());
    }

    let files = list_files(dir).with_context(|| format!("listing {}", dir.display()))?;
    let plan = plan(&folder, &files, &config);
    print!("{}", plan.log.preview());

    if let Some(path) = json {
        PlanExport::from_plan(&plan).write_json(path)?;
        println!("Plan written to {}", path.display());
    }

    if !plan.succeeded {
        let err = ComplianceError::planning(
            folder,
            plan.failure_reason.unwrap_or_else(|| "unknown reason".to_string()),
        );
        bail!(err.user_message());
    }
    if !plan.has_changes() {
        println!("✅ Already compliant");
        return Ok(());
    }

    let parent = dir
        .parent()
        .with_context(|| format!("{} has no parent directory", dir.display()))?;
    let report = apply(&plan, parent, &config).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if report.applied {
        println!(
            "✅ Renamed {} file(s){}; now at {}",
            report.files_renamed,
            if report.folder_renamed { " and the folder" } else { "" },
            report.final_path.display()
        );
    } else {
        println!("Dry run: pass --apply to rename.");
    }
    Ok(())
}

fn run_batch(
    root: &Path,
    config: ComplianceConfig,
    options: BatchOptions,
    walker: DirectoryScanner,
    script: Option<&Path>,
    json: Option<&Path>,
) -> Result<()> {
    let script_options = ScriptOptions {
        include_unsafe: options.include_unsafe,
        target_tracker: config.target_tracker.clone(),
        ..ScriptOptions::default()
    };
    let writes = config.writes_enabled();
    let scanner = BatchScanner::new(config, options).with_directory_scanner(walker);
    let mut report = scanner
        .scan(root)
        .with_context(|| format!("scanning {}", root.display()))?;

    if writes {
        scanner.apply_all(&mut report)?;
    }

    let summary = &report.summary;
    println!("Scanned: {}", report.scan_path.display());
    println!("Directories: {}", summary.total_directories);
    println!("  compliant:     {}", summary.compliant_directories);
    println!("  non-compliant: {}", summary.non_compliant_directories);
    println!("  auto-fixable:  {}", summary.auto_fixable_directories);
    println!("  unsafe:        {}", summary.unsafe_directories);
    if summary.scan_errors > 0 {
        println!("  scan errors:   {}", summary.scan_errors);
    }
    if writes {
        println!("  applied:       {}", summary.applied_directories);
        println!("  failed:        {}", summary.failed_directories);
    }

    for result in report.non_compliant() {
        let marker = if result.ready_to_fix() {
            "fix"
        } else if result.auto_fixable {
            "unsafe"
        } else {
            "manual"
        };
        println!("  [{}] +{} {}", marker, result.max_overage, result.path.display());
    }

    if let Some(path) = script {
        write_fix_script(path, &generate_fix_script(&report, &script_options))?;
        println!("Fix script written to {}", path.display());
    }
    if let Some(path) = json {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn run_undo(export_path: &Path, parent: &Path, config: ComplianceConfig) -> Result<()> {
    let export = PlanExport::from_json_file(export_path)
        .with_context(|| format!("reading {}", export_path.display()))?;
    let undo = export.inverse();

    println!("Folder: {} -> {}", undo.original_folder, undo.new_folder);
    for (old, new) in undo.original_files.iter().zip(&undo.new_files) {
        if old != new {
            println!("  {} -> {}", old, new);
        }
    }

    let report = FileManager::new(parent)
        .revert(&undo, &config)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    if report.applied {
        println!("✅ Restored {}", report.final_path.display());
    } else {
        println!("Dry run: pass --apply to restore.");
    }
    Ok(())
}

/// Absolute path, so `.` and trailing slashes still have a folder name
fn resolve(dir: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(dir).with_context(|| format!("resolving {}", dir.display()))
}

fn print_tracker(detected: &[String], safe: bool) {
    if detected.is_empty() {
        println!("Tracker: none detected");
    } else if safe {
        println!("Tracker: {} (matches target)", detected.join(", "));
    } else {
        println!("⚠️  Tracker: {} (not the target; --force required to fix)", detected.join(", "));
    }
}
