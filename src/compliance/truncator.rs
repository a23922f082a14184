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


//! Priority-ordered path shortening
//!
//! Given a folder name and the files inside it, produce a [`RenamePlan`] in
//! which every `folder/file` fits `max_full_path`, giving up tokens from the
//! least preserved upward:
//!
//! Generic → Year → Author → Group → Volume (normalize, then remove) → Title
//!
//! The ASIN token is never touched. Planning is a small state machine:
//!
//! ```text
//! Parsing ─► Reducing(FolderTokens) ─► Reducing(FolderTitle) ─► Reducing(FileTokens)
//!        ─► Reducing(FolderTitleFallback) ─► Reducing(FileTitles) ─► Verified | Failed
//! ```
//!
//! Each transition is a pure function over the working names; any state
//! jumps straight to verification once nothing is over budget. No I/O.

use crate::compliance::audit::AuditLog;
use crate::compliance::models::{
    char_len, overage, ComplianceLogEntry, RenamePlan, Scope, TokenKind,
};
use crate::compliance::tokens::{
    normalize_volume, remove_token, replace_span, split_extension, truncate_title, TokenExtractor,
};
use crate::compliance::verifier::verify_names;
use crate::config::ComplianceConfig;
use crate::error::{ComplianceError, Result};

/// Token removals tried before any Title truncation, least preserved first
const TOKEN_REDUCTIONS: [Reduction; 6] = [
    Reduction::Remove(TokenKind::Generic),
    Reduction::Remove(TokenKind::Year),
    Reduction::Remove(TokenKind::Author),
    Reduction::Remove(TokenKind::Group),
    Reduction::NormalizeVolume,
    Reduction::Remove(TokenKind::Volume),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduction {
    Remove(TokenKind),
    NormalizeVolume,
}

/// Reduction stage inside the `Reducing` state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Drop non-title tokens from the folder name
    FolderTokens,
    /// Truncate the folder Title, only if that alone closes the largest gap
    FolderTitle,
    /// Drop non-title tokens from each file still over budget
    FileTokens,
    /// Truncate the folder Title as far as the floor allows
    FolderTitleFallback,
    /// Truncate the Title of each file still over budget
    FileTitles,
}

/// Planning state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanState {
    Parsing,
    Reducing(Stage),
    Verified,
    Failed(String),
}

/// One applied shortening
struct Shortened {
    text: String,
    kind: TokenKind,
    step: String,
}

/// Builds rename plans under a path-length budget
pub struct PriorityTruncator<'a> {
    config: &'a ComplianceConfig,
}

impl<'a> PriorityTruncator<'a> {
    pub fn new(config: &'a ComplianceConfig) -> Self {
        Self { config }
    }

    /// Plan renames for `folder` and its `files`
    ///
    /// Always returns a plan; check `succeeded`. A failed plan proposes no
    /// renames but keeps its step log for diagnosis.
    pub fn plan(&self, folder: &str, files: &[String]) -> RenamePlan {
        let mut work = Workspace::new(folder, files, self.config);
        let mut state = PlanState::Parsing;

        loop {
            state = match state {
                PlanState::Parsing => work.parse(),
                PlanState::Reducing(stage) => work.reduce(stage),
                PlanState::Verified | PlanState::Failed(_) => break,
            };
        }

        work.finish(state)
    }

    /// Like [`plan`](Self::plan) but a failed plan becomes `PlanningFailure`
    pub fn plan_checked(&self, folder: &str, files: &[String]) -> Result<RenamePlan> {
        let plan = self.plan(folder, files);
        if plan.succeeded {
            Ok(plan)
        } else {
            Err(ComplianceError::planning(
                folder,
                plan.failure_reason
                    .unwrap_or_else(|| "no compliant rename exists".to_string()),
            ))
        }
    }
}

/// Mutable names being shortened
struct Workspace<'a> {
    config: &'a ComplianceConfig,
    original_folder: String,
    original_files: Vec<String>,
    folder: String,
    files: Vec<String>,
    log: AuditLog,
}

impl<'a> Workspace<'a> {
    fn new(folder: &str, files: &[String], config: &'a ComplianceConfig) -> Self {
        Self {
            config,
            original_folder: folder.to_string(),
            original_files: files.to_vec(),
            folder: folder.to_string(),
            files: files.to_vec(),
            log: AuditLog::new(),
        }
    }

    fn file_overage(&self, index: usize) -> usize {
        overage(&self.folder, &self.files[index], self.config.max_full_path)
    }

    fn max_overage(&self) -> usize {
        (0..self.files.len())
            .map(|i| self.file_overage(i))
            .max()
            .unwrap_or(0)
    }

    fn any_over(&self) -> bool {
        self.max_overage() > 0
    }

    /// Move to `stage`, or straight to verification once everything fits
    fn advance(&self, stage: Stage) -> PlanState {
        if self.any_over() {
            PlanState::Reducing(stage)
        } else {
            self.verify()
        }
    }

    fn parse(&self) -> PlanState {
        if !self.any_over() {
            return PlanState::Verified;
        }
        tracing::debug!(
            folder = %self.folder,
            files = self.files.len(),
            max_overage = self.max_overage(),
            "Planning path shortening"
        );
        PlanState::Reducing(Stage::FolderTokens)
    }

    fn reduce(&mut self, stage: Stage) -> PlanState {
        match stage {
            Stage::FolderTokens => {
                while self.any_over() {
                    match shorten_tokens(&self.folder) {
                        Some(shortened) => self.record_folder(shortened),
                        None => break,
                    }
                }
                self.advance(Stage::FolderTitle)
            }
            Stage::FolderTitle => {
                let gap = self.max_overage();
                if title_can_absorb(&self.folder, gap, self.config.min_title_chars) {
                    if let Some(shortened) =
                        shorten_title(&self.folder, gap, self.config.min_title_chars)
                    {
                        self.record_folder(shortened);
                    }
                }
                self.advance(Stage::FileTokens)
            }
            Stage::FileTokens => {
                for index in 0..self.files.len() {
                    while self.file_overage(index) > 0 {
                        let (stem, ext) = split_extension(&self.files[index]);
                        let ext = ext.to_string();
                        match shorten_tokens(stem) {
                            Some(shortened) => self.record_file(index, shortened, ext),
                            None => break,
                        }
                    }
                }
                self.advance(Stage::FolderTitleFallback)
            }
            Stage::FolderTitleFallback => {
                while self.any_over() {
                    let gap = self.max_overage();
                    match shorten_title(&self.folder, gap, self.config.min_title_chars) {
                        Some(shortened) => self.record_folder(shortened),
                        None => break,
                    }
                }
                self.advance(Stage::FileTitles)
            }
            Stage::FileTitles => {
                for index in 0..self.files.len() {
                    while self.file_overage(index) > 0 {
                        let gap = self.file_overage(index);
                        let (stem, ext) = split_extension(&self.files[index]);
                        let ext = ext.to_string();
                        match shorten_title(stem, gap, self.config.min_title_chars) {
                            Some(shortened) => self.record_file(index, shortened, ext),
                            None => break,
                        }
                    }
                }
                self.verify()
            }
        }
    }

    fn verify(&self) -> PlanState {
        let report = verify_names(
            &self.original_folder,
            &self.original_files,
            &self.folder,
            &self.files,
            self.config.max_full_path,
            true,
        );
        match report.failure_reason() {
            None if report.passes() => PlanState::Verified,
            reason => PlanState::Failed(
                reason.unwrap_or_else(|| "verification failed".to_string()),
            ),
        }
    }

    fn record_folder(&mut self, shortened: Shortened) {
        let before = std::mem::replace(&mut self.folder, shortened.text);
        let after = self.folder.clone();
        let compliant = !self.any_over();
        let target = self.original_folder.clone();
        self.push_entry(Scope::Folder, target, shortened.kind, shortened.step, before, after, compliant);
    }

    fn record_file(&mut self, index: usize, shortened: Shortened, ext: String) {
        let after = format!("{}{}", shortened.text, ext);
        let before = std::mem::replace(&mut self.files[index], after.clone());
        let compliant = self.file_overage(index) == 0;
        let target = self.original_files[index].clone();
        self.push_entry(Scope::File, target, shortened.kind, shortened.step, before, after, compliant);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_entry(
        &mut self,
        scope: Scope,
        target: String,
        kind: TokenKind,
        step: String,
        before_text: String,
        after_text: String,
        compliant: bool,
    ) {
        let before_len = char_len(&before_text);
        let after_len = char_len(&after_text);
        tracing::debug!(
            scope = ?scope,
            target = %target,
            token = kind.label(),
            saved = before_len - after_len,
            compliant,
            "{}",
            step
        );
        self.log.record(ComplianceLogEntry {
            scope,
            target,
            priority: kind.priority(),
            step,
            before_len,
            after_len,
            saved_chars: before_len - after_len,
            compliant,
            before_text,
            after_text,
        });
    }

    fn finish(self, state: PlanState) -> RenamePlan {
        match state {
            PlanState::Failed(reason) => {
                tracing::info!(folder = %self.original_folder, %reason, "No compliant rename found");
                RenamePlan {
                    new_folder: self.original_folder.clone(),
                    new_files: self.original_files.clone(),
                    original_folder: self.original_folder,
                    original_files: self.original_files,
                    max_length: self.config.max_full_path,
                    log: self.log,
                    succeeded: false,
                    failure_reason: Some(reason),
                }
            }
            _ => {
                if !self.log.is_empty() {
                    tracing::info!(
                        folder = %self.original_folder,
                        new_folder = %self.folder,
                        steps = self.log.len(),
                        saved = self.log.total_saved(),
                        "Planned compliant rename"
                    );
                }
                RenamePlan {
                    original_folder: self.original_folder,
                    new_folder: self.folder,
                    original_files: self.original_files,
                    new_files: self.files,
                    max_length: self.config.max_full_path,
                    log: self.log,
                    succeeded: true,
                    failure_reason: None,
                }
            }
        }
    }
}

/// First non-title reduction that applies to `name` and leaves it non-empty
fn shorten_tokens(name: &str) -> Option<Shortened> {
    let parsed = TokenExtractor::extract(name);

    TOKEN_REDUCTIONS.iter().find_map(|reduction| {
        let shortened = match *reduction {
            Reduction::Remove(kind) => {
                let token = parsed.first(kind)?;
                Shortened {
                    text: remove_token(name, token),
                    kind,
                    step: format!("removed {} token '{}'", kind.label(), token.text),
                }
            }
            Reduction::NormalizeVolume => {
                let token = parsed.first(TokenKind::Volume)?;
                let normalized = normalize_volume(&token.text)?;
                Shortened {
                    text: replace_span(name, token.span, &normalized),
                    kind: TokenKind::Volume,
                    step: format!("normalized volume '{}' to '{}'", token.text, normalized),
                }
            }
        };
        let usable = !shortened.text.trim().is_empty() && char_len(&shortened.text) < char_len(name);
        usable.then_some(shortened)
    })
}

/// Truncate one Title run of `name` by up to `gap` characters
///
/// The lead title goes first when it can close the gap on its own. Otherwise
/// trailing runs are cut rightmost first and the lead is the last resort.
fn shorten_title(name: &str, gap: usize, min_chars: usize) -> Option<Shortened> {
    let parsed = TokenExtractor::extract(name);
    let mut titles: Vec<_> = parsed.titles().collect();
    let lead = titles.first().copied()?;
    titles.remove(0);
    titles.reverse();
    if absorbs(&lead.text, gap, min_chars) {
        titles.insert(0, lead);
    } else {
        titles.push(lead);
    }

    titles.into_iter().find_map(|title| {
        let truncated = truncate_title(&title.text, gap, min_chars)?;
        let removed = char_len(&title.text) - char_len(&truncated);
        Some(Shortened {
            text: replace_span(name, title.span, &truncated),
            kind: TokenKind::Title,
            step: format!("truncated title by {} chars to '{}'", removed, truncated),
        })
    })
}

fn absorbs(title: &str, gap: usize, min_chars: usize) -> bool {
    let len = char_len(title);
    gap > 0 && len >= gap + min_chars.min(len)
}

/// Whether truncating the Title alone can close `gap` without going under
/// the floor
fn title_can_absorb(name: &str, gap: usize, min_chars: usize) -> bool {
    TokenExtractor::extract(name)
        .title()
        .map_or(false, |title| absorbs(&title.text, gap, min_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::models::full_path_len;
    use crate::compliance::verifier::verify_plan;

    const ASIN: &str = "{ASIN.B00TESTXYZ}";

    fn config(max: usize) -> ComplianceConfig {
        ComplianceConfig::default().with_max_full_path(max)
    }

    fn pad_title(base: &str, target_len: usize) -> String {
        let mut title = base.to_string();
        let mut word = 0;
        while char_len(&title) < target_len {
            title.push_str(&format!(" Word{}", word % 10));
            word += 1;
        }
        let mut title: String = title.chars().take(target_len).collect();
        if title.ends_with(' ') {
            title.pop();
            title.push('x');
        }
        title
    }

    fn assert_invariants(plan: &RenamePlan, max: usize) {
        assert_eq!(plan.new_files.len(), plan.original_files.len());
        for entry in plan.log.entries() {
            assert!(entry.after_len <= entry.before_len, "{:?}", entry);
        }
        if plan.succeeded {
            for file in &plan.new_files {
                assert!(full_path_len(&plan.new_folder, file) <= max);
            }
        } else {
            assert_eq!(plan.new_folder, plan.original_folder);
            assert_eq!(plan.new_files, plan.original_files);
        }
        assert!(verify_plan(plan).consistent);
    }

    #[test]
    fn test_compliant_folder_is_noop() {
        let files = vec!["01 - Chapter One.m4b".to_string(), "cover.jpg".to_string()];
        let folder = format!("Mort (1987) (Terry Pratchett) {} [Pack]", ASIN);
        let cfg = config(180);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded);
        assert!(plan.log.is_empty());
        assert_eq!(plan.new_folder, folder);
        assert_eq!(plan.new_files, files);
    }

    #[test]
    fn test_removes_year_then_author() {
        // Scenario: 250-char folder, one 30-char file, budget 180
        let tail = format!(" (2015) (Some Author Name) {} [Group]", ASIN);
        let title = pad_title("The Very Long Title", 250 - char_len(&tail));
        let folder = format!("{}{}", title, tail);
        assert_eq!(char_len(&folder), 250);
        let files = vec![format!("{}.m4b", "x".repeat(26))];
        assert_eq!(char_len(&files[0]), 30);

        let cfg = config(180);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded, "{:?}", plan.failure_reason);
        assert_invariants(&plan, 180);
        let folder_steps: Vec<_> = plan.log.folder_entries().collect();
        assert!(folder_steps.len() >= 2);
        assert_eq!(folder_steps[0].priority, TokenKind::Year.priority());
        assert_eq!(folder_steps[1].priority, TokenKind::Author.priority());
        assert!(plan.new_folder.contains(ASIN));
        assert!(!plan.new_folder.contains("(2015)"));
    }

    #[test]
    fn test_stops_as_soon_as_compliant() {
        let folder = format!("Short Title (2015) (Author) {} [Group]", ASIN);
        let files = vec!["track.mp3".to_string()];
        // Removing the year (7 chars) is enough
        let max = full_path_len(&folder, &files[0]) - 5;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded);
        assert_eq!(plan.log.len(), 1);
        assert_eq!(plan.new_folder, format!("Short Title (Author) {} [Group]", ASIN));
        assert!(plan.log.entries()[0].compliant);
    }

    #[test]
    fn test_group_removed_before_volume() {
        let folder = format!("Series Volume 2 {} [Uploader]", ASIN);
        let files = vec!["a.mp3".to_string()];
        let max = full_path_len(&folder, &files[0]) - 3;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded);
        assert_eq!(plan.log.entries()[0].priority, TokenKind::Group.priority());
        assert!(plan.new_folder.contains("Volume 2"));
    }

    #[test]
    fn test_volume_normalized_before_removed() {
        let folder = format!("Series Volume 2 {}", ASIN);
        let files = vec!["a.mp3".to_string()];
        let max = full_path_len(&folder, &files[0]) - 2;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded);
        assert_eq!(plan.log.len(), 1);
        assert_eq!(plan.new_folder, format!("Series vol_02 {}", ASIN));
    }

    #[test]
    fn test_generic_tokens_go_first_left_to_right() {
        let folder = format!("Book (2001) (Author) (Unabridged) (Retail) {}", ASIN);
        let files = vec!["a.mp3".to_string()];
        let max = full_path_len(&folder, &files[0]) - 1;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded);
        assert_eq!(plan.log.len(), 1);
        assert!(plan.log.entries()[0].step.contains("(Unabridged)"));
    }

    #[test]
    fn test_title_truncated_without_ellipsis() {
        let title = pad_title("An Extraordinarily Long Title", 150);
        let folder = format!("{} {}", title, ASIN);
        let files = vec!["01.mp3".to_string()];
        let cfg = config(120);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded);
        assert_invariants(&plan, 120);
        assert!(plan.new_folder.ends_with(ASIN));
        assert!(!plan.new_folder.contains("..."));
        assert!(!plan.new_folder.contains('…'));
        let step = plan.log.entries().last().unwrap();
        assert_eq!(step.priority, TokenKind::Title.priority());
    }

    #[test]
    fn test_long_file_gets_file_scope_entries() {
        let folder = format!("Compact Title {}", ASIN);
        let long_stem = format!("{} (2019) (Narrator Name) [Rip]", pad_title("Chapter", 60));
        let files = vec![format!("{}.m4b", long_stem), "cover.jpg".to_string()];
        let max = char_len(&folder) + 1 + 70;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded, "{:?}", plan.failure_reason);
        assert_invariants(&plan, max);
        assert_eq!(plan.new_folder, folder);
        assert!(plan.log.file_entries().count() >= 1);
        assert!(plan
            .log
            .file_entries()
            .all(|e| e.target == files[0]));
        assert_eq!(plan.new_files[1], "cover.jpg");
        assert!(plan.new_files[0].ends_with(".m4b"));
    }

    #[test]
    fn test_fails_when_asin_alone_exceeds_budget() {
        let folder = format!("Title Here (2020) {}", ASIN);
        let files = vec!["01.mp3".to_string()];
        let cfg = config(10);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(!plan.succeeded);
        assert_invariants(&plan, 10);
        assert!(plan.failure_reason.as_ref().unwrap().contains("over budget"));

        let err = PriorityTruncator::new(&cfg).plan_checked(&folder, &files).unwrap_err();
        assert!(err.is_planning_error());
    }

    #[test]
    fn test_colliding_file_titles_fail() {
        let folder = format!("Book {}", ASIN);
        let stem = pad_title("Identical Prefix For Both Files", 80);
        let files = vec![format!("{} A.mp3", stem), format!("{} B.mp3", stem)];
        let max = char_len(&folder) + 1 + 40;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(!plan.succeeded);
        assert!(plan.failure_reason.unwrap().contains("collide"));
        assert_eq!(plan.new_files, files);
    }

    #[test]
    fn test_asin_never_altered_across_budgets() {
        let folder = format!(
            "A Reasonably Long Audiobook Title vol_03 (2011) (Author Person) {} [Group]",
            ASIN
        );
        let files = vec![
            "01 - Opening Chapter (2011).m4b".to_string(),
            "02 - Second Chapter.m4b".to_string(),
        ];
        for max in (20..=140).step_by(5) {
            let cfg = config(max);
            let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);
            assert_invariants(&plan, max);
            if plan.succeeded {
                assert!(plan.new_folder.contains(ASIN), "max {}", max);
            }
        }
    }

    #[test]
    fn test_trailing_unclassified_text_is_shortened() {
        let folder = "Short {ASIN.B0036S4B0U} a long unclassified subtitle that keeps going";
        let files = vec!["01.mp3".to_string()];
        let cfg = config(60);
        let plan = PriorityTruncator::new(&cfg).plan(folder, &files);

        assert!(plan.succeeded, "{:?}", plan.failure_reason);
        assert_invariants(&plan, 60);
        assert!(plan.new_folder.starts_with("Short {ASIN.B0036S4B0U} a long"));
        assert_eq!(plan.new_files, files);
        assert!(plan
            .log
            .folder_entries()
            .all(|e| e.priority == TokenKind::Title.priority()));
    }

    #[test]
    fn test_lead_title_preferred_when_it_can_absorb() {
        let lead = pad_title("A Lead Title Long Enough To Give Up Plenty", 60);
        let folder = format!("{} {} - Part One", lead, ASIN);
        let files = vec!["01.mp3".to_string()];
        let max = full_path_len(&folder, &files[0]) - 15;
        let cfg = config(max);
        let plan = PriorityTruncator::new(&cfg).plan(&folder, &files);

        assert!(plan.succeeded, "{:?}", plan.failure_reason);
        assert_invariants(&plan, max);
        assert!(plan.new_folder.ends_with(&format!("{} - Part One", ASIN)));
    }

    #[test]
    fn test_replanning_a_compliant_result_changes_nothing() {
        let tail = format!(" (2015) (Some Author Name) {} [Group]", ASIN);
        let long_folder = format!("{}{}", pad_title("The Very Long Title", 200), tail);
        let cases = vec![
            (long_folder, vec!["x".repeat(26) + ".m4b"], 180),
            (
                "Short {ASIN.B0036S4B0U} a long unclassified subtitle that keeps going".to_string(),
                vec!["01.mp3".to_string()],
                60,
            ),
            (
                format!("Compact Title {}", ASIN),
                vec![
                    format!("{} (2019) (Narrator Name) [Rip].m4b", pad_title("Chapter", 60)),
                    "cover.jpg".to_string(),
                ],
                char_len(&format!("Compact Title {}", ASIN)) + 1 + 70,
            ),
        ];

        for (folder, files, max) in cases {
            let cfg = config(max);
            let first = PriorityTruncator::new(&cfg).plan(&folder, &files);
            assert!(first.succeeded, "{}: {:?}", folder, first.failure_reason);
            assert!(first.has_changes());

            let second = PriorityTruncator::new(&cfg).plan(&first.new_folder, &first.new_files);
            assert!(second.succeeded);
            assert!(second.log.is_empty(), "{}", folder);
            assert!(!second.has_changes());
            assert_eq!(second.new_folder, first.new_folder);
            assert_eq!(second.new_files, first.new_files);
        }
    }

    #[test]
    fn test_empty_file_list_is_noop() {
        let cfg = config(180);
        let plan = PriorityTruncator::new(&cfg).plan("Empty", &[]);
        assert!(plan.succeeded);
        assert!(plan.log.is_empty());
    }
}
