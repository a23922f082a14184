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


//! Tracker intent heuristics
//!
//! Guesses which tracker a directory was prepared for from keywords in its
//! name. Purely advisory: the verdict feeds confirmation prompts, batch script
//! comment-out decisions, and the `--force` gate, never the planner itself.
//!
//! When a name matches several trackers, the first entry of
//! [`TRACKER_SIGNATURES`] wins as `primary_intent`. That order is a table
//! convention, not a statement about which tracker really owns the content.

use crate::compliance::models::TrackerIntent;

/// Keywords associated with one tracker
#[derive(Debug, Clone, Copy)]
pub struct TrackerSignature {
    pub tracker: &'static str,
    /// Bracketed keywords match as substrings; bare words need word boundaries
    pub keywords: &'static [&'static str],
}

pub const TRACKER_SIGNATURES: &[TrackerSignature] = &[
    TrackerSignature {
        tracker: "mam",
        keywords: &["myanonamouse", "[mam]", "(mam)", "{mam}"],
    },
    TrackerSignature {
        tracker: "bib",
        keywords: &["bibliotik", "[bib]", "(bib)", "{bib}"],
    },
    TrackerSignature {
        tracker: "abb",
        keywords: &["audiobookbay", "[abb]", "(abb)", "{abb}"],
    },
    TrackerSignature {
        tracker: "red",
        keywords: &["redacted", "[red]", "(red)", "{red}"],
    },
    TrackerSignature {
        tracker: "ops",
        keywords: &["orpheus", "[ops]", "(ops)", "{ops}"],
    },
    TrackerSignature {
        tracker: "tl",
        keywords: &["torrentleech", "[tl]", "(tl)", "{tl}"],
    },
];

/// Classify a directory name against the signature table
///
/// `target` is the tracker the operator is preparing content for. Without a
/// target, any detected tracker makes the directory unsafe.
pub fn classify_tracker_intent(name: &str, target: Option<&str>) -> TrackerIntent {
    let haystack = name.to_lowercase();

    let detected_trackers: Vec<String> = TRACKER_SIGNATURES
        .iter()
        .filter(|signature| {
            signature
                .keywords
                .iter()
                .any(|keyword| keyword_matches(&haystack, keyword))
        })
        .map(|signature| signature.tracker.to_string())
        .collect();

    let safe_for_target = match target {
        Some(target) => detected_trackers
            .iter()
            .all(|tracker| tracker.eq_ignore_ascii_case(target)),
        None => detected_trackers.is_empty(),
    };

    if !safe_for_target {
        tracing::warn!(
            directory = %name,
            detected = ?detected_trackers,
            target = ?target,
            "Directory appears to be prepared for another tracker"
        );
    }

    TrackerIntent {
        primary_intent: detected_trackers.first().cloned(),
        detected_trackers,
        safe_for_target,
    }
}

fn keyword_matches(haystack: &str, keyword: &str) -> bool {
    if keyword.starts_with(&['[', '(', '{'][..]) {
        return haystack.contains(keyword);
    }
    haystack.match_indices(keyword).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
