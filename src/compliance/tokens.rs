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


//! Identification token extraction
//!
//! Splits a folder name or filename stem into the fields that identify a
//! release across trackers:
//!
//! - `{ASIN.B0XXXXXXXX}` → ASIN
//! - trailing `[Name]` → Group/Uploader
//! - first `(YYYY)` → Year
//! - next `(Name)` after the year → Author
//! - `vol_01`, `Vol 1`, `Volume.3` → Volume
//! - any other bracketed group → Generic
//! - every free-text run left over → Title
//!
//! The leftmost Title is the lead title; later runs are usually subtitles or
//! part labels. Extraction never fails: a name with nothing recognizable becomes a single
//! Title token spanning the whole string.

use crate::compliance::models::{char_len, IdentificationToken, Span, TokenKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ASIN_RE: Regex = Regex::new(r"\{ASIN\.[A-Za-z0-9]{10}\}").unwrap();
    static ref GROUP_RE: Regex = Regex::new(r"(\[[^\[\]]+\])\s*$").unwrap();
    static ref YEAR_RE: Regex = Regex::new(r"\(\d{4}\)").unwrap();
    static ref PAREN_RE: Regex = Regex::new(r"\([^()]+\)").unwrap();
    static ref DELIMITED_RE: Regex = Regex::new(r"\[[^\[\]]*\]|\{[^{}]*\}|\([^()]*\)").unwrap();
    static ref VOLUME_RE: Regex =
        Regex::new(r"(?i)(?:^|[^a-z0-9])(vol(?:ume)?[ ._\-]?(\d{1,3}))(?:[^0-9]|$)").unwrap();
}

/// Characters that may be dropped alongside a removed token
const ADJOINING_SEPARATORS: &[char] = &[' ', '_', '-', '.'];

/// Characters trimmed from the edges of a Title
const TITLE_TRIM: &[char] = &[' ', '_', '-', '.', ',', ':', ';'];

/// Maximum extra characters a word-boundary cut may remove beyond the gap
const WORD_BOUNDARY_SLACK: usize = 12;

/// A name and the tokens found in it, ordered by position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedName {
    pub source: String,
    pub tokens: Vec<IdentificationToken>,
}

impl TokenizedName {
    /// Leftmost token of a kind
    pub fn first(&self, kind: TokenKind) -> Option<&IdentificationToken> {
        self.tokens.iter().find(|t| t.kind == kind)
    }

    /// Lead title
    pub fn title(&self) -> Option<&IdentificationToken> {
        self.first(TokenKind::Title)
    }

    /// Every Title run, left to right
    pub fn titles(&self) -> impl Iterator<Item = &IdentificationToken> {
        self.tokens.iter().filter(|t| t.kind == TokenKind::Title)
    }

    pub fn asins(&self) -> impl Iterator<Item = &IdentificationToken> {
        self.tokens.iter().filter(|t| t.kind == TokenKind::Asin)
    }

    pub fn has(&self, kind: TokenKind) -> bool {
        self.first(kind).is_some()
    }
}

/// Classifies names into identification tokens
pub struct TokenExtractor;

impl TokenExtractor {
    pub fn extract(name: &str) -> TokenizedName {
        let mut tokens: Vec<IdentificationToken> = Vec::new();

        for m in ASIN_RE.find_iter(name) {
            tokens.push(IdentificationToken::new(
                TokenKind::Asin,
                name,
                Span::new(m.start(), m.end()),
            ));
        }

        if let Some(group) = GROUP_RE.captures(name).and_then(|c| c.get(1)) {
            let span = Span::new(group.start(), group.end());
            if is_free(&tokens, &span) {
                tokens.push(IdentificationToken::new(TokenKind::Group, name, span));
            }
        }

        let year_span = YEAR_RE
            .find_iter(name)
            .map(|m| Span::new(m.start(), m.end()))
            .find(|span| is_free(&tokens, span));
        if let Some(span) = year_span {
            tokens.push(IdentificationToken::new(TokenKind::Year, name, span));
        }

        let author_span = PAREN_RE
            .find_iter(name)
            .map(|m| Span::new(m.start(), m.end()))
            .filter(|span| year_span.map_or(true, |year| span.start >= year.end))
            .find(|span| is_free(&tokens, span));
        if let Some(span) = author_span {
            tokens.push(IdentificationToken::new(TokenKind::Author, name, span));
        }

        for m in DELIMITED_RE.find_iter(name) {
            let span = Span::new(m.start(), m.end());
            if is_free(&tokens, &span) {
                tokens.push(IdentificationToken::new(TokenKind::Generic, name, span));
            }
        }

        let volume_span = VOLUME_RE
            .captures_iter(name)
            .filter_map(|c| c.get(1))
            .map(|m| Span::new(m.start(), m.end()))
            .find(|span| is_free(&tokens, span));
        if let Some(span) = volume_span {
            tokens.push(IdentificationToken::new(TokenKind::Volume, name, span));
        }

        for span in free_runs(name, &tokens) {
            tokens.push(IdentificationToken::new(TokenKind::Title, name, span));
        }

        if tokens.is_empty() {
            tokens.push(IdentificationToken::new(
                TokenKind::Title,
                name,
                Span::new(0, name.len()),
            ));
        }

        tokens.sort_by_key(|t| t.span.start);

        TokenizedName {
            source: name.to_string(),
            tokens,
        }
    }
}

fn is_free(tokens: &[IdentificationToken], span: &Span) -> bool {
    !tokens.iter().any(|t| t.span.overlaps(span))
}

/// Stretches of text outside every token, trimmed of separators
fn free_runs(name: &str, tokens: &[IdentificationToken]) -> Vec<Span> {
    let mut spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
    spans.sort_by_key(|s| s.start);

    let mut gaps = Vec::with_capacity(spans.len() + 1);
    let mut cursor = 0;
    for span in &spans {
        if span.start > cursor {
            gaps.push(Span::new(cursor, span.start));
        }
        cursor = cursor.max(span.end);
    }
    if cursor < name.len() {
        gaps.push(Span::new(cursor, name.len()));
    }

    gaps.into_iter()
        .filter_map(|gap| {
            let text = &name[gap.start..gap.end];
            let leading = text.len() - text.trim_start_matches(TITLE_TRIM).len();
            let trimmed = text.trim_matches(TITLE_TRIM);
            if trimmed.is_empty() {
                None
            } else {
                let start = gap.start + leading;
                Some(Span::new(start, start + trimmed.len()))
            }
        })
        .collect()
}

/// Split `name.ext` into stem and extension (including the dot)
///
/// Extensions are 1-5 ASCII alphanumerics after the last dot. A leading dot
/// does not start an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos)
            if pos > 0
                && (2..=6).contains(&(name.len() - pos))
                && name[pos + 1..].chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (&name[..pos], &name[pos..])
        }
        _ => (name, ""),
    }
}

/// Remove a token, its delimiters, and one adjoining separator
pub fn remove_token(source: &str, token: &IdentificationToken) -> String {
    let mut start = token.span.start;
    let mut end = token.span.end;

    if let Some(c) = source[..start]
        .chars()
        .next_back()
        .filter(|c| ADJOINING_SEPARATORS.contains(c))
    {
        start -= c.len_utf8();
    } else if let Some(c) = source[end..]
        .chars()
        .next()
        .filter(|c| ADJOINING_SEPARATORS.contains(c))
    {
        end += c.len_utf8();
    }

    let mut result = String::with_capacity(source.len());
    result.push_str(&source[..start]);
    result.push_str(&source[end..]);
    result.trim().to_string()
}

/// Replace the text covered by a span
pub fn replace_span(source: &str, span: Span, replacement: &str) -> String {
    let mut result = String::with_capacity(source.len());
    result.push_str(&source[..span.start]);
    result.push_str(replacement);
    result.push_str(&source[span.end..]);
    result
}

/// Canonical `vol_NN` form, only when it is shorter than the current text
pub fn normalize_volume(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    let number: u32 = digits.parse().ok()?;
    let normalized = format!("vol_{:02}", number);
    if char_len(&normalized) < char_len(text) {
        Some(normalized)
    } else {
        None
    }
}

/// Shorten a title by `gap` characters, never below `min_chars`
///
/// Prefers cutting at a word boundary when one lies within a few characters
/// of the exact cut. Returns `None` when the title cannot get any shorter.
pub fn truncate_title(title: &str, gap: usize, min_chars: usize) -> Option<String> {
    let len = char_len(title);
    let floor = min_chars.min(len);
    if gap == 0 || len <= floor {
        return None;
    }

    let target = len.saturating_sub(gap).max(floor);
    let cut = title
        .char_indices()
        .nth(target)
        .map(|(i, _)| i)
        .unwrap_or(title.len());
    let head = &title[..cut];

    let at_boundary = title[cut..].starts_with(char::is_whitespace);
    let candidate = if at_boundary {
        head
    } else {
        match head.rfind(char::is_whitespace) {
            Some(pos) => {
                let kept = char_len(&head[..pos]);
                if kept >= floor && target - kept <= WORD_BOUNDARY_SLACK {
                    &head[..pos]
                } else {
                    head
                }
            }
            None => head,
        }
    };

    let result = candidate.trim_end_matches(TITLE_TRIM);
    if result.is_empty() || char_len(result) >= len {
        None
    } else {
        Some(result.to_string())
    }
}
