//! Compliance settings
//!
//! Planning reads `max_full_path` and `min_title_chars`; apply reads `dry_run`
//! and `apply`; the tracker gate reads `target_tracker`.
//!
//! `dry_run` and `apply` are never read from a settings file. Writes are only
//! enabled in code, through [`ComplianceConfig::confirmed`].

use crate::error::{ComplianceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Combined `folder + '/' + filename` limit used by the destination tracker
pub const DEFAULT_MAX_FULL_PATH: usize = 180;

/// Shortest length a Title token may be truncated to
pub const DEFAULT_MIN_TITLE_CHARS: usize = 10;

/// Settings for a single planning/apply run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Budget for `len(folder) + 1 + len(file)`, in characters
    pub max_full_path: usize,
    /// Report what would change without writing
    #[serde(skip, default = "default_dry_run")]
    pub dry_run: bool,
    /// Explicit confirmation required before any rename touches disk
    #[serde(skip)]
    pub apply: bool,
    /// Floor for Title truncation
    pub min_title_chars: usize,
    /// Tracker this content is being prepared for, if known
    pub target_tracker: Option<String>,
}

fn default_dry_run() -> bool {
    true
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            max_full_path: DEFAULT_MAX_FULL_PATH,
            dry_run: true,
            apply: false,
            min_title_chars: DEFAULT_MIN_TITLE_CHARS,
            target_tracker: None,
        }
    }
}

impl ComplianceConfig {
    /// Load settings from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ComplianceError::InvalidConfiguration(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: ComplianceConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_full_path == 0 {
            return Err(ComplianceError::InvalidConfiguration(
                "max_full_path must be greater than zero".to_string(),
            ));
        }
        if self.min_title_chars == 0 {
            return Err(ComplianceError::InvalidConfiguration(
                "min_title_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_full_path(mut self, max_full_path: usize) -> Self {
        self.max_full_path = max_full_path;
        self
    }

    pub fn with_target_tracker<S: Into<String>>(mut self, tracker: S) -> Self {
        self.target_tracker = Some(tracker.into());
        self
    }

    /// Turn off dry-run and confirm writes
    pub fn confirmed(mut self) -> Self {
        self.dry_run = false;
        self.apply = true;
        self
    }

    /// Whether apply may touch the filesystem
    pub fn writes_enabled(&self) -> bool {
        self.apply && !self.dry_run
    }
}

/// Directory filters and overrides for a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Substrings a directory path must contain (empty = everything)
    pub include: Vec<String>,
    /// Substrings that exclude a directory; wins over `include`
    pub exclude: Vec<String>,
    /// Act on directories flagged as prepared for another tracker
    pub include_unsafe: bool,
}

impl BatchOptions {
    /// Apply include/exclude filters to a directory path (case-insensitive)
    pub fn matches(&self, path: &str) -> bool {
        let haystack = path.to_lowercase();
        if self
            .exclude
            .iter()
            .any(|pattern| haystack.contains(&pattern.to_lowercase()))
        {
            return false;
        }
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| haystack.contains(&pattern.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_dry_run() {
        let config = ComplianceConfig::default();
        assert_eq!(config.max_full_path, 180);
        assert!(config.dry_run);
        assert!(!config.apply);
        assert!(!config.writes_enabled());
        assert!(config.confirmed().writes_enabled());
    }

    #[test]
    fn test_apply_without_clearing_dry_run_stays_read_only() {
        let config = ComplianceConfig {
            apply: true,
            ..ComplianceConfig::default()
        };
        assert!(!config.writes_enabled());
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_full_path": 150, "target_tracker": "mam"}}"#).unwrap();

        let config = ComplianceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_full_path, 150);
        assert_eq!(config.target_tracker.as_deref(), Some("mam"));
        assert_eq!(config.min_title_chars, DEFAULT_MIN_TITLE_CHARS);
        assert!(config.dry_run);
    }

    #[test]
    fn test_settings_file_cannot_enable_writes() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"dry_run": false, "apply": true, "max_full_path": 120}}"#).unwrap();

        let config = ComplianceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_full_path, 120);
        assert!(config.dry_run);
        assert!(!config.apply);
        assert!(!config.writes_enabled());
    }

    #[test]
    fn test_from_json_file_rejects_zero_budget() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_full_path": 0}}"#).unwrap();

        let err = ComplianceConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ComplianceError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_batch_filters_exclude_wins() {
        let options = BatchOptions {
            include: vec!["Sanderson".to_string()],
            exclude: vec!["incoming".to_string()],
            include_unsafe: false,
        };
        assert!(options.matches("/library/Sanderson/Mistborn"));
        assert!(!options.matches("/library/INCOMING/Sanderson/Mistborn"));
        assert!(!options.matches("/library/Pratchett/Mort"));
    }

    #[test]
    fn test_batch_filters_empty_include_matches_all() {
        let options = BatchOptions {
            exclude: vec!["skip".to_string()],
            ..BatchOptions::default()
        };
        assert!(options.matches("/library/anything"));
        assert!(!options.matches("/library/skip-me"));
    }
}
