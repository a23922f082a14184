//! Error types for the path compliance engine
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by the phase that raises them so batch callers can decide
//! whether to skip a directory or abort the run.
//!
//! ## Error Phases
//!
//! - **Planning**: no compliant rename exists for the tokens and budget. Always
//!   raised before any filesystem access.
//! - **Apply**: an OS-level rename failed. Aborts that one directory only.
//! - **Scan**: a directory could not be read during batch discovery. The
//!   directory is skipped with a warning.

use thiserror::Error;

/// Result type alias using our ComplianceError type
pub type Result<T> = std::result::Result<T, ComplianceError>;

/// Main error type for the compliance engine
#[derive(Error, Debug)]
pub enum ComplianceError {
    // ===== Planning Errors =====

    /// No rename plan can bring the folder and its files under budget
    #[error("Planning failed for '{folder}': {reason}")]
    PlanningFailure {
        folder: String,
        reason: String,
    },

    /// Plan failed verification before apply
    #[error("Plan verification failed for '{folder}': {reason}")]
    VerificationFailed {
        folder: String,
        reason: String,
    },

    // ===== Apply Errors =====

    /// A rename failed partway through a directory
    #[error("Apply failed in {directory} after {renamed} rename(s): {message}")]
    ApplyFailure {
        directory: String,
        /// Number of entries renamed before the failure
        renamed: usize,
        message: String,
    },

    /// Apply was requested without the explicit confirmation flag
    #[error("Refusing to write: {0}")]
    NotConfirmed(String),

    /// Directory looks prepared for a different tracker
    #[error("Directory appears to target tracker '{tracker}'; use the force override to proceed")]
    UnsafeTarget {
        tracker: String,
    },

    // ===== Scan Errors =====

    /// Directory could not be read during discovery or analysis
    #[error("Scan failed for {path}: {message}")]
    ScanFailure {
        path: String,
        message: String,
    },

    // ===== File Errors =====

    /// File or directory not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Rename target already exists
    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    /// Invalid file path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // ===== Configuration Errors =====

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ===== External Library Errors =====

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl ComplianceError {
    /// Create a PlanningFailure error
    pub fn planning<F: Into<String>, R: Into<String>>(folder: F, reason: R) -> Self {
        ComplianceError::PlanningFailure {
            folder: folder.into(),
            reason: reason.into(),
        }
    }

    /// Create an ApplyFailure error
    pub fn apply_failed<D: Into<String>, M: Into<String>>(
        directory: D,
        renamed: usize,
        message: M,
    ) -> Self {
        ComplianceError::ApplyFailure {
            directory: directory.into(),
            renamed,
            message: message.into(),
        }
    }

    /// Create a ScanFailure error
    pub fn scan_failed<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        ComplianceError::ScanFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if error was raised while planning (nothing was touched)
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            ComplianceError::PlanningFailure { .. } | ComplianceError::VerificationFailed { .. }
        )
    }

    /// Check if error is related to file/disk operations
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            ComplianceError::FileNotFound(_)
                | ComplianceError::FileAlreadyExists(_)
                | ComplianceError::InvalidPath(_)
                | ComplianceError::IoError(_)
                | ComplianceError::ApplyFailure { .. }
        )
    }

    /// Check if a batch run may continue past this error
    ///
    /// Returns `true` for errors scoped to a single directory: apply failures,
    /// scan failures, planning failures, and per-directory file problems.
    pub fn is_recoverable_in_batch(&self) -> bool {
        !matches!(self, ComplianceError::InvalidConfiguration(_))
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            ComplianceError::PlanningFailure { folder, reason } => {
                format!(
                    "No compliant name exists for '{}' ({}). Nothing was renamed.",
                    folder, reason
                )
            }
            ComplianceError::ApplyFailure { directory, renamed, message } => {
                if *renamed > 0 {
                    format!(
                        "Renaming stopped in {} after {} entries: {}. The directory is partially renamed; check the exported plan to finish or revert.",
                        directory, renamed, message
                    )
                } else {
                    format!("Nothing was renamed in {}: {}", directory, message)
                }
            }
            ComplianceError::NotConfirmed(_) => {
                "This is a dry run. Pass --apply to rename files.".to_string()
            }
            ComplianceError::UnsafeTarget { tracker } => {
                format!(
                    "This directory looks like it was prepared for {}. Renaming it may break cross-seeding. Pass --force to rename anyway.",
                    tracker
                )
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_error_category() {
        let err = ComplianceError::planning("Book {ASIN.B000000000}", "ASIN alone exceeds budget");
        assert!(err.is_planning_error());
        assert!(!err.is_file_error());
        assert!(err.is_recoverable_in_batch());
        assert!(err.user_message().contains("Nothing was renamed"));
    }

    #[test]
    fn test_apply_failure_message() {
        let err = ComplianceError::apply_failed("/data/book", 2, "permission denied");
        assert!(err.is_file_error());
        assert!(err.to_string().contains("after 2 rename(s)"));
        assert!(err.user_message().contains("partially renamed"));

        let untouched = ComplianceError::apply_failed("/data/book", 0, "target exists");
        assert!(untouched.user_message().starts_with("Nothing was renamed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ComplianceError = io.into();
        assert!(matches!(err, ComplianceError::IoError(_)));
        assert!(err.is_file_error());
    }

    #[test]
    fn test_configuration_error_stops_batch() {
        let err = ComplianceError::InvalidConfiguration("max_full_path must be positive".into());
        assert!(!err.is_recoverable_in_batch());
    }
}
