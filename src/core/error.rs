//! Error types for the vocabulary store.
//!
//! One enum covers every failure the store and the backup manager can report.
//! Variants fall into three groups:
//!
//! - input/config problems (`InvalidPath`, `PathTraversal`, `InvalidName`),
//!   never retried;
//! - data-integrity problems (`DuplicateWord`, `Schema`, `UnrecognizedFormat`,
//!   `InvalidRecord`), carrying line numbers and offending values;
//! - persistence and recovery problems (`Persistence`, `BackupCorrupt`,
//!   `BackupNotFound`), which always leave the previous state in place.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type for store and backup operations.
#[derive(Debug, Error)]
pub enum VocabError {
    /// The storage root is missing, unreadable, or not a directory.
    #[error("Invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// A configured path resolves outside its expected base directory.
    #[error("Path {} is not inside {}", .candidate.display(), .base.display())]
    PathTraversal { candidate: PathBuf, base: PathBuf },

    /// A language name cannot be used to derive file names.
    #[error("Invalid language name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A word already exists (or appears more than once in a record set).
    #[error("Duplicate word '{word}' at line(s) {}", format_lines(.lines))]
    DuplicateWord { word: String, lines: Vec<u64> },

    /// The vocabulary file does not match the canonical schema.
    #[error("Schema error in {} at line {line}: {detail}", .path.display())]
    Schema {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    /// Content matches neither the canonical nor a legacy layout.
    #[error("Unrecognized format at line {line}: {detail}")]
    UnrecognizedFormat { line: u64, detail: String },

    /// A record set failed pre-flight validation.
    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    /// I/O failure while reading or atomically replacing a file.
    #[error("Persistence error on {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A backup's content no longer matches its recorded checksum.
    #[error("Backup #{id} is corrupt ({}): {reason}", .path.display())]
    BackupCorrupt {
        id: u64,
        path: PathBuf,
        reason: String,
    },

    /// No backup matches the requested criteria.
    #[error("Backup not found: {0}")]
    BackupNotFound(String),
}

impl VocabError {
    /// Wrap an I/O error with the path it happened on.
    pub fn persistence(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unrecognized format error.
    pub fn unrecognized(line: u64, detail: impl Into<String>) -> Self {
        Self::UnrecognizedFormat {
            line,
            detail: detail.into(),
        }
    }

    /// Create an invalid record error.
    pub fn invalid_record(line: u64, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            reason: reason.into(),
        }
    }

    /// True for problems the user fixes by editing input or config.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. } | Self::PathTraversal { .. } | Self::InvalidName { .. }
        )
    }

    /// True for problems in the stored data itself.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateWord { .. }
                | Self::Schema { .. }
                | Self::UnrecognizedFormat { .. }
                | Self::InvalidRecord { .. }
        )
    }
}

fn format_lines(lines: &[u64]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for store operations.
pub type VocabResult<T> = Result<T, VocabError>;
