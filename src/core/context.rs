//! Explicit store context.
//!
//! Carries the resolved storage root and backup settings into the store and
//! the backup manager, so nothing reads process-wide configuration.

use std::path::{Path, PathBuf};

use super::backup::RetentionPolicy;
use super::error::VocabResult;
use super::paths::validate_data_directory;
use super::vocabulary::{LanguagePair, StoragePaths};

/// Name of the backup directory inside the data directory.
pub const BACKUP_DIR_NAME: &str = ".backup";

#[derive(Debug, Clone)]
pub struct StoreContext {
    data_dir: PathBuf,
    expected_home: PathBuf,
    backup_root: PathBuf,
    retention: RetentionPolicy,
}

impl StoreContext {
    /// Validate `data_dir` against `expected_home` and build a context with
    /// default retention.
    pub fn new(data_dir: &Path, expected_home: &Path) -> VocabResult<Self> {
        let data_dir = validate_data_directory(data_dir, expected_home)?;
        let backup_root = data_dir.join(BACKUP_DIR_NAME);
        Ok(Self {
            data_dir,
            expected_home: expected_home.to_path_buf(),
            backup_root,
            retention: RetentionPolicy::default(),
        })
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Re-check the storage root and resolve the files of `pair`.
    ///
    /// The root is validated again on every call because the directory can be
    /// replaced (for instance by a symlink) between invocations.
    pub fn paths_for(&self, pair: &LanguagePair) -> VocabResult<StoragePaths> {
        let root = validate_data_directory(&self.data_dir, &self.expected_home)?;
        Ok(StoragePaths {
            vocabulary: root.join(pair.vocabulary_file_name()),
            anki_export: root.join(pair.anki_file_name()),
        })
    }
}
