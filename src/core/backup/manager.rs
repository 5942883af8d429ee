//! Backup Manager
//!
//! Snapshots vocabulary files before they are overwritten or deleted, and
//! lists, validates and restores those snapshots.
//!
//! Layout under the backup root:
//!
//! ```text
//! .backup/
//!   index.json
//!   vocab_list_english-french/
//!     vocab_list_english-french_2024-01-15T103045.123456Z_1.bak
//!     pre_restore_vocab_list_english-french_2024-01-15T110000.000000Z_2.bak
//! ```

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::index::{backup_file_name, checksum, BackupIndex, BackupRecord, SnapshotReason};
use crate::core::atomic::atomic_write;
use crate::core::context::StoreContext;
use crate::core::error::{VocabError, VocabResult};
use crate::core::vocabulary::{detect_format, migrate, LanguagePair};

/// Default number of snapshots kept per source file.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 10;

/// Retention applied per source file each time a snapshot is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum snapshots kept for one source; the newest one always survives.
    pub max_snapshots: usize,
    /// Snapshots older than this are pruned.
    pub max_age: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            max_age: None,
        }
    }
}

/// Which snapshots to list.
#[derive(Debug, Clone, Copy)]
pub enum SnapshotFilter<'a> {
    All,
    Pair(&'a LanguagePair),
    Source(&'a Path),
}

/// Which snapshot to restore.
#[derive(Debug, Clone, Copy)]
pub enum RestoreCriteria<'a> {
    /// Most recent snapshot of a source file.
    Latest { source: &'a Path },
    ById(u64),
}

/// Which snapshots to validate.
#[derive(Debug, Clone, Copy)]
pub enum ValidateTarget<'a> {
    All,
    ById(u64),
    Source(&'a Path),
}

#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub restored: BackupRecord,
    /// Snapshot of the live file taken just before it was replaced.
    pub pre_restore: Option<BackupRecord>,
    /// The backup held a legacy layout and was converted before installing.
    pub migrated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CheckStatus {
    Valid,
    Mismatch { actual: String },
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCheck {
    pub record: BackupRecord,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub checks: Vec<SnapshotCheck>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.invalid == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &SnapshotCheck> {
        self.checks.iter().filter(|c| c.status != CheckStatus::Valid)
    }
}

/// Backup manager rooted at one backup directory.
///
/// Restores only ever write directly inside `data_dir`, whatever the index
/// says the source path is.
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    data_dir: PathBuf,
    retention: RetentionPolicy,
}

impl BackupManager {
    /// Manager for a backup root that lives inside its data directory.
    pub fn new(root: impl Into<PathBuf>, retention: RetentionPolicy) -> Self {
        let root = root.into();
        let data_dir = root.parent().unwrap_or(&root).to_path_buf();
        Self {
            root,
            data_dir,
            retention,
        }
    }

    pub fn from_context(ctx: &StoreContext) -> Self {
        Self {
            root: ctx.backup_root().to_path_buf(),
            data_dir: ctx.data_dir().to_path_buf(),
            retention: ctx.retention().clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy the current content of `source` into a new snapshot.
    ///
    /// Returns `None` when `source` does not exist yet. Retention for that
    /// source is applied afterwards; the new snapshot is never pruned.
    pub fn create_snapshot(
        &self,
        source: &Path,
        reason: SnapshotReason,
    ) -> VocabResult<Option<BackupRecord>> {
        self.snapshot_protecting(source, reason, None)
    }

    /// [`BackupManager::create_snapshot`], with `protected` exempt from
    /// retention for this run.
    fn snapshot_protecting(
        &self,
        source: &Path,
        reason: SnapshotReason,
        protected: Option<u64>,
    ) -> VocabResult<Option<BackupRecord>> {
        let bytes = match fs::read(source) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(source = %source.display(), "No file to snapshot");
                return Ok(None);
            }
            Err(e) => return Err(VocabError::persistence(source, e)),
        };

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| VocabError::invalid_path(source, "no file name"))?;

        let mut index = BackupIndex::load(&self.root)?;
        let id = index.allocate_id();
        let now = Utc::now();
        let backup_path = self
            .root
            .join(&stem)
            .join(backup_file_name(&stem, now, id, reason));

        atomic_write(&backup_path, &bytes)?;

        let record = BackupRecord {
            id,
            timestamp_utc: now,
            source_file_path: source.to_path_buf(),
            backup_file_path: backup_path,
            checksum: checksum(&bytes),
            format_version: detect_format(&String::from_utf8_lossy(&bytes)),
            size_bytes: bytes.len() as u64,
            reason,
        };
        index.entries.push(record.clone());

        let pruned = self.apply_retention(&mut index, source, id, protected, now);
        index.save(&self.root)?;

        // Files go only after the index no longer references them.
        for old in &pruned {
            match fs::remove_file(&old.backup_file_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %old.backup_file_path.display(),
                    error = %e,
                    "Failed to delete pruned backup"
                ),
            }
        }
        if !pruned.is_empty() {
            info!(source = %source.display(), pruned = pruned.len(), "Pruned old backups");
        }

        info!(
            id,
            reason = %reason,
            source = %source.display(),
            backup = %record.backup_file_path.display(),
            "Created backup"
        );
        Ok(Some(record))
    }

    /// Snapshots matching `filter`, newest first.
    pub fn list_snapshots(&self, filter: SnapshotFilter<'_>) -> VocabResult<Vec<BackupRecord>> {
        let index = BackupIndex::load(&self.root)?;
        let mut records: Vec<BackupRecord> = index
            .entries
            .into_iter()
            .filter(|r| matches_filter(r, filter))
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    /// Install a snapshot as the live file.
    ///
    /// The snapshot is verified before anything is touched. The live file is
    /// itself snapshotted first, so the restore can be undone by restoring
    /// the latest snapshot again.
    pub fn restore(&self, criteria: RestoreCriteria<'_>) -> VocabResult<RestoreOutcome> {
        let index = BackupIndex::load(&self.root)?;
        let record = match criteria {
            RestoreCriteria::Latest { source } => index.latest_for(source).cloned().ok_or_else(|| {
                VocabError::BackupNotFound(format!("no backup for {}", source.display()))
            })?,
            RestoreCriteria::ById(id) => index
                .get(id)
                .cloned()
                .ok_or_else(|| VocabError::BackupNotFound(format!("id {id}")))?,
        };
        self.check_restore_target(&record.source_file_path)?;

        let bytes = self.verified_content(&record)?;
        let content = String::from_utf8(bytes)
            .map_err(|_| VocabError::unrecognized(0, "backup content is not valid UTF-8"))?;
        let installed = migrate(&content)?;
        let migrated = matches!(installed, Cow::Owned(_));

        // The backup being installed must survive the pre-restore pruning in
        // case the write below fails.
        let pre_restore = self.snapshot_protecting(
            &record.source_file_path,
            SnapshotReason::PreRestore,
            Some(record.id),
        )?;
        atomic_write(&record.source_file_path, installed.as_bytes())?;

        info!(
            id = record.id,
            source = %record.source_file_path.display(),
            migrated,
            "Restored backup"
        );
        Ok(RestoreOutcome {
            restored: record,
            pre_restore,
            migrated,
        })
    }

    /// Recompute checksums without modifying anything.
    pub fn validate(&self, target: ValidateTarget<'_>) -> VocabResult<ValidationReport> {
        let index = BackupIndex::load(&self.root)?;
        let selected: Vec<BackupRecord> = match target {
            ValidateTarget::All => index.entries,
            ValidateTarget::ById(id) => vec![index
                .get(id)
                .cloned()
                .ok_or_else(|| VocabError::BackupNotFound(format!("id {id}")))?],
            ValidateTarget::Source(source) => index
                .entries
                .into_iter()
                .filter(|r| r.source_file_path == source)
                .collect(),
        };

        let mut report = ValidationReport::default();
        for record in selected {
            let status = check_record(&record)?;
            report.total += 1;
            if status == CheckStatus::Valid {
                report.valid += 1;
            } else {
                warn!(id = record.id, status = ?status, "Backup failed validation");
                report.invalid += 1;
            }
            report.checks.push(SnapshotCheck { record, status });
        }
        Ok(report)
    }

    /// A restore target must be a file directly inside the data directory.
    fn check_restore_target(&self, target: &Path) -> VocabResult<()> {
        let inside = target.parent() == Some(self.data_dir.as_path())
            && matches!(target.components().next_back(), Some(Component::Normal(_)));
        if inside {
            Ok(())
        } else {
            warn!(target = %target.display(), "Backup index points outside the data directory");
            Err(VocabError::PathTraversal {
                candidate: target.to_path_buf(),
                base: self.data_dir.clone(),
            })
        }
    }

    fn verified_content(&self, record: &BackupRecord) -> VocabResult<Vec<u8>> {
        let bytes = match fs::read(&record.backup_file_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(corrupt(record, "backup file is missing"));
            }
            Err(e) => return Err(VocabError::persistence(&record.backup_file_path, e)),
        };
        let actual = checksum(&bytes);
        if actual != record.checksum {
            return Err(corrupt(
                record,
                format!("checksum mismatch: expected {}, found {actual}", record.checksum),
            ));
        }
        Ok(bytes)
    }

    /// Remove snapshots of `source` beyond the retention limits, oldest first.
    ///
    /// `keep_id` (the new snapshot) and `protected` are never evicted but
    /// still take a slot each.
    fn apply_retention(
        &self,
        index: &mut BackupIndex,
        source: &Path,
        keep_id: u64,
        protected: Option<u64>,
        now: DateTime<Utc>,
    ) -> Vec<BackupRecord> {
        let is_protected = |id: u64| id == keep_id || Some(id) == protected;
        let protected_slots = index
            .entries
            .iter()
            .filter(|r| r.source_file_path == source && is_protected(r.id))
            .count();
        let mut candidates: Vec<(u64, DateTime<Utc>)> = index
            .entries
            .iter()
            .filter(|r| r.source_file_path == source && !is_protected(r.id))
            .map(|r| (r.id, r.timestamp_utc))
            .collect();
        candidates.sort_by_key(|(id, _)| *id);

        let mut evict = Vec::new();
        if let Some(max_age) = self.retention.max_age {
            let cutoff = now - max_age;
            evict.extend(candidates.iter().filter(|(_, ts)| *ts < cutoff).map(|(id, _)| *id));
        }

        let survivors: Vec<u64> = candidates
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !evict.contains(id))
            .collect();
        let allowed = self
            .retention
            .max_snapshots
            .max(1)
            .saturating_sub(protected_slots);
        if survivors.len() > allowed {
            evict.extend_from_slice(&survivors[..survivors.len() - allowed]);
        }

        let (pruned, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut index.entries)
            .into_iter()
            .partition(|r| evict.contains(&r.id));
        index.entries = kept;
        pruned
    }
}

fn matches_filter(record: &BackupRecord, filter: SnapshotFilter<'_>) -> bool {
    match filter {
        SnapshotFilter::All => true,
        SnapshotFilter::Pair(pair) => record
            .source_file_path
            .file_name()
            .map(|name| name.to_string_lossy() == pair.vocabulary_file_name())
            .unwrap_or(false),
        SnapshotFilter::Source(source) => record.source_file_path == source,
    }
}

fn check_record(record: &BackupRecord) -> VocabResult<CheckStatus> {
    match fs::read(&record.backup_file_path) {
        Ok(bytes) => {
            let actual = checksum(&bytes);
            if actual == record.checksum {
                Ok(CheckStatus::Valid)
            } else {
                Ok(CheckStatus::Mismatch { actual })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CheckStatus::Missing),
        Err(e) => Err(VocabError::persistence(&record.backup_file_path, e)),
    }
}

fn corrupt(record: &BackupRecord, reason: impl Into<String>) -> VocabError {
    VocabError::BackupCorrupt {
        id: record.id,
        path: record.backup_file_path.clone(),
        reason: reason.into(),
    }
}
