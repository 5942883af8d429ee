//! Durable backup index.
//!
//! `index.json` in the backup root holds every [`BackupRecord`] plus the next
//! id to hand out, so ids never collide or reorder between process runs. When
//! the index is missing or unreadable it is rebuilt from the `.bak` files on
//! disk, ordered by the timestamp encoded in each file name.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::core::atomic::atomic_write;
use crate::core::error::{VocabError, VocabResult};
use crate::core::vocabulary::{detect_format, FormatVersion};

pub const INDEX_FILE: &str = "index.json";
pub const INDEX_VERSION: u32 = 1;
pub const BACKUP_EXTENSION: &str = "bak";
pub const PRE_RESTORE_PREFIX: &str = "pre_restore_";

/// Snapshot files written by the translation step; not vocabulary backups.
const IGNORED_PREFIX: &str = "gpt_request_";

/// Timestamp layout embedded in backup file names.
const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S%.6fZ";
/// Layout used by older releases (ISO 8601 with ':' replaced by '_').
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H_%M_%S%.f";

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotReason {
    Manual,
    BeforeTranslation,
    BeforeMigration,
    PreRestore,
    BeforeDelete,
}

impl SnapshotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotReason::Manual => "manual",
            SnapshotReason::BeforeTranslation => "before-translation",
            SnapshotReason::BeforeMigration => "before-migration",
            SnapshotReason::PreRestore => "pre-restore",
            SnapshotReason::BeforeDelete => "before-delete",
        }
    }
}

impl fmt::Display for SnapshotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Metadata for one snapshot. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: u64,
    pub timestamp_utc: DateTime<Utc>,
    pub source_file_path: PathBuf,
    pub backup_file_path: PathBuf,
    /// SHA-256 of the backup content, lowercase hex.
    pub checksum: String,
    pub format_version: FormatVersion,
    pub size_bytes: u64,
    pub reason: SnapshotReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupIndex {
    pub version: u32,
    pub next_id: u64,
    pub entries: Vec<BackupRecord>,
}

impl Default for BackupIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl BackupIndex {
    /// Load the index stored under `root`, rebuilding it from disk when it is
    /// missing or corrupt. Nothing is written here.
    pub fn load(root: &Path) -> VocabResult<Self> {
        let path = root.join(INDEX_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::rebuild(root),
            Err(e) => return Err(VocabError::persistence(&path, e)),
        };

        match serde_json::from_str::<BackupIndex>(&raw) {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Backup index unreadable, rebuilding from files");
                Self::rebuild(root)
            }
        }
    }

    /// Persist atomically.
    pub fn save(&self, root: &Path) -> VocabResult<()> {
        let path = root.join(INDEX_FILE);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| VocabError::persistence(&path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        atomic_write(&path, &json)
    }

    /// Reconstruct the index from the backup files below `root`.
    pub fn rebuild(root: &Path) -> VocabResult<Self> {
        let mut found = Vec::new();
        let data_dir = root.parent().unwrap_or(root);

        let dirs = match fs::read_dir(root) {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(VocabError::persistence(root, e)),
        };

        for dir in dirs.flatten() {
            let dir_path = dir.path();
            if !dir_path.is_dir() {
                continue;
            }
            let source = source_for_dir(data_dir, &dir.file_name().to_string_lossy());
            let files = fs::read_dir(&dir_path).map_err(|e| VocabError::persistence(&dir_path, e))?;
            for file in files.flatten() {
                let path = file.path();
                let name = file.file_name().to_string_lossy().into_owned();
                if !is_backup_file_name(&name) {
                    continue;
                }
                let timestamp = timestamp_from_name(&name).or_else(|| modified_time(&path));
                found.push((timestamp, name, path, source.clone()));
            }
        }

        found.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        // Ids embedded in file names are kept. Files from releases that did
        // not record one are numbered after the highest recovered id.
        let mut index = Self::default();
        let mut seen = HashSet::new();
        let mut unnumbered = Vec::new();
        for (timestamp, name, path, source) in found {
            match id_from_name(&name) {
                Some(id) if seen.insert(id) => {
                    index
                        .entries
                        .push(record_from_file(id, timestamp, &name, path, source)?);
                }
                _ => unnumbered.push((timestamp, name, path, source)),
            }
        }
        index.next_id = index.entries.iter().map(|e| e.id).max().map_or(1, |max| max + 1);
        for (timestamp, name, path, source) in unnumbered {
            let id = index.allocate_id();
            index
                .entries
                .push(record_from_file(id, timestamp, &name, path, source)?);
        }
        index.entries.sort_by_key(|e| e.id);

        if !index.entries.is_empty() {
            info!(root = %root.display(), count = index.entries.len(), "Rebuilt backup index from files");
        }
        Ok(index)
    }

    /// Hand out the next id. Ids are never reused, even after pruning.
    pub fn allocate_id(&mut self) -> u64 {
        let max_seen = self.entries.iter().map(|e| e.id).max().unwrap_or(0);
        let id = self.next_id.max(max_seen + 1);
        self.next_id = id + 1;
        id
    }

    pub fn get(&self, id: u64) -> Option<&BackupRecord> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Most recent snapshot of `source`.
    pub fn latest_for(&self, source: &Path) -> Option<&BackupRecord> {
        self.entries
            .iter()
            .filter(|e| e.source_file_path == source)
            .max_by_key(|e| e.id)
    }
}

fn record_from_file(
    id: u64,
    timestamp: Option<DateTime<Utc>>,
    name: &str,
    path: PathBuf,
    source: PathBuf,
) -> VocabResult<BackupRecord> {
    let bytes = fs::read(&path).map_err(|e| VocabError::persistence(&path, e))?;
    let reason = if name.starts_with(PRE_RESTORE_PREFIX) {
        SnapshotReason::PreRestore
    } else {
        SnapshotReason::Manual
    };
    Ok(BackupRecord {
        id,
        timestamp_utc: timestamp.unwrap_or_else(Utc::now),
        source_file_path: source,
        backup_file_path: path,
        checksum: checksum(&bytes),
        format_version: detect_format(&String::from_utf8_lossy(&bytes)),
        size_bytes: bytes.len() as u64,
        reason,
    })
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `{stem}_{timestamp}_{id}.bak`, with a `pre_restore_` prefix for
/// snapshots taken by a restore.
pub fn backup_file_name(stem: &str, at: DateTime<Utc>, id: u64, reason: SnapshotReason) -> String {
    let prefix = if reason == SnapshotReason::PreRestore {
        PRE_RESTORE_PREFIX
    } else {
        ""
    };
    format!(
        "{prefix}{stem}_{}_{id}.{BACKUP_EXTENSION}",
        at.format(NAME_TIMESTAMP_FORMAT)
    )
}

fn is_backup_file_name(name: &str) -> bool {
    name.ends_with(&format!(".{BACKUP_EXTENSION}")) && !name.starts_with(IGNORED_PREFIX)
}

/// Recover the creation time from a backup file name written by any release.
fn timestamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let base = name.strip_suffix(&format!(".{BACKUP_EXTENSION}"))?;

    for (pos, _) in base.match_indices('_') {
        let tail = &base[pos + 1..];
        if let Ok(ts) = NaiveDateTime::parse_from_str(without_id(tail), NAME_TIMESTAMP_FORMAT) {
            return Some(ts.and_utc());
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(tail, LEGACY_TIMESTAMP_FORMAT) {
            return Some(ts.and_utc());
        }
    }
    None
}

/// Id written by [`backup_file_name`]: the digits after the current-layout
/// timestamp. Legacy names such as `..._10_30_45.bak` carry none.
fn id_from_name(name: &str) -> Option<u64> {
    let base = name.strip_suffix(&format!(".{BACKUP_EXTENSION}"))?;
    let (head, id) = base.rsplit_once('_')?;
    let (_, ts) = head.rsplit_once('_')?;
    NaiveDateTime::parse_from_str(ts, NAME_TIMESTAMP_FORMAT).ok()?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Strip a trailing `_{id}`.
fn without_id(tail: &str) -> &str {
    match tail.rsplit_once('_') {
        Some((head, id)) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => tail,
    }
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Source file a backup directory belongs to.
///
/// Directories are named after the source file stem. Older releases named
/// them `{learn}-{mother}` after the pair.
fn source_for_dir(data_dir: &Path, dir_name: &str) -> PathBuf {
    if dir_name.starts_with("vocab_list_") || dir_name.starts_with("anki_deck_") {
        data_dir.join(format!("{dir_name}.csv"))
    } else {
        data_dir.join(format!("vocab_list_{dir_name}.csv"))
    }
}
