//! Snapshot, inspection and restore of vocabulary files.

pub mod index;
pub mod manager;

pub use index::{checksum, BackupIndex, BackupRecord, SnapshotReason};
pub use manager::{
    BackupManager, CheckStatus, RestoreCriteria, RestoreOutcome, RetentionPolicy, SnapshotCheck,
    SnapshotFilter, ValidateTarget, ValidationReport, DEFAULT_MAX_SNAPSHOTS,
};
