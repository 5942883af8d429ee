//! Integration tests for the vocabulary store and backup manager.
//!
//! These tests drive the public API the way a command does: snapshot, mutate,
//! and recover, against a temporary home directory.
//!
//! # Test Categories
//!
//! - **Translation cycle**: add words, snapshot, commit translations
//! - **Recovery**: restore after a bad commit, undo a restore
//! - **Legacy files**: migration on first touch
//! - **Crash safety**: a failed commit leaves the previous file in place
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test store_recovery
//! ```

use std::fs;

use tempfile::TempDir;

use vocabmaster::config::AppConfig;
use vocabmaster::core::backup::{
    RestoreCriteria, RetentionPolicy, SnapshotFilter, SnapshotReason, ValidateTarget,
};
use vocabmaster::core::vocabulary::{LanguagePair, VocabularyRecord, VocabularyStore};
use vocabmaster::core::{StoreContext, VocabError};

struct Fixture {
    _home: TempDir,
    store: VocabularyStore,
    pair: LanguagePair,
}

fn fixture() -> Fixture {
    let home = TempDir::new().unwrap();
    let ctx = StoreContext::new(&home.path().join("vocab"), home.path()).unwrap();
    Fixture {
        store: VocabularyStore::new(ctx),
        pair: LanguagePair::parse("english:french").unwrap(),
        _home: home,
    }
}

#[test]
fn test_translation_cycle_with_snapshot() {
    let f = fixture();
    for word in ["chat", "chien", "oiseau"] {
        f.store.add_record(&f.pair, word).unwrap();
    }

    let pending: Vec<VocabularyRecord> = f
        .store
        .get_words_pending_translation(&f.pair)
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(pending.len(), 3);

    let path = f.store.paths(&f.pair).unwrap().vocabulary;
    let snapshot = f
        .store
        .backups()
        .create_snapshot(&path, SnapshotReason::BeforeTranslation)
        .unwrap()
        .unwrap();

    let translated: Vec<VocabularyRecord> = pending
        .iter()
        .map(|r| VocabularyRecord::translated(r.word.clone(), format!("{}-en", r.word), "ex."))
        .collect();
    f.store.overwrite_with_translated(&f.pair, &translated).unwrap();

    assert!(f.store.get_words_pending_translation(&f.pair).unwrap().is_empty());
    assert_eq!(f.store.records(&f.pair).unwrap(), translated);

    // The snapshot still holds the untranslated words.
    let backup = fs::read_to_string(&snapshot.backup_file_path).unwrap();
    assert_eq!(backup, "word,translation,example\nchat,,\nchien,,\noiseau,,\n");
}

#[test]
fn test_restore_after_bad_commit_and_undo() {
    let f = fixture();
    f.store.add_record(&f.pair, "chat").unwrap();
    let path = f.store.paths(&f.pair).unwrap().vocabulary;
    let content_a = fs::read(&path).unwrap();

    f.store
        .backups()
        .create_snapshot(&path, SnapshotReason::BeforeTranslation)
        .unwrap();
    f.store
        .overwrite_with_translated(
            &f.pair,
            &[VocabularyRecord::translated("chat", "=WRONG()", "")],
        )
        .unwrap();
    let content_b = fs::read(&path).unwrap();

    let outcome = f
        .store
        .backups()
        .restore(RestoreCriteria::Latest { source: &path })
        .unwrap();
    assert_eq!(fs::read(&path).unwrap(), content_a);
    assert!(outcome.pre_restore.is_some());

    f.store
        .backups()
        .restore(RestoreCriteria::Latest { source: &path })
        .unwrap();
    assert_eq!(fs::read(&path).unwrap(), content_b);
    assert_eq!(f.store.records(&f.pair).unwrap()[0].translation, "=WRONG()");
}

#[test]
fn test_legacy_file_upgrade_keeps_a_backup() {
    let f = fixture();
    let path = f.store.paths(&f.pair).unwrap().vocabulary;
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let legacy = "hello\t'bonjour'\t\"Hello world\"\n";
    fs::write(&path, legacy).unwrap();

    f.store.add_record(&f.pair, "chat").unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "word,translation,example\nhello,'bonjour',\"\"\"Hello world\"\"\"\nchat,,\n"
    );

    let snapshots = f
        .store
        .backups()
        .list_snapshots(SnapshotFilter::Pair(&f.pair))
        .unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        fs::read_to_string(&snapshots[0].backup_file_path).unwrap(),
        legacy
    );
}

#[test]
fn test_failed_commit_leaves_previous_file() {
    let f = fixture();
    f.store.add_record(&f.pair, "chat").unwrap();
    let path = f.store.paths(&f.pair).unwrap().vocabulary;
    let before = fs::read(&path).unwrap();

    let invalid = [
        VocabularyRecord::translated("chat", "cat", ""),
        VocabularyRecord::translated("", "nothing", ""),
    ];
    let err = f.store.overwrite_with_translated(&f.pair, &invalid).unwrap_err();
    assert!(matches!(err, VocabError::InvalidRecord { line: 3, .. }));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_backup_ids_stable_across_restarts() {
    let home = TempDir::new().unwrap();
    let data = home.path().join("vocab");
    let pair = LanguagePair::parse("german:english").unwrap();

    let first = VocabularyStore::new(StoreContext::new(&data, home.path()).unwrap());
    first.add_record(&pair, "Hund").unwrap();
    let path = first.paths(&pair).unwrap().vocabulary;
    first
        .backups()
        .create_snapshot(&path, SnapshotReason::Manual)
        .unwrap();
    first
        .backups()
        .create_snapshot(&path, SnapshotReason::Manual)
        .unwrap();
    let listed_before: Vec<u64> = first
        .backups()
        .list_snapshots(SnapshotFilter::All)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();

    let second = VocabularyStore::new(StoreContext::new(&data, home.path()).unwrap());
    let listed_after: Vec<u64> = second
        .backups()
        .list_snapshots(SnapshotFilter::All)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed_before, listed_after);
    assert_eq!(listed_after, vec![2, 1]);

    let third = second
        .backups()
        .create_snapshot(&path, SnapshotReason::Manual)
        .unwrap()
        .unwrap();
    assert_eq!(third.id, 3);
}

#[test]
fn test_retention_through_configuration() {
    let home = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.data.data_dir = Some(home.path().join("vocab"));
    config.backup.max_snapshots = 2;

    let store = VocabularyStore::new(config.context_in(home.path()).unwrap());
    assert_eq!(
        store.context().retention(),
        &RetentionPolicy {
            max_snapshots: 2,
            max_age: None
        }
    );

    let pair = config.resolve_pair(Some("english:french")).unwrap();
    store.add_record(&pair, "chat").unwrap();
    let path = store.paths(&pair).unwrap().vocabulary;
    for _ in 0..3 {
        store
            .backups()
            .create_snapshot(&path, SnapshotReason::Manual)
            .unwrap();
    }

    let ids: Vec<u64> = store
        .backups()
        .list_snapshots(SnapshotFilter::Source(&path))
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![3, 2]);

    let report = store.backups().validate(ValidateTarget::All).unwrap();
    assert_eq!(report.total, 2);
    assert!(report.is_clean());
}

#[test]
fn test_remove_pair_is_recoverable() {
    let f = fixture();
    f.store.add_record(&f.pair, "chat").unwrap();
    let path = f.store.paths(&f.pair).unwrap().vocabulary;
    let before = fs::read(&path).unwrap();

    let snapshot = f.store.remove_pair(&f.pair).unwrap().unwrap();
    assert!(!path.exists());

    f.store
        .backups()
        .restore(RestoreCriteria::ById(snapshot.id))
        .unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
}
