//! Vocabulary Store
//!
//! Owns one canonical vocabulary file per language pair. Every read routes
//! legacy content through the migrator first (taking a snapshot before the
//! file is rewritten), and every write goes through the atomic-replace
//! primitive, so other readers only ever see complete files.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use super::migrator::parse_table;
use super::pair::{LanguagePair, StoragePaths};
use super::schema::{self, VocabularyRecord, VocabularyTable};
use crate::core::atomic::atomic_write;
use crate::core::backup::{BackupManager, BackupRecord, SnapshotReason};
use crate::core::context::StoreContext;
use crate::core::error::{VocabError, VocabResult};

/// Records still waiting for a translation.
///
/// Iterating is lazy and can be repeated any number of times.
#[derive(Debug, Clone, Default)]
pub struct PendingTranslations {
    records: Vec<VocabularyRecord>,
}

impl PendingTranslations {
    pub fn iter(&self) -> impl Iterator<Item = &VocabularyRecord> + '_ {
        self.records.iter().filter(|r| r.is_pending())
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a PendingTranslations {
    type Item = &'a VocabularyRecord;
    type IntoIter = std::iter::Filter<
        std::slice::Iter<'a, VocabularyRecord>,
        fn(&&'a VocabularyRecord) -> bool,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.records
            .iter()
            .filter(is_pending_ref as fn(&&'a VocabularyRecord) -> bool)
    }
}

fn is_pending_ref(record: &&VocabularyRecord) -> bool {
    record.is_pending()
}

/// A loaded vocabulary file: raw text and its typed view.
struct LoadedFile {
    raw: String,
    table: VocabularyTable,
}

pub struct VocabularyStore {
    ctx: StoreContext,
    backups: BackupManager,
}

impl VocabularyStore {
    pub fn new(ctx: StoreContext) -> Self {
        let backups = BackupManager::from_context(&ctx);
        Self { ctx, backups }
    }

    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Validate the storage root and resolve the files of `pair`.
    pub fn paths(&self, pair: &LanguagePair) -> VocabResult<StoragePaths> {
        self.ctx.paths_for(pair)
    }

    /// Append `word` with empty translation fields.
    ///
    /// Fails with [`VocabError::DuplicateWord`] when the word is already
    /// present; the file is not touched in that case.
    pub fn add_record(&self, pair: &LanguagePair, word: &str) -> VocabResult<VocabularyRecord> {
        let word = word.trim();
        if word.is_empty() {
            return Err(VocabError::invalid_record(0, "word is empty"));
        }

        let path = self.paths(pair)?.vocabulary;
        let loaded = self.load_file(&path)?;

        let lines = loaded.table.lines_of(word);
        if !lines.is_empty() {
            return Err(VocabError::DuplicateWord {
                word: word.to_string(),
                lines,
            });
        }

        let record = VocabularyRecord::pending(word);
        let content = if loaded.table.version.is_canonical() && !loaded.raw.trim().is_empty() {
            let mut content = loaded.raw;
            if !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&schema::render_row(&record, loaded.table.recognized_column)?);
            content
        } else {
            schema::render_table(std::slice::from_ref(&record))?
        };

        atomic_write(&path, content.as_bytes())?;
        info!(pair = %pair, word, "Added word");
        Ok(record)
    }

    /// Records whose translation is still empty.
    pub fn get_words_pending_translation(
        &self,
        pair: &LanguagePair,
    ) -> VocabResult<PendingTranslations> {
        let table = self.load(pair)?;
        Ok(PendingTranslations {
            records: table.into_records(),
        })
    }

    /// Replace the whole file with `records`.
    ///
    /// The set is validated before anything is written: it must be non-empty,
    /// every word must be non-empty and no word may appear twice. The caller
    /// takes a snapshot first (see [`BackupManager::create_snapshot`]).
    pub fn overwrite_with_translated(
        &self,
        pair: &LanguagePair,
        records: &[VocabularyRecord],
    ) -> VocabResult<()> {
        validate_record_set(records)?;

        let path = self.paths(pair)?.vocabulary;
        let content = schema::render_table(records)?;
        atomic_write(&path, content.as_bytes())?;

        info!(pair = %pair, count = records.len(), "Committed translated records");
        Ok(())
    }

    /// All records in file order, for read-only consumers such as deck export.
    pub fn records(&self, pair: &LanguagePair) -> VocabResult<Vec<VocabularyRecord>> {
        Ok(self.load(pair)?.into_records())
    }

    pub fn word_exists(&self, pair: &LanguagePair, word: &str) -> VocabResult<bool> {
        let word = word.trim();
        Ok(self.load(pair)?.records().any(|r| r.word == word))
    }

    /// True when the file is missing or holds no records after the header.
    pub fn is_empty(&self, pair: &LanguagePair) -> VocabResult<bool> {
        Ok(self.load(pair)?.is_empty())
    }

    /// Delete the pair's vocabulary and deck export files.
    ///
    /// The vocabulary file is snapshotted first; the snapshot is returned.
    pub fn remove_pair(&self, pair: &LanguagePair) -> VocabResult<Option<BackupRecord>> {
        let paths = self.paths(pair)?;
        let snapshot = self
            .backups
            .create_snapshot(&paths.vocabulary, SnapshotReason::BeforeDelete)?;

        for path in [&paths.vocabulary, &paths.anki_export] {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "Removed file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(VocabError::persistence(path, e)),
            }
        }
        Ok(snapshot)
    }

    /// Typed contents of the pair's file, migrating a legacy layout on disk first.
    pub fn load(&self, pair: &LanguagePair) -> VocabResult<VocabularyTable> {
        let path = self.paths(pair)?.vocabulary;
        Ok(self.load_file(&path)?.table)
    }

    fn load_file(&self, path: &Path) -> VocabResult<LoadedFile> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Vocabulary file does not exist yet");
                return Ok(LoadedFile {
                    raw: String::new(),
                    table: VocabularyTable::empty(),
                });
            }
            Err(e) => return Err(VocabError::persistence(path, e)),
        };
        let raw = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            VocabError::Schema {
                path: path.to_path_buf(),
                line: line_of_offset(valid),
                detail: "file is not valid UTF-8".to_string(),
            }
        })?;

        let table = parse_table(&raw).map_err(|e| schema_error(path, e))?;
        if !table.version.is_legacy() {
            return Ok(LoadedFile { raw, table });
        }

        info!(
            path = %path.display(),
            from = %table.version,
            "Upgrading legacy vocabulary file"
        );
        self.backups
            .create_snapshot(path, SnapshotReason::BeforeMigration)?;
        let canonical = schema::render_table(&table.into_records())?;
        atomic_write(path, canonical.as_bytes())?;

        // Re-read so line numbers refer to the rewritten file.
        let table = parse_table(&canonical).map_err(|e| schema_error(path, e))?;
        Ok(LoadedFile {
            raw: canonical,
            table,
        })
    }
}

/// 1-based line holding the byte just past `prefix`.
fn line_of_offset(prefix: &[u8]) -> u64 {
    prefix.iter().filter(|&&b| b == b'\n').count() as u64 + 1
}

/// Pre-flight checks for a full record set. Positions are file lines: the
/// header is line 1, so record `i` lands on line `i + 2`.
fn validate_record_set(records: &[VocabularyRecord]) -> VocabResult<()> {
    if records.is_empty() {
        return Err(VocabError::invalid_record(
            0,
            "refusing to replace the file with an empty record set",
        ));
    }

    let mut positions: HashMap<&str, Vec<u64>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let line = i as u64 + 2;
        if record.word.trim().is_empty() {
            return Err(VocabError::invalid_record(line, "word is empty"));
        }
        positions.entry(record.word.as_str()).or_default().push(line);
    }

    // Report the first duplicated word in input order.
    for record in records {
        if let Some(lines) = positions.get(record.word.as_str()) {
            if lines.len() > 1 {
                return Err(VocabError::DuplicateWord {
                    word: record.word.clone(),
                    lines: lines.clone(),
                });
            }
        }
    }
    Ok(())
}

fn schema_error(path: &Path, err: VocabError) -> VocabError {
    match err {
        VocabError::UnrecognizedFormat { line, detail } => VocabError::Schema {
            path: path.to_path_buf(),
            line,
            detail,
        },
        other => other,
    }
}
