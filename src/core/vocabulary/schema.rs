//! Record Schema
//!
//! Canonical layout of a vocabulary file:
//!
//! ```text
//! word,translation,example[,recognized]
//! chat,cat,Le chat dort.
//! ```
//!
//! Comma-delimited, UTF-8, one header row. The `recognized` column is only
//! written when at least one record was produced by automatic word
//! recognition. A leading byte-order mark and header casing are ignored on read.

use serde::{Deserialize, Serialize};

use crate::core::error::{VocabError, VocabResult};
use crate::core::sanitizer::sanitize_field;

/// Canonical column names, in order.
pub const CANONICAL_COLUMNS: [&str; 3] = ["word", "translation", "example"];

/// Optional trailing column holding the recognition flag.
pub const RECOGNIZED_COLUMN: &str = "recognized";

/// Field delimiter of the canonical layout.
pub const DELIMITER: u8 = b',';

/// Delimiter of the legacy headerless layouts.
pub const LEGACY_DELIMITER: char = '\t';

/// UTF-8 byte-order mark.
pub const BOM: char = '\u{feff}';

/// One vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyRecord {
    /// The entry key; unique within a pair's file.
    pub word: String,
    /// Translation, or a short definition in definition mode. Empty until processed.
    pub translation: String,
    /// Example sentence. Empty until processed.
    pub example: String,
    /// Set when the word came from automatic recognition rather than user entry.
    #[serde(default)]
    pub recognized: bool,
}

impl VocabularyRecord {
    /// A freshly added word with no translation yet.
    pub fn pending(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            translation: String::new(),
            example: String::new(),
            recognized: false,
        }
    }

    /// A fully processed record.
    pub fn translated(
        word: impl Into<String>,
        translation: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            translation: translation.into(),
            example: example.into(),
            recognized: false,
        }
    }

    /// True while the record still waits for a translation.
    pub fn is_pending(&self) -> bool {
        self.translation.is_empty()
    }
}

/// Layout a piece of content was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatVersion {
    /// No records and no header.
    Empty,
    /// Canonical headered, comma-delimited layout.
    Csv,
    /// Three comma-delimited columns without a header.
    HeaderlessCsv,
    /// Legacy tab-delimited `word, translation, example`.
    #[serde(rename = "tsv-3col")]
    Tsv3,
    /// Legacy tab-delimited `original, recognized, translation, example`.
    #[serde(rename = "tsv-4col")]
    Tsv4,
    /// Matches no known layout.
    Unknown,
}

impl FormatVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatVersion::Empty => "empty",
            FormatVersion::Csv => "csv",
            FormatVersion::HeaderlessCsv => "headerless-csv",
            FormatVersion::Tsv3 => "tsv-3col",
            FormatVersion::Tsv4 => "tsv-4col",
            FormatVersion::Unknown => "unknown",
        }
    }

    /// Content in this layout can be used without migration.
    pub fn is_canonical(&self) -> bool {
        matches!(self, FormatVersion::Empty | FormatVersion::Csv)
    }

    /// Content in this layout must be migrated before use.
    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            FormatVersion::HeaderlessCsv | FormatVersion::Tsv3 | FormatVersion::Tsv4
        )
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A record together with the 1-based line it starts on in its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub line: u64,
    pub record: VocabularyRecord,
}

/// Typed contents of a vocabulary file, tagged with the layout it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyTable {
    pub version: FormatVersion,
    /// The header carries the trailing `recognized` column.
    pub recognized_column: bool,
    pub entries: Vec<TableEntry>,
}

impl VocabularyTable {
    pub fn empty() -> Self {
        Self {
            version: FormatVersion::Empty,
            recognized_column: false,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines on which `word` appears (exact, case-sensitive match).
    pub fn lines_of(&self, word: &str) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|e| e.record.word == word)
            .map(|e| e.line)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &VocabularyRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn into_records(self) -> Vec<VocabularyRecord> {
        self.entries.into_iter().map(|e| e.record).collect()
    }
}

/// Match a first row against the canonical header.
///
/// Returns `Some(true)` when the optional `recognized` column is present,
/// `Some(false)` for the plain three-column header and `None` when the row
/// is not a header. Comparison ignores case, surrounding whitespace and a
/// byte-order mark on the first field.
pub fn match_header<'a, I>(fields: I) -> Option<bool>
where
    I: IntoIterator<Item = &'a str>,
{
    let fields: Vec<&str> = fields
        .into_iter()
        .enumerate()
        .map(|(i, f)| if i == 0 { f.trim_start_matches(BOM) } else { f })
        .map(str::trim)
        .collect();

    if fields.len() < CANONICAL_COLUMNS.len() || fields.len() > CANONICAL_COLUMNS.len() + 1 {
        return None;
    }

    let base_matches = CANONICAL_COLUMNS
        .iter()
        .zip(&fields)
        .all(|(expected, actual)| actual.eq_ignore_ascii_case(expected));
    if !base_matches {
        return None;
    }

    match fields.get(CANONICAL_COLUMNS.len()) {
        None => Some(false),
        Some(extra) if extra.eq_ignore_ascii_case(RECOGNIZED_COLUMN) => Some(true),
        Some(_) => None,
    }
}

/// Header row of a file holding `records`.
pub fn header_for(records: &[VocabularyRecord]) -> Vec<&'static str> {
    let mut header = CANONICAL_COLUMNS.to_vec();
    if records.iter().any(|r| r.recognized) {
        header.push(RECOGNIZED_COLUMN);
    }
    header
}

/// Render a complete canonical file: header plus sanitized rows.
pub fn render_table(records: &[VocabularyRecord]) -> VocabResult<String> {
    let header = header_for(records);
    let with_recognized = header.len() > CANONICAL_COLUMNS.len();

    let mut writer = new_writer();
    writer.write_record(&header).map_err(csv_write_error)?;
    for record in records {
        writer
            .write_record(row_fields(record, with_recognized))
            .map_err(csv_write_error)?;
    }
    finish(writer)
}

/// Render a single row for appending to a file whose header is already known.
pub fn render_row(record: &VocabularyRecord, with_recognized: bool) -> VocabResult<String> {
    let mut writer = new_writer();
    writer
        .write_record(row_fields(record, with_recognized))
        .map_err(csv_write_error)?;
    finish(writer)
}

fn row_fields(record: &VocabularyRecord, with_recognized: bool) -> Vec<String> {
    let mut fields = vec![
        sanitize_field(&record.word).into_owned(),
        sanitize_field(&record.translation).into_owned(),
        sanitize_field(&record.example).into_owned(),
    ];
    if with_recognized {
        fields.push(if record.recognized { "true" } else { "" }.to_string());
    }
    fields
}

fn new_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> VocabResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| csv_write_error(csv::Error::from(e.into_error())))?;
    String::from_utf8(bytes).map_err(|e| VocabError::invalid_record(0, e.to_string()))
}

fn csv_write_error(err: csv::Error) -> VocabError {
    VocabError::invalid_record(0, format!("cannot encode record: {err}"))
}
