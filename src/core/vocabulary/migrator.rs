//! Format Migrator
//!
//! Reads vocabulary content in any supported layout into a typed
//! [`VocabularyTable`] and rewrites legacy layouts into the canonical schema.
//!
//! Detection order:
//! 1. empty (only whitespace or a BOM)
//! 2. canonical: first row matches the header
//! 3. legacy TSV: every non-blank line has 3 or 4 tab-separated columns
//! 4. legacy headerless CSV: every row has exactly 3 comma-separated columns
//!
//! Anything else is reported as [`VocabError::UnrecognizedFormat`] with the
//! first offending line, never coerced.

use std::borrow::Cow;

use tracing::info;

use super::schema::{
    self, FormatVersion, TableEntry, VocabularyRecord, VocabularyTable, BOM, CANONICAL_COLUMNS,
    DELIMITER, LEGACY_DELIMITER,
};
use crate::core::error::{VocabError, VocabResult};
use crate::core::sanitizer::restore_field;

/// A parsed CSV row and the line it starts on.
struct RawRow {
    line: u64,
    fields: Vec<String>,
}

/// Parse content in any supported layout.
///
/// The returned table's `version` names the layout the content was in.
/// Canonical values are un-escaped for display; legacy values are taken verbatim.
pub fn parse_table(raw: &str) -> VocabResult<VocabularyTable> {
    let content = raw.strip_prefix(BOM).unwrap_or(raw);
    if content.trim().is_empty() {
        return Ok(VocabularyTable::empty());
    }

    let rows = read_rows(content)?;

    if let Some(first) = rows.first() {
        if let Some(with_recognized) = schema::match_header(first.fields.iter().map(String::as_str))
        {
            return parse_canonical(&rows[1..], with_recognized);
        }
    }

    if let Some(table) = parse_legacy_tsv(content)? {
        return Ok(table);
    }

    parse_headerless_csv(&rows)
}

/// Layout of `raw`, or [`FormatVersion::Unknown`] when it matches none.
pub fn detect_format(raw: &str) -> FormatVersion {
    parse_table(raw)
        .map(|table| table.version)
        .unwrap_or(FormatVersion::Unknown)
}

/// Rewrite legacy content into the canonical layout.
///
/// Canonical (and empty) content is returned unchanged, so migrating twice
/// is the same as migrating once.
pub fn migrate(raw: &str) -> VocabResult<Cow<'_, str>> {
    let table = parse_table(raw)?;
    if table.version.is_canonical() {
        return Ok(Cow::Borrowed(raw));
    }

    info!(
        from = %table.version,
        rows = table.len(),
        "Migrating legacy vocabulary content to canonical layout"
    );
    let records = table.into_records();
    Ok(Cow::Owned(schema::render_table(&records)?))
}

fn read_rows(content: &str) -> VocabResult<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(DELIMITER)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            VocabError::unrecognized(line, format!("unreadable row: {e}"))
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(RawRow { line, fields });
    }
    Ok(rows)
}

fn parse_canonical(rows: &[RawRow], with_recognized: bool) -> VocabResult<VocabularyTable> {
    let expected = CANONICAL_COLUMNS.len() + usize::from(with_recognized);
    let mut entries = Vec::with_capacity(rows.len());

    for row in rows {
        let count = row.fields.len();
        // A missing trailing `recognized` cell reads as "not recognized".
        if count != expected && !(with_recognized && count == CANONICAL_COLUMNS.len()) {
            return Err(VocabError::unrecognized(
                row.line,
                format!("expected {expected} columns, found {count}"),
            ));
        }

        let word = restore_field(&row.fields[0]).into_owned();
        if word.trim().is_empty() {
            return Err(VocabError::unrecognized(row.line, "empty word"));
        }

        let recognized = row
            .fields
            .get(CANONICAL_COLUMNS.len())
            .map(|v| parse_flag(v))
            .unwrap_or(false);

        entries.push(TableEntry {
            line: row.line,
            record: VocabularyRecord {
                word,
                translation: restore_field(&row.fields[1]).into_owned(),
                example: restore_field(&row.fields[2]).into_owned(),
                recognized,
            },
        });
    }

    Ok(VocabularyTable {
        version: FormatVersion::Csv,
        recognized_column: with_recognized,
        entries,
    })
}

/// `Ok(None)` when the content is not tab-delimited at all.
fn parse_legacy_tsv(content: &str) -> VocabResult<Option<VocabularyTable>> {
    let mut entries = Vec::new();
    let mut saw_four_columns = false;

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index as u64 + 1;
        let parts: Vec<&str> = line.split(LEGACY_DELIMITER).collect();

        let record = match parts.as_slice() {
            [word, translation, example] => {
                VocabularyRecord::translated(*word, *translation, *example)
            }
            [original, recognized, translation, example] => {
                saw_four_columns = true;
                VocabularyRecord {
                    word: recognized.to_string(),
                    translation: translation.to_string(),
                    example: example.to_string(),
                    recognized: original != recognized,
                }
            }
            _ => return Ok(None),
        };

        if record.word.trim().is_empty() {
            return Err(VocabError::unrecognized(line_no, "empty word"));
        }
        entries.push(TableEntry {
            line: line_no,
            record,
        });
    }

    if entries.is_empty() {
        return Ok(None);
    }

    let version = if saw_four_columns {
        FormatVersion::Tsv4
    } else {
        FormatVersion::Tsv3
    };
    Ok(Some(VocabularyTable {
        version,
        recognized_column: false,
        entries,
    }))
}

fn parse_headerless_csv(rows: &[RawRow]) -> VocabResult<VocabularyTable> {
    let columns = CANONICAL_COLUMNS.len();
    if let Some(bad) = rows.iter().find(|r| r.fields.len() != columns) {
        return Err(VocabError::unrecognized(
            bad.line,
            format!(
                "no header row and not a legacy layout: expected {columns} columns, found {}",
                bad.fields.len()
            ),
        ));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        if row.fields[0].trim().is_empty() {
            return Err(VocabError::unrecognized(row.line, "empty word"));
        }
        entries.push(TableEntry {
            line: row.line,
            record: VocabularyRecord::translated(
                row.fields[0].as_str(),
                row.fields[1].as_str(),
                row.fields[2].as_str(),
            ),
        });
    }

    Ok(VocabularyTable {
        version: FormatVersion::HeaderlessCsv,
        recognized_column: false,
        entries,
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
