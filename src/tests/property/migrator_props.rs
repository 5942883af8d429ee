//! Property-based tests for the Format Migrator
//!
//! Tests invariants:
//! - Migration is idempotent
//! - Migration preserves records and their order
//! - Rendered canonical tables parse back to the same records

use proptest::prelude::*;

use crate::core::vocabulary::schema::render_table;
use crate::core::vocabulary::{migrate, parse_table, FormatVersion, VocabularyRecord};

// ============================================================================
// Strategies for generating test inputs
// ============================================================================

fn arb_word() -> impl Strategy<Value = String> {
    "[a-z][a-z=+'@ -]{0,12}"
}

/// Field text for legacy rows: no tabs or line breaks.
fn arb_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.'=+@-]{0,20}"
}

fn arb_record() -> impl Strategy<Value = VocabularyRecord> {
    (arb_word(), arb_value(), arb_value())
        .prop_map(|(word, translation, example)| {
            VocabularyRecord::translated(word, translation, example)
        })
}

fn arb_records() -> impl Strategy<Value = Vec<VocabularyRecord>> {
    prop::collection::vec(arb_record(), 1..12)
}

fn to_legacy_tsv(records: &[VocabularyRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{}\t{}\t{}\n", r.word, r.translation, r.example))
        .collect()
}

proptest! {
    /// Property: migrating twice equals migrating once
    #[test]
    fn prop_migration_idempotent(records in arb_records()) {
        let raw = to_legacy_tsv(&records);
        let once = migrate(&raw).unwrap().into_owned();
        let twice = migrate(&once).unwrap().into_owned();
        prop_assert_eq!(once, twice);
    }

    /// Property: legacy rows come out as the same records, in order
    #[test]
    fn prop_migration_preserves_records(records in arb_records()) {
        let raw = to_legacy_tsv(&records);
        prop_assert_eq!(parse_table(&raw).unwrap().version, FormatVersion::Tsv3);

        let migrated = migrate(&raw).unwrap();
        let table = parse_table(&migrated).unwrap();
        prop_assert_eq!(table.version, FormatVersion::Csv);
        prop_assert_eq!(table.into_records(), records);
    }

    /// Property: canonical content renders and parses back unchanged
    #[test]
    fn prop_canonical_round_trip(records in arb_records()) {
        let rendered = render_table(&records).unwrap();
        let table = parse_table(&rendered).unwrap();
        prop_assert_eq!(table.into_records(), records);
        prop_assert_eq!(migrate(&rendered).unwrap(), rendered.as_str());
    }
}
