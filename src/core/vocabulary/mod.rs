//! Vocabulary records, their file layout and the per-pair store.

pub mod migrator;
pub mod pair;
pub mod schema;
pub mod store;

pub use migrator::{detect_format, migrate, parse_table};
pub use pair::{LanguagePair, StoragePaths};
pub use schema::{FormatVersion, TableEntry, VocabularyRecord, VocabularyTable};
pub use store::{PendingTranslations, VocabularyStore};
