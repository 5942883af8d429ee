/// VocabMaster - crash-safe vocabulary store
///
/// Core library providing per-language-pair vocabulary files with
/// duplicate detection, legacy format migration, CSV injection protection,
/// atomic writes and checksummed backups with restore.

pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
