//! Language pairs and the file names derived from them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{VocabError, VocabResult};
use crate::core::paths::validate_pair_name;

/// A (learn, mother) language tuple identifying one vocabulary file.
///
/// Both names are validated and lowercased on construction, so they are always
/// safe to embed in file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    learn: String,
    mother: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_deck_name: Option<String>,
}

impl LanguagePair {
    pub fn new(learn: &str, mother: &str) -> VocabResult<Self> {
        Ok(Self {
            learn: validate_pair_name(learn)?,
            mother: validate_pair_name(mother)?,
            custom_deck_name: None,
        })
    }

    /// Parse `"learn:mother"`.
    pub fn parse(spec: &str) -> VocabResult<Self> {
        let mut parts = spec.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(learn), Some(mother), None) => Self::new(learn, mother),
            _ => Err(VocabError::invalid_name(
                spec,
                "expected the form 'learn:mother' with exactly one ':'",
            )),
        }
    }

    /// Attach a deck name that overrides the derived one.
    pub fn with_deck_name(mut self, name: Option<String>) -> Self {
        self.custom_deck_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn learn(&self) -> &str {
        &self.learn
    }

    pub fn mother(&self) -> &str {
        &self.mother
    }

    pub fn custom_deck_name(&self) -> Option<&str> {
        self.custom_deck_name.as_deref()
    }

    /// Both languages are the same; records hold definitions instead of translations.
    pub fn is_definition_mode(&self) -> bool {
        self.learn == self.mother
    }

    /// `learn-mother`, the namespace used in file names.
    pub fn key(&self) -> String {
        format!("{}-{}", self.learn, self.mother)
    }

    pub fn vocabulary_file_name(&self) -> String {
        format!("vocab_list_{}.csv", self.key())
    }

    pub fn anki_file_name(&self) -> String {
        format!("anki_deck_{}.csv", self.key())
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.learn, self.mother)
    }
}

/// Resolved on-disk locations for one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub vocabulary: PathBuf,
    pub anki_export: PathBuf,
}
