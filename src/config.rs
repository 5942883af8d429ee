use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::backup::{RetentionPolicy, DEFAULT_MAX_SNAPSHOTS};
use crate::core::context::StoreContext;
use crate::core::error::{VocabError, VocabResult};
use crate::core::vocabulary::LanguagePair;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pair used when a command names none, as `"learn:mother"`.
    pub default_pair: Option<String>,
    pub data: DataConfig,
    pub backup: BackupConfig,
    /// Configured language pairs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<PairConfig>,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Backup retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Snapshots kept per vocabulary file.
    pub max_snapshots: usize,
    /// Snapshots older than this many days are pruned.
    pub max_age_days: Option<u32>,
}

/// One configured language pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairConfig {
    pub learn: String,
    pub mother: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_name: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            max_age_days: None,
        }
    }
}

impl BackupConfig {
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_snapshots: self.max_snapshots,
            max_age: self
                .max_age_days
                .map(|days| chrono::Duration::days(i64::from(days))),
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/vocabmaster/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}; using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}; using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("vocabmaster"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Validate the data directory against the user's home and build the
    /// context handed to the store.
    pub fn context(&self) -> VocabResult<StoreContext> {
        let home = dirs::home_dir()
            .ok_or_else(|| VocabError::invalid_path("~", "home directory is unknown"))?;
        self.context_in(&home)
    }

    /// Same as [`AppConfig::context`] with an explicit home directory.
    pub fn context_in(&self, home: &Path) -> VocabResult<StoreContext> {
        Ok(StoreContext::new(&self.data_dir(), home)?.with_retention(self.backup.retention()))
    }

    /// Resolve `"learn:mother"`, or the default pair when `spec` is `None`.
    ///
    /// A configured deck name for the pair is attached.
    pub fn resolve_pair(&self, spec: Option<&str>) -> VocabResult<LanguagePair> {
        let spec = match spec.or(self.default_pair.as_deref()) {
            Some(spec) => spec,
            None => {
                return Err(VocabError::invalid_name(
                    "",
                    "no language pair given and no default_pair configured",
                ))
            }
        };
        let pair = LanguagePair::parse(spec)?;

        let deck_name = self
            .pairs
            .iter()
            .find(|p| {
                p.learn.eq_ignore_ascii_case(pair.learn())
                    && p.mother.eq_ignore_ascii_case(pair.mother())
            })
            .and_then(|p| p.deck_name.clone());
        Ok(pair.with_deck_name(deck_name))
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("vocabmaster").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
