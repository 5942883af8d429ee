use std::process::ExitCode;

use clap::{Parser, Subcommand};

use vocabmaster::config::AppConfig;
use vocabmaster::core::backup::{
    CheckStatus, RestoreCriteria, SnapshotFilter, SnapshotReason, ValidateTarget,
};
use vocabmaster::core::vocabulary::VocabularyStore;
use vocabmaster::core::VocabError;

#[derive(Parser, Debug)]
#[command(name = "vocabmaster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-language-pair vocabulary store with checksummed backups")]
struct Cli {
    /// Language pair as learn:mother (defaults to `default_pair` from the config)
    #[arg(short, long, global = true, value_name = "LEARN:MOTHER")]
    pair: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add words to the pair's vocabulary
    Add {
        #[arg(required = true, value_name = "WORD")]
        words: Vec<String>,
    },

    /// List words still waiting for a translation
    Pending,

    /// List all records
    List,

    /// Take a manual backup of the pair's vocabulary
    Snapshot,

    /// List backups, newest first
    Backups {
        /// Show backups of every pair
        #[arg(long)]
        all: bool,
    },

    /// Restore the latest backup of the pair, or a backup by id
    Restore {
        #[arg(long, value_name = "ID")]
        id: Option<u64>,
    },

    /// Verify backup checksums
    Validate {
        #[arg(long, value_name = "ID")]
        id: Option<u64>,
    },

    /// Back up, then delete the pair's files
    Remove,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard =
        vocabmaster::core::logging::init(&vocabmaster::core::logging::default_log_dir());
    log::info!("VocabMaster v{} starting", vocabmaster::VERSION);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<(), VocabError> {
    let config = AppConfig::load();
    let store = VocabularyStore::new(config.context()?);
    let backups = store.backups();
    let pair_arg = cli.pair.as_deref();

    match cli.command {
        Commands::Add { words } => {
            let pair = config.resolve_pair(pair_arg)?;
            for word in &words {
                match store.add_record(&pair, word) {
                    Ok(record) => println!("added '{}' to {pair}", record.word),
                    Err(VocabError::DuplicateWord { word, lines }) => {
                        println!("'{word}' already present (line {lines:?}), skipped");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Commands::Pending => {
            let pair = config.resolve_pair(pair_arg)?;
            for record in &store.get_words_pending_translation(&pair)? {
                println!("{}", record.word);
            }
        }
        Commands::List => {
            let pair = config.resolve_pair(pair_arg)?;
            for record in store.records(&pair)? {
                println!("{}\t{}\t{}", record.word, record.translation, record.example);
            }
        }
        Commands::Snapshot => {
            let pair = config.resolve_pair(pair_arg)?;
            let path = store.paths(&pair)?.vocabulary;
            match backups.create_snapshot(&path, SnapshotReason::Manual)? {
                Some(record) => println!("backup #{} created", record.id),
                None => println!("nothing to back up for {pair}"),
            }
        }
        Commands::Backups { all } => {
            let pair = if all {
                None
            } else {
                Some(config.resolve_pair(pair_arg)?)
            };
            let filter = match &pair {
                Some(pair) => SnapshotFilter::Pair(pair),
                None => SnapshotFilter::All,
            };
            for record in backups.list_snapshots(filter)? {
                println!(
                    "#{:<4} {}  {:<18} {:<14} {:>8} B  {}",
                    record.id,
                    record.timestamp_utc.format("%Y-%m-%d %H:%M:%S"),
                    record.reason,
                    record.format_version,
                    record.size_bytes,
                    record.source_file_path.display()
                );
            }
        }
        Commands::Restore { id } => {
            let outcome = match id {
                Some(id) => backups.restore(RestoreCriteria::ById(id))?,
                None => {
                    let pair = config.resolve_pair(pair_arg)?;
                    let path = store.paths(&pair)?.vocabulary;
                    backups.restore(RestoreCriteria::Latest { source: &path })?
                }
            };
            println!(
                "restored backup #{} into {}",
                outcome.restored.id,
                outcome.restored.source_file_path.display()
            );
            if let Some(pre) = outcome.pre_restore {
                println!("previous content saved as backup #{}", pre.id);
            }
        }
        Commands::Validate { id } => {
            let target = match id {
                Some(id) => ValidateTarget::ById(id),
                None => ValidateTarget::All,
            };
            let report = backups.validate(target)?;
            for check in report.failures() {
                match &check.status {
                    CheckStatus::Mismatch { actual } => println!(
                        "#{} checksum mismatch: expected {}, found {actual}",
                        check.record.id, check.record.checksum
                    ),
                    CheckStatus::Missing => println!("#{} backup file missing", check.record.id),
                    CheckStatus::Valid => {}
                }
            }
            println!(
                "{} backups checked: {} valid, {} invalid",
                report.total, report.valid, report.invalid
            );
        }
        Commands::Remove => {
            let pair = config.resolve_pair(pair_arg)?;
            match store.remove_pair(&pair)? {
                Some(record) => println!("removed {pair}; backup #{} kept", record.id),
                None => println!("removed {pair}"),
            }
        }
    }
    Ok(())
}

/// Input errors exit with 2 (the same code clap uses for usage errors),
/// integrity errors with 3.
fn exit_code(err: &VocabError) -> u8 {
    if err.is_input_error() {
        2
    } else if err.is_integrity_error() {
        3
    } else {
        1
    }
}
