//! Atomic file replacement.
//!
//! All writes go to a temporary file in the target's own directory, are
//! flushed and synced, and are then renamed over the target. Readers see
//! either the old file or the new one, never a partial write. A temporary
//! file left behind by a crash is named `.vocab_*.tmp` and is harmless.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use super::error::{VocabError, VocabResult};

/// Prefix of temporary files created next to the target.
pub const TEMP_PREFIX: &str = ".vocab_";
/// Suffix of temporary files created next to the target.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Atomically replace `target` with `contents`.
pub fn atomic_write(target: &Path, contents: &[u8]) -> VocabResult<()> {
    atomic_write_with(target, |file| file.write_all(contents))
}

/// Atomically replace `target` with whatever `write` produces.
///
/// If `write` fails, or any step before the rename completes fails, the
/// temporary file is removed and `target` keeps its previous content.
pub fn atomic_write_with<F>(target: &Path, write: F) -> VocabResult<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| VocabError::persistence(dir, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| VocabError::persistence(dir, e))?;

    write(temp.as_file_mut()).map_err(|e| VocabError::persistence(target, e))?;
    temp.as_file_mut()
        .flush()
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| VocabError::persistence(target, e))?;

    // On failure `PersistError` hands the temp file back; dropping it deletes it.
    temp.persist(target)
        .map_err(|e| VocabError::persistence(target, e.error))?;

    sync_directory(dir);
    debug!(path = %target.display(), "Atomically replaced file");
    Ok(())
}

/// Make the rename itself durable. Not supported on every platform, so
/// failures are only logged.
fn sync_directory(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            debug!(dir = %dir.display(), "Directory sync skipped: {}", e);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
