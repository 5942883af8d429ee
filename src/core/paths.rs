//! Path & Directory Validation
//!
//! Guards the two places where user-controlled text reaches the filesystem:
//! the configured storage root and the language names that become file names.

use std::path::{Component, Path, PathBuf};

use super::error::{VocabError, VocabResult};

/// Reason reported for every rejected language name.
const NAME_RULE: &str = "language names can only contain letters, digits, '-' and '_'";

/// Resolve `candidate` to an absolute, symlink-free path and require it to
/// live strictly below `expected_home`.
///
/// The candidate does not have to exist yet: its deepest existing ancestor is
/// canonicalized and the remaining components are appended, so a data
/// directory that will be created on first use can still be validated.
/// Containment is checked component by component, never by string prefix.
pub fn validate_data_directory(candidate: &Path, expected_home: &Path) -> VocabResult<PathBuf> {
    let home = expected_home
        .canonicalize()
        .map_err(|e| VocabError::invalid_path(expected_home, format!("cannot resolve: {e}")))?;

    let resolved = resolve_lenient(candidate)?;

    if let Ok(meta) = std::fs::metadata(&resolved) {
        if !meta.is_dir() {
            return Err(VocabError::invalid_path(&resolved, "not a directory"));
        }
    }

    if !is_contained(&resolved, &home) {
        return Err(VocabError::PathTraversal {
            candidate: resolved,
            base: home,
        });
    }

    Ok(resolved)
}

/// Component-wise containment: true when `path` is a strict descendant of `base`.
///
/// `/home/userfoo` is not inside `/home/user`, and `/home/user` is not inside itself.
pub fn is_contained(path: &Path, base: &Path) -> bool {
    path != base && path.starts_with(base)
}

/// Validate a language name used to derive file names and normalize it to lowercase.
pub fn validate_pair_name(name: &str) -> VocabResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(VocabError::invalid_name(name, "name is empty"));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(VocabError::invalid_name(
            name,
            format!("{NAME_RULE} (path separators and '..' are not allowed)"),
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(VocabError::invalid_name(name, NAME_RULE));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Make `path` absolute and resolve symlinks in its existing prefix.
fn resolve_lenient(path: &Path) -> VocabResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| VocabError::invalid_path(path, format!("cannot resolve: {e}")))?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut pending = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(base) => {
                let mut resolved = base;
                for component in pending.iter().rev() {
                    resolved.push(component);
                }
                return Ok(resolved);
            }
            Err(_) => {
                let name = match existing.components().next_back() {
                    Some(Component::Normal(name)) => name.to_os_string(),
                    Some(Component::ParentDir) => {
                        return Err(VocabError::invalid_path(
                            path,
                            "'..' below a directory that does not exist",
                        ));
                    }
                    _ => {
                        return Err(VocabError::invalid_path(path, "no existing ancestor"));
                    }
                };
                pending.push(name);
                existing = match existing.parent() {
                    Some(parent) => parent,
                    None => return Err(VocabError::invalid_path(path, "no existing ancestor")),
                };
            }
        }
    }
}
