//! File writes with automatic parent directory creation.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Write a file, creating parent directories as needed.
///
/// Eliminates the common pattern of:
/// ```ignore
/// if let Some(parent) = path.parent() {
///     fs::create_dir_all(parent)?;
/// }
/// fs::write(path, content)?;
/// ```
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    super::ensure_parent_exists(path)?;
    fs::write(path, content).map_err(|e| Error::at(path, e))
}

/// Size in bytes of whatever sits at `path`.
///
/// Directories count the sum of the regular files below them; symlinks count
/// the length of their target string, as they would in an archive.
pub fn disk_usage(path: &Path) -> Result<u64> {
    let meta = fs::symlink_metadata(path).map_err(|e| Error::at(path, e))?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }

    let mut total = 0;
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
