//! Build directory lifecycle.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Remove `dir` if it exists and create it fresh and empty.
///
/// Every build starts from an empty root tree, so nothing from a previous
/// run can leak into the next archive. Returns the absolute path of the
/// recreated directory.
pub fn reset_dir(dir: &Path) -> Result<PathBuf> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::at(dir, e)),
    }

    fs::create_dir_all(dir).map_err(|e| Error::at(dir, e))?;
    fs::canonicalize(dir).map_err(|e| Error::at(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reset_removes_previous_contents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build");
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(dir.join("bin/stale"), "old").unwrap();

        let fresh = reset_dir(&dir).unwrap();

        assert!(fresh.is_absolute());
        assert!(fresh.is_dir());
        assert_eq!(fs::read_dir(&fresh).unwrap().count(), 0);
    }

    #[test]
    fn test_reset_creates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/build");
        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
