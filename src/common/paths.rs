//! Tree-relative path handling.
//!
//! Recipes declare destinations as absolute-looking paths (`/bin/busybox`).
//! These are always interpreted relative to the root tree and must never
//! resolve outside it.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Convert a declared destination into a path relative to the root tree.
///
/// A single leading `/` is stripped. Anything that could climb out of the
/// tree (`..`, a second leading separator) or names the root itself is
/// rejected.
pub fn tree_relative(declared: &str) -> Result<PathBuf> {
    let stripped = declared.strip_prefix('/').unwrap_or(declared);
    let escapes = || Error::PathEscapesRoot {
        path: declared.to_string(),
    };

    let mut relative = PathBuf::new();
    for component in Path::new(stripped).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escapes())
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(escapes());
    }
    Ok(relative)
}

/// Resolve a declared destination to a path inside `root` and create its
/// parent directories.
///
/// Each parent is checked with `symlink_metadata` on the way down. A
/// symlink already in the tree is never followed, so an earlier link to
/// `/usr/lib` on the host cannot redirect a later write out of the tree.
pub fn prepare_tree_path(root: &Path, declared: &str) -> Result<PathBuf> {
    let relative = tree_relative(declared)?;
    fs::create_dir_all(root).map_err(|e| Error::at(root, e))?;

    let mut dir = root.to_path_buf();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            dir.push(component);
            match fs::symlink_metadata(&dir) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(Error::LinkInPath {
                        path: declared.to_string(),
                        link: dir,
                    })
                }
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => return Err(Error::at(&dir, io::Error::other("not a directory"))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    fs::create_dir(&dir).map_err(|e| Error::at(&dir, e))?
                }
                Err(e) => return Err(Error::at(&dir, e)),
            }
        }
    }

    Ok(root.join(relative))
}

/// Whether `path` is `dir` itself or lies below it.
///
/// Both are made absolute against the current directory and `.`/`..` are
/// resolved lexically, so neither has to exist yet.
pub fn is_within(path: &Path, dir: &Path) -> Result<bool> {
    Ok(normalize(path)?.starts_with(normalize(dir)?))
}

fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Ensure all parent directories of a file exist.
pub fn ensure_parent_exists(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::at(parent, e))?;
    }
    Ok(())
}
