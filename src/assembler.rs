//! Filesystem assembler: the root tree and the global symlink table.
//!
//! Recipes only copy regular outputs into the tree while they run. Their
//! symlink declarations are collected here and materialized once, after the
//! last recipe, so a link may point at a file a later recipe produces (or at
//! one that only exists at boot time).

use std::collections::BTreeMap;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::prepare_tree_path;
use crate::error::{Error, Result};
use crate::sandbox::BuildOutcome;

pub struct Assembler {
    root: PathBuf,
    symlinks: BTreeMap<String, String>,
}

impl Assembler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            symlinks: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn symlinks(&self) -> &BTreeMap<String, String> {
        &self.symlinks
    }

    /// Merge a finished recipe's symlink declarations. Last writer wins.
    pub fn merge_outputs(&mut self, outcome: &BuildOutcome) {
        for (link, target) in &outcome.symlinks {
            if let Some(previous) = self.symlinks.insert(link.clone(), target.clone()) {
                if previous != *target {
                    debug!(
                        link = %link,
                        previous = %previous,
                        target = %target,
                        recipe = %outcome.name,
                        "symlink redeclared"
                    );
                }
            }
        }
    }

    /// Create every collected symlink in the root tree.
    ///
    /// Consumes the assembler, so it can only happen once. Targets are
    /// stored verbatim and never checked for existence, but no link is ever
    /// created through another one.
    pub fn materialize_symlinks(self) -> Result<MaterializedTree> {
        for (link, target) in &self.symlinks {
            let path = prepare_tree_path(&self.root, link)?;
            symlink(target, &path).map_err(|e| Error::at(&path, e))?;
        }

        Ok(MaterializedTree {
            root: self.root,
            links: self.symlinks.len(),
        })
    }
}

/// A root tree whose outputs and symlinks are all in place.
#[derive(Debug)]
pub struct MaterializedTree {
    root: PathBuf,
    links: usize,
}

impl MaterializedTree {
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Number of symlinks created.
    pub fn links(&self) -> usize {
        self.links
    }
}
