//! Build orchestrator.
//!
//! One run, strictly sequential:
//!
//! ```text
//! instantiate registry ─► build phases + specs ─► reset build dir
//!     ─► for each recipe: sandbox build, copy outputs, merge symlinks
//!     ─► materialize symlinks ─► archive
//! ```
//!
//! Every spec is generated before the first sandbox starts, so a bad
//! declaration in the last recipe fails the run without building anything.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::artifact::{write_initramfs, ArchiveSummary};
use crate::assembler::Assembler;
use crate::common::{is_within, reset_dir};
use crate::error::{Error, Result};
use crate::recipe::{BuildSpec, Recipe, Registry};
use crate::sandbox::{Executor, SandboxRuntime};
use crate::timing::Timer;

/// Where to build and what to write.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Holds the root tree. Emptied at the start of every run.
    pub build_dir: PathBuf,
    /// Archive destination.
    pub outfile: PathBuf,
    /// Namespace for image tags and instance names.
    pub image_prefix: String,
}

/// Totals reported after a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Recipe names, in build order.
    pub recipes: Vec<String>,
    pub bytes_copied: u64,
    pub symlinks: usize,
    pub archive: ArchiveSummary,
}

impl BuildSummary {
    pub fn print(&self, outfile: &Path) {
        println!();
        println!(
            "Built {} recipes ({} bytes copied, {} symlinks)",
            self.recipes.len(),
            self.bytes_copied,
            self.symlinks
        );
        println!(
            "Wrote {} ({} entries, {} bytes)",
            outfile.display(),
            self.archive.entries,
            self.archive.bytes
        );
    }
}

/// Run every build phase and generate every spec, in registry order.
pub fn plan(registry: &Registry) -> Result<Vec<(Recipe, BuildSpec)>> {
    registry
        .instantiate()?
        .into_iter()
        .map(|prepared| {
            let recipe = prepared.into_built();
            let spec = BuildSpec::generate(&recipe)?;
            Ok((recipe, spec))
        })
        .collect()
}

/// Build every registered recipe and write the archive.
pub fn build_initramfs<R: SandboxRuntime + ?Sized>(
    registry: &Registry,
    runtime: &R,
    options: &BuildOptions,
) -> Result<BuildSummary> {
    // The tree is emptied at the start of every run and archived whole.
    if is_within(&options.outfile, &options.build_dir)? {
        return Err(Error::OutfileInBuildDir {
            outfile: options.outfile.clone(),
            build_dir: options.build_dir.clone(),
        });
    }

    let planned = plan(registry)?;

    let root = reset_dir(&options.build_dir)?;
    let executor = Executor::new(runtime, &root, &options.image_prefix);
    let mut assembler = Assembler::new(&root);
    let mut recipes = Vec::with_capacity(planned.len());
    let mut bytes_copied = 0;

    for (recipe, spec) in &planned {
        println!("  DOCKER  {}", recipe.name());
        let timer = Timer::start(recipe.name());
        let outcome = executor.run(recipe, spec)?;
        timer.finish();

        bytes_copied += outcome.bytes_copied;
        assembler.merge_outputs(&outcome);
        recipes.push(outcome.name);
    }

    let tree = assembler.materialize_symlinks()?;

    println!("    CPIO  {}", options.outfile.display());
    let archive = write_initramfs(tree.path(), &options.outfile)?;
    for warning in &archive.warnings {
        println!("  [WARN] {}", warning);
    }

    info!(
        recipes = recipes.len(),
        bytes_copied,
        entries = archive.entries,
        "initramfs written"
    );

    Ok(BuildSummary {
        recipes,
        bytes_copied,
        symlinks: tree.links(),
        archive,
    })
}
