//! Sandbox executor: builds one recipe and copies its outputs into the root tree.
//!
//! There is no partial success. A failed image build, a failed run, or a
//! single missing output aborts the recipe, and with it the whole build.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use super::{InstanceGuard, SandboxRuntime};
use crate::common::{disk_usage, prepare_tree_path};
use crate::error::{Error, Result};
use crate::recipe::spec::BUILD_ROOT;
use crate::recipe::{BuildSpec, Recipe};

/// What a finished recipe hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub name: String,
    /// Bytes copied out of the sandbox into the root tree.
    pub bytes_copied: u64,
    /// Symlink declarations to merge into the global table.
    pub symlinks: BTreeMap<String, String>,
}

pub struct Executor<'a, R: SandboxRuntime + ?Sized> {
    runtime: &'a R,
    root: &'a Path,
    prefix: &'a str,
}

impl<'a, R: SandboxRuntime + ?Sized> Executor<'a, R> {
    /// `root` is the shared root tree; `prefix` namespaces image tags and
    /// instance names.
    pub fn new(runtime: &'a R, root: &'a Path, prefix: &'a str) -> Self {
        Self {
            runtime,
            root,
            prefix,
        }
    }

    pub fn image_tag(&self, recipe: &str) -> String {
        format!("{}-{}", self.prefix, recipe)
    }

    pub fn instance_name(&self, recipe: &str) -> String {
        format!("{}-{}-container", self.prefix, recipe)
    }

    /// Generate the recipe's spec and run it.
    pub fn build(&self, recipe: &Recipe) -> Result<BuildOutcome> {
        let spec = BuildSpec::generate(recipe)?;
        self.run(recipe, &spec)
    }

    /// Run an already generated spec for `recipe`.
    pub fn run(&self, recipe: &Recipe, spec: &BuildSpec) -> Result<BuildOutcome> {
        let name = recipe.name();
        let tag = self.image_tag(name);
        let instance = self.instance_name(name);

        // The build context only has to live until the image is built.
        {
            let context = tempfile::Builder::new()
                .prefix(&format!("{}-{}-", self.prefix, name))
                .tempdir()?;
            spec.write_to(context.path())?;

            let built = self.runtime.build_image(context.path(), &tag)?;
            if !built.success() {
                return Err(Error::SandboxBuild {
                    recipe: name.to_string(),
                    output: built.combined(),
                });
            }
        }

        if let Err(e) = self.runtime.remove_instance(&instance) {
            debug!(instance = %instance, error = %e, "could not remove stale instance");
        }

        let guard = InstanceGuard::new(self.runtime, instance);
        let ran = self.runtime.run_instance(&tag, guard.name())?;
        if !ran.success() {
            return Err(Error::SandboxBuild {
                recipe: name.to_string(),
                output: ran.combined(),
            });
        }

        let bytes_copied = self.copy_outputs(recipe, guard.name())?;
        guard.finish()?;

        info!(recipe = name, bytes = bytes_copied, "recipe built");
        Ok(BuildOutcome {
            name: name.to_string(),
            bytes_copied,
            symlinks: recipe.symlinks().clone(),
        })
    }

    fn copy_outputs(&self, recipe: &Recipe, instance: &str) -> Result<u64> {
        let mut total = 0;

        for (dest, src) in recipe.outputs() {
            let dest_path = prepare_tree_path(self.root, dest)?;
            if dest_path.is_symlink() {
                return Err(Error::LinkInPath {
                    path: dest.clone(),
                    link: dest_path,
                });
            }

            let src = if src.starts_with('/') {
                src.clone()
            } else {
                format!("{BUILD_ROOT}/{src}")
            };

            let missing = |detail: String| Error::OutputMissing {
                recipe: recipe.name().to_string(),
                path: src.clone(),
                detail,
            };

            let copied = self
                .runtime
                .copy_from_instance(instance, &src, &dest_path)?;
            if !copied.success() {
                return Err(missing(copied.combined().trim().to_string()));
            }
            if dest_path.symlink_metadata().is_err() {
                return Err(missing("nothing was copied".to_string()));
            }

            let size = disk_usage(&dest_path)?;
            debug!(recipe = recipe.name(), src = %src, dest = %dest, size, "copied output");
            total += size;
        }

        Ok(total)
    }
}
