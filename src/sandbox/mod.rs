//! Sandboxed recipe builds.
//!
//! The container engine is an external collaborator behind the
//! [`SandboxRuntime`] trait. [`Executor`] drives one recipe through it:
//!
//! ```text
//! BuildSpec ─► build context ─► build_image ─► run_instance ─► copy outputs ─► remove
//!                (tempdir)        (tag)          (name)          (root tree)
//! ```
//!
//! At most one instance per recipe exists at any time: a stale instance with
//! the same name is removed before running, and [`InstanceGuard`] removes the
//! instance again on every exit path.

pub mod docker;
pub mod executor;

pub use docker::DockerRuntime;
pub use executor::{BuildOutcome, Executor};

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::process::CommandResult;

/// Operations the build pipeline needs from a container engine.
///
/// Calls block until the engine returns. A non-zero exit is reported in the
/// returned [`CommandResult`], not as an `Err`; `Err` means the engine
/// could not be invoked at all.
pub trait SandboxRuntime {
    /// Build an image from the context directory and tag it.
    fn build_image(&self, context_dir: &Path, tag: &str) -> Result<CommandResult>;

    /// Remove an instance. Removing an instance that does not exist succeeds.
    fn remove_instance(&self, name: &str) -> Result<()>;

    /// Create an instance of `tag` named `name` and run it to completion.
    fn run_instance(&self, tag: &str, name: &str) -> Result<CommandResult>;

    /// Copy `src` out of a finished instance to `dest` on the host.
    fn copy_from_instance(&self, name: &str, src: &str, dest: &Path) -> Result<CommandResult>;

    /// Create (without starting) an instance of an existing image.
    fn create_instance(&self, image: &str, name: &str) -> Result<CommandResult>;

    /// Export an instance's filesystem as a tarball at `dest`.
    fn export_instance(&self, name: &str, dest: &Path) -> Result<CommandResult>;

    /// Image metadata as the engine's JSON.
    fn inspect_image(&self, image: &str) -> Result<CommandResult>;
}

/// Removes a sandbox instance when dropped.
///
/// [`InstanceGuard::finish`] removes it explicitly and reports failures;
/// dropping the guard without finishing removes it best-effort and ignores
/// errors, which covers early returns after a failed run.
pub struct InstanceGuard<'a, R: SandboxRuntime + ?Sized> {
    runtime: &'a R,
    name: String,
    armed: bool,
}

impl<'a, R: SandboxRuntime + ?Sized> InstanceGuard<'a, R> {
    pub fn new(runtime: &'a R, name: impl Into<String>) -> Self {
        Self {
            runtime,
            name: name.into(),
            armed: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the instance now, propagating any engine failure.
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.runtime.remove_instance(&self.name)
    }
}

impl<R: SandboxRuntime + ?Sized> Drop for InstanceGuard<'_, R> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.runtime.remove_instance(&self.name) {
                debug!(instance = %self.name, error = %e, "ignoring cleanup failure");
            }
        }
    }
}
