//! [`SandboxRuntime`] backed by the `docker` command-line client.
//!
//! Any engine with a docker-compatible CLI (podman, nerdctl) works by
//! pointing `PENGUIN_ENGINE` at it.

use std::path::Path;

use super::SandboxRuntime;
use crate::error::{Error, Result};
use crate::process::{Cmd, CommandResult};

#[derive(Debug, Clone)]
pub struct DockerRuntime {
    program: String,
}

impl DockerRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn cmd(&self) -> Cmd {
        Cmd::new(&self.program).allow_fail()
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new("docker")
    }
}

/// Engine messages meaning "there was nothing to remove".
fn is_missing_instance(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such container") || stderr.contains("no container with name")
}

impl SandboxRuntime for DockerRuntime {
    fn build_image(&self, context_dir: &Path, tag: &str) -> Result<CommandResult> {
        self.cmd()
            .args(["build", "-t", tag, "."])
            .dir(context_dir)
            .run()
    }

    fn remove_instance(&self, name: &str) -> Result<()> {
        let result = self.cmd().args(["rm", name]).run()?;
        if result.success() || is_missing_instance(&result.stderr) {
            return Ok(());
        }
        Err(Error::CommandFailed {
            prefix: format!("failed to remove instance {name}"),
            code: result.code(),
            stderr: result.stderr_trimmed().to_string(),
        })
    }

    fn run_instance(&self, tag: &str, name: &str) -> Result<CommandResult> {
        self.cmd()
            .args(["run", "--name", name, "-t", tag, "/bin/true"])
            .run()
    }

    fn copy_from_instance(&self, name: &str, src: &str, dest: &Path) -> Result<CommandResult> {
        self.cmd()
            .arg("cp")
            .arg(format!("{name}:{src}"))
            .arg_path(dest)
            .run()
    }

    fn create_instance(&self, image: &str, name: &str) -> Result<CommandResult> {
        self.cmd()
            .args(["create", "--name", name, "-t", image])
            .run()
    }

    fn export_instance(&self, name: &str, dest: &Path) -> Result<CommandResult> {
        self.cmd()
            .arg("export")
            .arg(format!("--output={}", dest.display()))
            .arg(name)
            .run()
    }

    fn inspect_image(&self, image: &str) -> Result<CommandResult> {
        self.cmd().args(["image", "inspect", image]).run()
    }
}
