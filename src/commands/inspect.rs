//! Inspect-init command - prints the command an image boots into.

use anyhow::Result;

use crate::config::Config;
use crate::export::image_init_command;
use crate::preflight;
use crate::recipe::shell;
use crate::sandbox::DockerRuntime;

/// Execute the inspect-init command.
pub fn cmd_inspect_init(image: &str, config: &Config) -> Result<()> {
    let engine = preflight::require_engine(config)?;
    let runtime = DockerRuntime::new(engine.to_string_lossy());

    let argv = image_init_command(&runtime, image)?;
    println!("{}", shell::join(&argv));
    Ok(())
}
