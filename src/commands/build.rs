//! Build command - builds every registered recipe into one archive.

use anyhow::Result;
use std::path::PathBuf;

use crate::build::{build_initramfs, BuildOptions};
use crate::config::Config;
use crate::error::Error;
use crate::packages;
use crate::preflight;
use crate::sandbox::DockerRuntime;
use crate::timing::Timer;

/// Execute the build command.
///
/// Both paths are required; they are `Option`s so a missing flag is reported
/// as a configuration error rather than a usage message.
pub fn cmd_build(
    build_dir: Option<PathBuf>,
    outfile: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let build_dir = build_dir.ok_or(Error::MissingFlag {
        flag: "--build-dir",
    })?;
    let outfile = outfile.ok_or(Error::MissingFlag { flag: "-o" })?;

    let engine = preflight::require_engine(config)?;
    let runtime = DockerRuntime::new(engine.to_string_lossy());

    let options = BuildOptions {
        build_dir,
        outfile,
        image_prefix: config.image_prefix.clone(),
    };

    let timer = Timer::start("initramfs");
    let summary = build_initramfs(&packages::registry(), &runtime, &options)?;
    timer.finish();

    summary.print(&options.outfile);
    Ok(())
}
