//! Export command - converts a container image into an initramfs.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Error;
use crate::export::export_image;
use crate::preflight;
use crate::sandbox::DockerRuntime;

/// Execute the export command.
pub fn cmd_export(image: &str, outfile: Option<PathBuf>, config: &Config) -> Result<()> {
    let outfile = outfile.ok_or(Error::MissingFlag { flag: "-o" })?;
    let engine = preflight::require_engine(config)?;
    let runtime = DockerRuntime::new(engine.to_string_lossy());

    println!("  EXPORT  {}", image);
    let summary = export_image(&runtime, image, &outfile, &config.image_prefix)?;
    println!("    CPIO  {}", outfile.display());
    for warning in &summary.warnings {
        println!("  [WARN] {}", warning);
    }

    println!(
        "Wrote {} ({} entries, {} bytes)",
        outfile.display(),
        summary.entries,
        summary.bytes
    );
    Ok(())
}
