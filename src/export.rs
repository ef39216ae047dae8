//! Turning existing container images into initramfs archives.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::artifact::{write_initramfs, ArchiveSummary};
use crate::common::write_file_with_dirs;
use crate::error::{Error, Result};
use crate::process::Cmd;
use crate::sandbox::{InstanceGuard, SandboxRuntime};

/// Nameserver written over the image's `etc/resolv.conf`, which the engine
/// bind-mounts at run time and exports as whatever the host had.
pub const RESOLV_CONF: &str = "nameserver 1.1.1.1";

/// Name of the temporary instance used by [`export_image`].
pub fn export_instance_name(prefix: &str) -> String {
    format!("{prefix}-export-tmp")
}

/// Export `image`'s filesystem and write it to `outfile` as an archive.
pub fn export_image<R: SandboxRuntime + ?Sized>(
    runtime: &R,
    image: &str,
    outfile: &Path,
    prefix: &str,
) -> Result<ArchiveSummary> {
    let instance = export_instance_name(prefix);
    let failed = |output: String| Error::ImageExport {
        image: image.to_string(),
        output,
    };

    if let Err(e) = runtime.remove_instance(&instance) {
        debug!(instance = %instance, error = %e, "could not remove stale instance");
    }

    let guard = InstanceGuard::new(runtime, instance);
    let created = runtime.create_instance(image, guard.name())?;
    if !created.success() {
        return Err(failed(created.combined()));
    }

    let tarball = tempfile::Builder::new()
        .prefix("penguin-export-")
        .suffix(".tar")
        .tempfile()?;
    let exported = runtime.export_instance(guard.name(), tarball.path())?;
    if !exported.success() {
        return Err(failed(exported.combined()));
    }

    let tree = tempfile::Builder::new()
        .prefix("penguin-export-")
        .tempdir()?;
    Cmd::new("tar")
        .arg("xf")
        .arg_path(tarball.path())
        .dir(tree.path())
        .error_msg(format!("failed to unpack the filesystem of {image}"))
        .run()?;

    override_resolv_conf(tree.path())?;

    let summary = write_initramfs(tree.path(), outfile)?;
    guard.finish()?;

    info!(image, entries = summary.entries, "image exported");
    Ok(summary)
}

fn override_resolv_conf(tree: &Path) -> Result<()> {
    let path = tree.join("etc/resolv.conf");
    // Often a symlink into /run; replace the link, not its target.
    if path.symlink_metadata().is_ok() {
        fs::remove_file(&path).map_err(|e| Error::at(&path, e))?;
    }
    write_file_with_dirs(&path, RESOLV_CONF)
}

#[derive(Deserialize)]
struct ImageInfo {
    #[serde(rename = "Config")]
    config: ImageConfig,
}

#[derive(Deserialize)]
struct ImageConfig {
    #[serde(rename = "Cmd", default)]
    cmd: Option<Vec<String>>,
}

/// The command an image runs by default (`Config.Cmd`), empty when unset.
pub fn image_init_command<R: SandboxRuntime + ?Sized>(runtime: &R, image: &str) -> Result<Vec<String>> {
    let inspected = runtime.inspect_image(image)?;
    if !inspected.success() {
        return Err(Error::CommandFailed {
            prefix: format!("failed to inspect {image}"),
            code: inspected.code(),
            stderr: inspected.combined().trim().to_string(),
        });
    }
    parse_init_command(&inspected.stdout)
}

/// Parse `Config.Cmd` out of `image inspect` JSON.
pub fn parse_init_command(json: &str) -> Result<Vec<String>> {
    let images: Vec<ImageInfo> = serde_json::from_str(json)?;
    Ok(images
        .into_iter()
        .next()
        .and_then(|info| info.config.cmd)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_init_command() {
        let json = r#"[{"Id": "sha256:abc", "Config": {"Env": [], "Cmd": ["python3", "-c", "print('hi')"]}}]"#;
        assert_eq!(
            parse_init_command(json).unwrap(),
            ["python3", "-c", "print('hi')"]
        );
    }

    #[test]
    fn test_parse_null_cmd() {
        let json = r#"[{"Config": {"Cmd": null}}]"#;
        assert!(parse_init_command(json).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_init_command("Error: No such image").is_err());
    }

    #[test]
    fn test_resolv_conf_replaces_symlink() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("etc")).unwrap();
        std::os::unix::fs::symlink("../run/resolv.conf", temp.path().join("etc/resolv.conf"))
            .unwrap();

        override_resolv_conf(temp.path()).unwrap();

        let path = temp.path().join("etc/resolv.conf");
        assert!(!path.is_symlink());
        assert_eq!(fs::read_to_string(path).unwrap(), RESOLV_CONF);
        assert!(!temp.path().join("run").exists());
    }
}
