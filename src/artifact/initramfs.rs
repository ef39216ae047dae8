//! Archive serializer: root tree in, newc stream out.
//!
//! Entries are named relative to the root with no leading `./`, enumerated
//! depth-first with siblings sorted by name. Ownership is flattened to root
//! and inodes are renumbered from 1 so the archive does not depend on the
//! host that built it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::cpio::{CpioWriter, Header};
use crate::error::{Error, Result};

/// What [`serialize`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Entries written, trailer excluded.
    pub entries: usize,
    /// Total size of the stream.
    pub bytes: u64,
    /// Entries that were skipped, one message each.
    pub warnings: Vec<String>,
}

/// Write every entry under `root` (excluding `root` itself) to `sink`.
pub fn serialize<W: Write>(root: &Path, sink: W) -> Result<ArchiveSummary> {
    let mut writer = CpioWriter::new(sink);
    let mut summary = ArchiveSummary::default();
    let mut ino: u32 = 0;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|_| Error::Archive {
                path: path.to_path_buf(),
                reason: "entry is outside the archived tree".to_string(),
            })?;
        let name = rel.as_os_str().as_bytes();
        let meta = entry.metadata()?;
        let file_type = meta.file_type();

        if file_type.is_socket() {
            let message = format!("skipping socket {}", rel.display());
            warn!("{message}");
            summary.warnings.push(message);
            continue;
        }

        ino += 1;
        let mut header = Header {
            ino,
            mode: meta.mode(),
            uid: 0,
            gid: 0,
            nlink: if file_type.is_dir() { 2 } else { 1 },
            mtime: u32::try_from(meta.mtime().max(0)).unwrap_or(u32::MAX),
            ..Header::default()
        };

        let io_err = |e| Error::at(path, e);

        if file_type.is_dir() {
            writer.append_bytes(name, &header, &[]).map_err(io_err)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(io_err)?;
            writer
                .append_bytes(name, &header, target.as_os_str().as_bytes())
                .map_err(io_err)?;
        } else if file_type.is_file() {
            header.filesize = u32::try_from(meta.len()).map_err(|_| Error::Archive {
                path: path.to_path_buf(),
                reason: format!("{} bytes exceeds the 32-bit size field", meta.len()),
            })?;
            let mut file = File::open(path).map_err(io_err)?;
            writer.append(name, &header, &mut file).map_err(io_err)?;
        } else {
            // Block and character devices, fifos.
            let rdev = meta.rdev();
            header.rdevmajor = major(rdev);
            header.rdevminor = minor(rdev);
            writer.append_bytes(name, &header, &[]).map_err(io_err)?;
        }

        debug!(entry = %rel.display(), ino, "archived");
        summary.entries += 1;
    }

    summary.bytes = writer.finish()?;
    Ok(summary)
}

/// Serialize `root` into `outfile`.
///
/// The archive is written to a sibling temp file and renamed into place, so
/// a failed run never leaves a truncated archive at `outfile`.
pub fn write_initramfs(root: &Path, outfile: &Path) -> Result<ArchiveSummary> {
    let parent = match outfile.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::at(parent, e))?;

    let temp = tempfile::Builder::new()
        .prefix(".penguin-")
        .suffix(".cpio.tmp")
        .tempfile_in(parent)
        .map_err(|e| Error::at(parent, e))?;

    let summary = serialize(root, BufWriter::new(temp.as_file()))?;
    temp.persist(outfile)
        .map_err(|e| Error::at(outfile, e.error))?;

    Ok(summary)
}

// Same encoding as glibc's gnu_dev_major/gnu_dev_minor.
fn major(dev: u64) -> u32 {
    (((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff)) as u32
}

fn minor(dev: u64) -> u32 {
    (((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff)) as u32
}
