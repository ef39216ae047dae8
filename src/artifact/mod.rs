//! Archive output.
//!
//! - [`cpio`] - newc stream writer
//! - [`initramfs`] - root tree serializer and atomic archive writes

pub mod cpio;
pub mod initramfs;

pub use initramfs::{serialize, write_initramfs, ArchiveSummary};
