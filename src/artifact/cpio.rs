//! Writer for the portable ASCII ("newc") cpio format.
//!
//! Each entry is a 110-byte header of hex fields, the NUL-terminated name
//! padded to a 4-byte boundary, then the data padded the same way. The
//! archive ends with an entry named `TRAILER!!!`. This is the format the
//! Linux kernel unpacks as an initramfs.

use std::io::{self, Read, Write};

/// CPIO New ASCII Format (newc) header size
pub const HEADER_SIZE: usize = 110;
/// Magic string for newc format
pub const MAGIC_NEWC: &[u8] = b"070701";
/// Name of the end-of-archive entry
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// Metadata of one archive entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub ino: u32,
    /// File type and permission bits, as in `st_mode`.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub filesize: u32,
    pub devmajor: u32,
    pub devminor: u32,
    pub rdevmajor: u32,
    pub rdevminor: u32,
}

impl Header {
    /// Encode the fixed-size header for an entry whose name is
    /// `namesize` bytes including the terminating NUL.
    pub fn encode(&self, namesize: u32) -> [u8; HEADER_SIZE] {
        let fields = [
            self.ino,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.filesize,
            self.devmajor,
            self.devminor,
            self.rdevmajor,
            self.rdevminor,
            namesize,
            0, // check, only used by the crc variant
        ];

        let mut out = [0u8; HEADER_SIZE];
        out[..6].copy_from_slice(MAGIC_NEWC);
        for (i, field) in fields.iter().enumerate() {
            let start = 6 + i * 8;
            out[start..start + 8].copy_from_slice(format!("{field:08x}").as_bytes());
        }
        out
    }
}

/// Zero bytes needed to bring `len` up to a multiple of four.
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Length of an in-memory payload as a header `filesize`.
fn data_size(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{len} bytes exceeds the 32-bit size field"),
        )
    })
}

/// Streams newc entries into any [`Write`].
pub struct CpioWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CpioWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append one entry. `data` must yield exactly `header.filesize` bytes.
    pub fn append(&mut self, name: &[u8], header: &Header, data: &mut dyn Read) -> io::Result<()> {
        if name.contains(&0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "entry name contains a NUL byte",
            ));
        }
        let namesize = u32::try_from(name.len() + 1)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "entry name too long"))?;

        self.put(&header.encode(namesize))?;
        self.put(name)?;
        self.put(&[0])?;
        self.pad(HEADER_SIZE + name.len() + 1)?;

        let copied = io::copy(&mut data.take(u64::from(header.filesize)), &mut self.inner)?;
        self.written += copied;
        if copied != u64::from(header.filesize) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "expected {} bytes of data, got {}",
                    header.filesize, copied
                ),
            ));
        }
        self.pad(header.filesize as usize)
    }

    /// Append an entry whose data is already in memory.
    pub fn append_bytes(&mut self, name: &[u8], header: &Header, data: &[u8]) -> io::Result<()> {
        let header = Header {
            filesize: data_size(data.len())?,
            ..header.clone()
        };
        self.append(name, &header, &mut &data[..])
    }

    /// Write the trailer entry and flush. Returns the total stream size.
    pub fn finish(mut self) -> io::Result<u64> {
        let trailer = Header {
            nlink: 1,
            ..Header::default()
        };
        self.append_bytes(TRAILER_NAME.as_bytes(), &trailer, &[])?;
        self.inner.flush()?;
        Ok(self.written)
    }

    fn put(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn pad(&mut self, len: usize) -> io::Result<()> {
        let zeros = [0u8; 3];
        self.put(&zeros[..padding(len)])
    }
}
