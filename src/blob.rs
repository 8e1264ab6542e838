//! Input buffers
//!
//! Encoded inputs are memory-mapped read-only so the OS pages them in on
//! demand. Empty files and callers that opt out of mmap get an owned buffer.

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Bytes of one encoded input file
#[derive(Debug)]
pub enum Blob {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Blob {
    /// Open `path`, mapping it when `mmap` is set and the file is non-empty
    pub fn open(path: &Path, mmap: bool) -> Result<Self> {
        if !mmap {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            debug!("Read {} ({} bytes)", path.display(), bytes.len());
            return Ok(Blob::Owned(bytes));
        }

        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        if len == 0 {
            return Ok(Blob::Owned(Vec::new()));
        }

        // SAFETY: The mapping is read-only and the encoded inputs are written
        // once offline; nothing in this process mutates the file.
        let map = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("Failed to mmap {}", path.display()))?;
        debug!("Mapped {} ({} bytes)", path.display(), len);
        Ok(Blob::Mapped(map))
    }

    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Blob::Mapped(_))
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        match self {
            Blob::Mapped(map) => map,
            Blob::Owned(bytes) => bytes,
        }
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob::Owned(bytes)
    }
}
