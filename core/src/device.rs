// Positional reads over a raw device or image file.
// The cursor is private state: every read seeks first, so callers can
// interleave reads at arbitrary offsets.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::InspectorError;

/// Byte-addressable read-only view of a block device or disk image.
pub struct BlockReader {
    file: File,
    size: u64,
}

impl BlockReader {
    /// Open a device or image file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InspectorError> {
        let file = File::open(path.as_ref())?;
        Self::from_file(file)
    }

    /// Wrap an already-open handle (images built by tests, pre-opened devices).
    pub fn from_file(file: File) -> Result<Self, InspectorError> {
        let size = file.metadata()?.len();
        debug!("Opened block reader, {} bytes", size);
        Ok(BlockReader { file, size })
    }

    /// Total size of the underlying volume in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read exactly `len` bytes at absolute byte offset `offset`.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, InspectorError> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(InspectorError::IoRange {
                offset,
                len: len as u64,
                size: self.size,
            })?;
        if end > self.size {
            return Err(InspectorError::IoRange {
                offset,
                len: len as u64,
                size: self.size,
            });
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        let mut got = 0;
        while got < len {
            let n = self.file.read(&mut buf[got..])?;
            if n == 0 {
                return Err(InspectorError::IoShort {
                    offset,
                    wanted: len,
                    got,
                });
            }
            got += n;
        }
        Ok(buf)
    }
}
