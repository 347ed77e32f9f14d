use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use memmap2::{Mmap, MmapOptions};

use crate::error::ParzipError;
use crate::types::{BlockData, Result};

/// Memory-mapped file input for efficient large file access.
///
/// Uses the operating system's virtual memory manager to map a file
/// directly into the process address space, so block slices never copy the
/// underlying bytes. Empty files carry no mapping at all.
#[derive(Debug, Clone)]
pub struct MmapInput {
    mmap: Option<Arc<Mmap>>,
    path: PathBuf,
    len: u64,
}

impl MmapInput {
    /// Opens a file for memory-mapped access.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        let mmap = if len == 0 {
            None
        } else {
            Some(Arc::new(unsafe { MmapOptions::new().map(&file)? }))
        };

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len_u64(&self) -> u64 {
        self.len
    }

    pub fn len(&self) -> usize {
        self.len.min(usize::MAX as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a zero-copy slice of the file as [`BlockData`].
    pub fn mapped_slice(&self, start: usize, end: usize) -> Result<BlockData> {
        self.validate_range(start, end)?;

        match &self.mmap {
            Some(map) => Ok(BlockData::Mapped {
                map: Arc::clone(map),
                start,
                end,
            }),
            None => Ok(BlockData::Owned(Bytes::new())),
        }
    }

    /// Returns the whole file as [`BlockData`] without copying.
    pub fn as_block_data(&self) -> Result<BlockData> {
        self.mapped_slice(0, self.len())
    }

    fn validate_range(&self, start: usize, end: usize) -> Result<()> {
        if start > end || end as u64 > self.len {
            return Err(ParzipError::InvalidFormat("invalid mmap slice range"));
        }
        Ok(())
    }
}
