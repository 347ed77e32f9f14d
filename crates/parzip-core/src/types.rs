use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::ParzipError;

pub type Result<T> = std::result::Result<T, ParzipError>;

/// Whether the pipeline is compressing raw files or decompressing containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Compress,
    Decompress,
}

/// A contiguous range of input bytes, either owned or borrowed from a mapping.
///
/// Mapped variants keep the owning [`Mmap`] alive through the `Arc`, so a
/// file's mapping is released exactly when its last in-flight block drops.
#[derive(Debug, Clone)]
pub enum BlockData {
    Owned(Bytes),
    Mapped {
        map: Arc<Mmap>,
        start: usize,
        end: usize,
    },
}

impl BlockData {
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(data) => data.len(),
            Self::Mapped { start, end, .. } => end - start,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(data) => &data[..],
            Self::Mapped { map, start, end } => &map[*start..*end],
        }
    }

    /// Re-slices this range relative to its own start.
    ///
    /// Mapped data stays zero-copy; owned data is a cheap refcounted slice.
    pub fn slice(&self, start: usize, end: usize) -> BlockData {
        debug_assert!(start <= end && end <= self.len());
        match self {
            Self::Owned(data) => Self::Owned(data.slice(start..end)),
            Self::Mapped {
                map,
                start: base,
                end: _,
            } => Self::Mapped {
                map: Arc::clone(map),
                start: base + start,
                end: base + end,
            },
        }
    }
}

impl From<BlockData> for Bytes {
    fn from(data: BlockData) -> Self {
        match data {
            BlockData::Owned(bytes) => bytes,
            BlockData::Mapped { map, start, end } => Bytes::copy_from_slice(&map[start..end]),
        }
    }
}

/// One discovered input file, consumed by exactly one splitter.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size: u64,
    pub data: BlockData,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>, data: BlockData) -> Self {
        let size = data.len() as u64;
        Self {
            path: path.into(),
            size,
            data,
        }
    }
}

/// One unit of codec work: a single block of a single file.
///
/// Block ids are 1-based and contiguous within a file; `block_count` is the
/// total the merger must accumulate before finalizing.
#[derive(Debug, Clone)]
pub struct BlockTask {
    pub path: PathBuf,
    pub block_id: u64,
    pub block_count: u64,
    pub payload: BlockData,
    pub is_last_block: bool,
    pub last_block_original_size: u64,
}

impl BlockTask {
    /// True when the owning worker writes the output itself, bypassing the merger.
    pub fn bypasses_merger(&self) -> bool {
        self.block_count == 1
    }
}

/// The processed counterpart of a [`BlockTask`], consumed by the merger.
#[derive(Debug)]
pub struct ResultBlock {
    pub path: PathBuf,
    pub block_id: u64,
    pub block_count: u64,
    pub payload: Vec<u8>,
    pub last_block_original_size: u64,
}

impl ResultBlock {
    pub fn payload_size(&self) -> u64 {
        self.payload.len() as u64
    }
}
