use tracing::debug;

use crate::format::{self, DecodedContainer};
use crate::types::{BlockTask, FileDescriptor, Mode, Result};

/// Turns one file into a sequence of block tasks.
///
/// Compression partitions the raw bytes at the configured threshold;
/// decompression recovers the block layout from the container header. Either
/// way the payloads are zero-copy slices into the file's mapping, and block
/// ids form a contiguous `1..=block_count` range.
#[derive(Debug, Clone)]
pub struct Splitter {
    mode: Mode,
    threshold: u64,
}

impl Splitter {
    pub fn new(mode: Mode, threshold: u64) -> Self {
        Self {
            mode,
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Splits one file into block tasks.
    ///
    /// A malformed container fails only this file; the splitter itself
    /// stays usable for the rest of its partition.
    pub fn split(&self, file: &FileDescriptor) -> Result<Vec<BlockTask>> {
        let tasks = match self.mode {
            Mode::Compress => self.split_raw(file),
            Mode::Decompress => self.split_container(file)?,
        };

        debug!(
            path = %file.path.display(),
            size = file.size,
            blocks = tasks.len(),
            "split file into block tasks"
        );
        Ok(tasks)
    }

    fn split_raw(&self, file: &FileDescriptor) -> Vec<BlockTask> {
        let threshold = usize::try_from(self.threshold).unwrap_or(usize::MAX);
        let len = file.data.len();

        if len <= threshold {
            return vec![BlockTask {
                path: file.path.clone(),
                block_id: 1,
                block_count: 1,
                payload: file.data.slice(0, len),
                is_last_block: true,
                last_block_original_size: len as u64,
            }];
        }

        let full_blocks = len / threshold;
        let remainder = len % threshold;
        let block_count = (full_blocks + usize::from(remainder > 0)) as u64;
        let last_len = if remainder > 0 { remainder } else { threshold };

        let mut tasks = Vec::with_capacity(block_count as usize);
        for i in 0..full_blocks {
            let start = i * threshold;
            tasks.push(BlockTask {
                path: file.path.clone(),
                block_id: (i + 1) as u64,
                block_count,
                payload: file.data.slice(start, start + threshold),
                is_last_block: remainder == 0 && i + 1 == full_blocks,
                last_block_original_size: last_len as u64,
            });
        }
        if remainder > 0 {
            let start = full_blocks * threshold;
            tasks.push(BlockTask {
                path: file.path.clone(),
                block_id: block_count,
                block_count,
                payload: file.data.slice(start, len),
                is_last_block: true,
                last_block_original_size: remainder as u64,
            });
        }

        tasks
    }

    fn split_container(&self, file: &FileDescriptor) -> Result<Vec<BlockTask>> {
        let decoded = format::decode(file.data.as_slice())
            .map_err(|err| err.for_file(&file.path))?;

        match decoded {
            DecodedContainer::Single(header, slice) => Ok(vec![BlockTask {
                path: file.path.clone(),
                block_id: 1,
                block_count: 1,
                payload: file.data.slice(slice.offset, slice.offset + slice.len),
                is_last_block: true,
                last_block_original_size: header.original_size,
            }]),
            DecodedContainer::Multi(header, slices) => {
                // A zero first field decodes as the single-block layout, so
                // a multi-block header always carries at least one block.
                let block_count = header.block_count;
                let mut tasks = Vec::with_capacity(slices.len());
                for (index, slice) in slices.iter().enumerate() {
                    let block_id = (index + 1) as u64;
                    tasks.push(BlockTask {
                        path: file.path.clone(),
                        block_id,
                        block_count,
                        payload: file.data.slice(slice.offset, slice.offset + slice.len),
                        is_last_block: block_id == block_count,
                        last_block_original_size: header.last_block_original_size,
                    });
                }
                Ok(tasks)
            }
        }
    }
}
