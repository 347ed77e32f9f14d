use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::BufferPool;
use crate::codec;
use crate::config::PipelineConfig;
use crate::format::SingleBlockHeader;
use crate::io;
use crate::types::{BlockTask, Mode, Result, ResultBlock};

/// Transforms one block task into one result block.
///
/// Workers are independent across blocks; the only state they share is the
/// scratch-buffer pool. Single-block files are written to disk here and
/// never reach the merger.
pub struct CodecWorker {
    config: Arc<PipelineConfig>,
    pool: Arc<BufferPool>,
}

/// What the worker did with one task.
#[derive(Debug)]
pub enum WorkerOutput {
    /// Multi-block file: forward to the merger.
    Forward(ResultBlock),
    /// Single-block file: output written directly, nothing to merge.
    Written { output_bytes: u64 },
}

impl CodecWorker {
    pub fn new(config: Arc<PipelineConfig>, pool: Arc<BufferPool>) -> Self {
        Self { config, pool }
    }

    /// Processes one task.
    ///
    /// A codec or I/O failure is fatal to this task's file only: the error
    /// propagates to the caller, which logs it and drops the task, and the
    /// file simply never finalizes.
    pub fn process(&self, task: BlockTask) -> Result<WorkerOutput> {
        match self.config.mode {
            Mode::Compress => self.compress(task),
            Mode::Decompress => self.decompress(task),
        }
    }

    fn compress(&self, task: BlockTask) -> Result<WorkerOutput> {
        let mut scratch = self.pool.acquire();
        let compressed = codec::compress_into(task.payload.as_slice(), scratch.take())
            .map_err(|err| err.for_file(&task.path))?;

        debug!(
            path = %task.path.display(),
            block_id = task.block_id,
            input = task.payload.len(),
            output = compressed.len(),
            "compressed block"
        );

        if task.bypasses_merger() {
            let original_size = task.payload.len() as u64;
            let output_bytes =
                self.write_single_container(&task.path, &compressed, original_size)?;
            self.remove_original(&task.path);
            // The compressed bytes are dead after the write; the loan drops
            // back into the pool with its capacity intact.
            *scratch = compressed;
            return Ok(WorkerOutput::Written { output_bytes });
        }

        Ok(WorkerOutput::Forward(ResultBlock {
            path: task.path,
            block_id: task.block_id,
            block_count: task.block_count,
            payload: compressed,
            last_block_original_size: task.last_block_original_size,
        }))
    }

    fn decompress(&self, task: BlockTask) -> Result<WorkerOutput> {
        let expected = if task.is_last_block {
            task.last_block_original_size
        } else {
            self.config.threshold
        };
        let expected = usize::try_from(expected).unwrap_or(usize::MAX);

        let restored = codec::decompress(task.payload.as_slice(), expected)
            .map_err(|err| err.for_file(&task.path))?;

        debug!(
            path = %task.path.display(),
            block_id = task.block_id,
            input = task.payload.len(),
            output = restored.len(),
            "decompressed block"
        );

        if task.bypasses_merger() {
            let output = io::output_path(&task.path, Mode::Decompress);
            fs::write(&output, &restored).map_err(|err| {
                crate::error::ParzipError::from(err).for_file(&task.path)
            })?;
            self.remove_original(&task.path);
            return Ok(WorkerOutput::Written {
                output_bytes: restored.len() as u64,
            });
        }

        Ok(WorkerOutput::Forward(ResultBlock {
            path: task.path,
            block_id: task.block_id,
            block_count: task.block_count,
            payload: restored,
            last_block_original_size: task.last_block_original_size,
        }))
    }

    fn write_single_container(
        &self,
        input: &Path,
        compressed: &[u8],
        original_size: u64,
    ) -> Result<u64> {
        let output = io::output_path(input, Mode::Compress);
        let header = SingleBlockHeader::new(compressed.len() as u64, original_size);

        let mut file = File::create(&output)
            .map_err(|err| crate::error::ParzipError::from(err).for_file(&output))?;
        header.write(&mut file)?;
        file.write_all(compressed)?;

        Ok((header.to_bytes().len() + compressed.len()) as u64)
    }

    fn remove_original(&self, path: &Path) {
        if !self.config.remove_original {
            return;
        }
        if let Err(error) = fs::remove_file(path) {
            warn!(path = %path.display(), %error, "failed to remove original file");
        }
    }
}
