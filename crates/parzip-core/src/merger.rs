use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::format;
use crate::io;
use crate::types::{Mode, Result, ResultBlock};

/// Accumulation state for one in-flight file.
///
/// Lifecycle: created on the first result block for a filename, destroyed
/// the moment the file finalizes (or fails to). At most one state exists
/// per filename at any time.
#[derive(Debug)]
struct FileMergeState {
    expected_block_count: u64,
    last_block_original_size: u64,
    partitions: BTreeMap<u64, Vec<u8>>,
}

/// What [`Merger::accept`] did with one result block.
#[derive(Debug)]
pub enum MergeOutcome {
    /// Block stored; the file is still waiting for more blocks.
    Accumulating,
    /// All blocks arrived and the output file was written.
    Finalized { path: PathBuf, output_bytes: u64 },
}

/// Reassembles multi-block files and writes each output exactly once.
///
/// The merger is the single owner of the per-filename state map; no other
/// stage ever touches it, so check-and-finalize needs no locking. Blocks
/// may arrive in any order and are re-sorted by block id at finalization.
#[derive(Debug)]
pub struct Merger {
    mode: Mode,
    remove_original: bool,
    states: HashMap<PathBuf, FileMergeState>,
}

impl Merger {
    pub fn new(mode: Mode, remove_original: bool) -> Self {
        Self {
            mode,
            remove_original,
            states: HashMap::new(),
        }
    }

    /// Number of files currently accumulating.
    pub fn in_flight(&self) -> usize {
        self.states.len()
    }

    /// Accepts one result block, finalizing its file if it was the last.
    ///
    /// An I/O failure while writing the output aborts only that file; its
    /// state entry is cleared either way so the map cannot grow unbounded.
    pub fn accept(&mut self, block: ResultBlock) -> Result<MergeOutcome> {
        let state = self
            .states
            .entry(block.path.clone())
            .or_insert_with(|| FileMergeState {
                expected_block_count: block.block_count,
                last_block_original_size: block.last_block_original_size,
                partitions: BTreeMap::new(),
            });

        // A mismatched count or repeated id is a logic defect upstream, not
        // a runtime condition; abort loudly instead of corrupting output.
        assert_eq!(
            state.expected_block_count, block.block_count,
            "block count changed mid-file for {}",
            block.path.display()
        );
        let replaced = state.partitions.insert(block.block_id, block.payload);
        assert!(
            replaced.is_none(),
            "duplicate block id {} for {}",
            block.block_id,
            block.path.display()
        );

        if (state.partitions.len() as u64) < state.expected_block_count {
            debug!(
                path = %block.path.display(),
                received = state.partitions.len(),
                expected = state.expected_block_count,
                "accumulated block"
            );
            return Ok(MergeOutcome::Accumulating);
        }

        // Exactly-once finalization: the state leaves the map before any
        // fallible I/O, so a failure cannot leave a half-merged entry.
        let state = self
            .states
            .remove(&block.path)
            .expect("state present at finalization");
        let output_bytes = self
            .finalize(&block.path, state)
            .map_err(|err| err.for_file(&block.path))?;

        if self.remove_original {
            if let Err(error) = std::fs::remove_file(&block.path) {
                warn!(path = %block.path.display(), %error, "failed to remove original file");
            }
        }

        Ok(MergeOutcome::Finalized {
            path: block.path,
            output_bytes,
        })
    }

    /// Files still accumulating, reported as diagnostics at end of run.
    pub fn drain_pending(&mut self) -> Vec<PathBuf> {
        let pending: Vec<PathBuf> = self.states.keys().cloned().collect();
        for path in &pending {
            warn!(
                path = %path.display(),
                "file never reached its expected block count; output not written"
            );
        }
        self.states.clear();
        pending
    }

    fn finalize(&self, path: &Path, state: FileMergeState) -> Result<u64> {
        // BTreeMap iteration yields partitions in block-id order.
        let output = io::output_path(path, self.mode);
        debug!(
            path = %path.display(),
            output = %output.display(),
            blocks = state.partitions.len(),
            "finalizing file"
        );

        let mut file = File::create(&output)?;
        let mut written = 0u64;

        match self.mode {
            Mode::Compress => {
                let payloads: Vec<&[u8]> = state
                    .partitions
                    .values()
                    .map(|payload| payload.as_slice())
                    .collect();
                let container = format::encode(&payloads, state.last_block_original_size);
                file.write_all(&container)?;
                written += container.len() as u64;
            }
            Mode::Decompress => {
                for payload in state.partitions.values() {
                    file.write_all(payload)?;
                    written += payload.len() as u64;
                }
            }
        }

        Ok(written)
    }
}

impl Drop for Merger {
    fn drop(&mut self) {
        if !self.states.is_empty() {
            warn!(
                pending = self.states.len(),
                "merger dropped with files still accumulating"
            );
        }
    }
}
