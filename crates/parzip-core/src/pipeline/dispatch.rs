use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::BlockTask;

/// Fan-out policy selecting which worker receives the next block task.
///
/// The policy is a parameter of the orchestrator, decoupled from the stage
/// logic: splitters call [`Dispatcher::select`] and stay oblivious to how
/// the target index is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchPolicyKind {
    /// Cycle through workers in order. Default.
    RoundRobin,
    /// Route all blocks of a file to the same worker.
    HashByFile,
    /// Pick the worker with the shallowest queue.
    LeastLoaded,
}

/// Per-splitter dispatch state over a shared view of worker queue depths.
///
/// Each splitter owns its own dispatcher (and round-robin cursor), matching
/// the all-to-all topology where every splitter can reach every worker.
#[derive(Debug)]
pub struct Dispatcher {
    kind: DispatchPolicyKind,
    next: usize,
    depths: Arc<Vec<AtomicUsize>>,
}

impl Dispatcher {
    pub fn new(kind: DispatchPolicyKind, depths: Arc<Vec<AtomicUsize>>) -> Self {
        Self {
            kind,
            next: 0,
            depths,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.depths.len()
    }

    /// Chooses the target worker index for `task`.
    pub fn select(&mut self, task: &BlockTask) -> usize {
        let workers = self.depths.len().max(1);
        match self.kind {
            DispatchPolicyKind::RoundRobin => {
                let index = self.next % workers;
                self.next = self.next.wrapping_add(1);
                index
            }
            DispatchPolicyKind::HashByFile => {
                let mut hasher = DefaultHasher::new();
                task.path.hash(&mut hasher);
                (hasher.finish() as usize) % workers
            }
            DispatchPolicyKind::LeastLoaded => self
                .depths
                .iter()
                .enumerate()
                .min_by_key(|(_, depth)| depth.load(Ordering::Acquire))
                .map(|(index, _)| index)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockData;
    use bytes::Bytes;

    fn task(name: &str, block_id: u64) -> BlockTask {
        BlockTask {
            path: name.into(),
            block_id,
            block_count: 4,
            payload: BlockData::Owned(Bytes::new()),
            is_last_block: false,
            last_block_original_size: 0,
        }
    }

    fn depths(workers: usize) -> Arc<Vec<AtomicUsize>> {
        Arc::new((0..workers).map(|_| AtomicUsize::new(0)).collect())
    }

    #[test]
    fn round_robin_cycles_through_workers() {
        let mut dispatcher = Dispatcher::new(DispatchPolicyKind::RoundRobin, depths(3));
        let picks: Vec<usize> = (0..6).map(|i| dispatcher.select(&task("a", i))).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn hash_by_file_is_sticky_per_file() {
        let mut dispatcher = Dispatcher::new(DispatchPolicyKind::HashByFile, depths(4));
        let first = dispatcher.select(&task("a", 1));
        for block_id in 2..10 {
            assert_eq!(dispatcher.select(&task("a", block_id)), first);
        }
    }

    #[test]
    fn least_loaded_prefers_shallow_queues() {
        let depths = depths(3);
        depths[0].store(5, Ordering::Release);
        depths[1].store(1, Ordering::Release);
        depths[2].store(9, Ordering::Release);

        let mut dispatcher = Dispatcher::new(DispatchPolicyKind::LeastLoaded, Arc::clone(&depths));
        assert_eq!(dispatcher.select(&task("a", 1)), 1);
    }
}
