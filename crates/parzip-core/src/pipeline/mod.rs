//! Pipeline orchestrator: wires splitters, codec workers, and the merger.
//!
//! Topology is all-to-all from splitters to workers with a configurable
//! dispatch policy, converging on a single merger thread:
//!
//! ```text
//! Splitter --|           |--> Worker --|
//!            |-> policy ->             |--> Merger
//! Splitter --|           |--> Worker --|
//! ```
//!
//! Single-block files bypass the merger entirely; the owning worker writes
//! their output directly.

mod dispatch;

pub use dispatch::{DispatchPolicyKind, Dispatcher};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use tracing::{info, warn};

use crate::buffer::BufferPool;
use crate::codec;
use crate::config::PipelineConfig;
use crate::error::ParzipError;
use crate::io;
use crate::merger::{MergeOutcome, Merger};
use crate::splitter::Splitter;
use crate::types::{BlockTask, FileDescriptor, Mode, Result, ResultBlock};
use crate::worker::{CodecWorker, WorkerOutput};

/// Per-worker runtime stats for one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerRunStats {
    pub worker_id: usize,
    pub tasks_completed: usize,
    pub busy: Duration,
}

/// Summary of one pipeline run.
///
/// Per-file failures are counted here instead of aborting the run; only
/// configuration-level failures surface as errors from [`Pipeline::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub mode: Mode,
    pub elapsed: Duration,
    pub files_total: usize,
    pub files_completed: usize,
    pub files_failed: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub workers: Vec<WorkerRunStats>,
}

/// Bounded batch pipeline over a fixed set of input files.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    buffer_pool: Arc<BufferPool>,
}

impl Pipeline {
    /// Creates a pipeline with a scratch-buffer pool sized for the threshold.
    pub fn new(config: PipelineConfig) -> Self {
        let block_len = usize::try_from(config.threshold).unwrap_or(usize::MAX);
        let capacity = codec::compress_bound(block_len.min(64 * 1024 * 1024));
        let buffer_pool = Arc::new(BufferPool::new(
            capacity,
            config.worker_count.saturating_mul(2).max(1),
        ));
        Self::with_buffer_pool(config, buffer_pool)
    }

    pub fn with_buffer_pool(config: PipelineConfig, buffer_pool: Arc<BufferPool>) -> Self {
        Self {
            config: Arc::new(config),
            buffer_pool,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discovers input files under `root` and runs the pipeline over them.
    pub fn run_on_path(&self, root: &Path) -> Result<RunStats> {
        let files = io::discover_files(root, self.config.mode)?;
        self.run(files)
    }

    /// Runs the pipeline to completion over an explicit file set.
    pub fn run(&self, files: Vec<FileDescriptor>) -> Result<RunStats> {
        let started_at = Instant::now();
        let files_total = files.len();
        let input_bytes: u64 = files.iter().map(|file| file.size).sum();

        let shared = Arc::new(SharedRunState::new(self.config.worker_count));
        let (result_tx, result_rx) = unbounded::<ResultBlock>();

        let mut task_txs = Vec::with_capacity(self.config.worker_count);
        let mut task_rxs = Vec::with_capacity(self.config.worker_count);
        for _ in 0..self.config.worker_count {
            let (tx, rx) = unbounded::<BlockTask>();
            task_txs.push(tx);
            task_rxs.push(rx);
        }

        let merger_handle = self.spawn_merger(result_rx, Arc::clone(&shared));
        let worker_handles = self.spawn_workers(task_rxs, result_tx, Arc::clone(&shared));
        let splitter_handles = self.spawn_splitters(files, task_txs, Arc::clone(&shared));

        for handle in splitter_handles {
            join_stage(handle, "splitter")?;
        }
        // Task senders died with the splitter threads; workers drain and exit.
        for handle in worker_handles {
            join_stage(handle, "codec worker")?;
        }
        // Result senders died with the worker threads; the merger drains and exits.
        join_stage(merger_handle, "merger")?;

        let stats = shared.into_stats(
            self.config.mode,
            started_at.elapsed(),
            files_total,
            input_bytes,
        );
        info!(
            files_total = stats.files_total,
            files_completed = stats.files_completed,
            files_failed = stats.files_failed,
            input_bytes = stats.input_bytes,
            output_bytes = stats.output_bytes,
            "pipeline run finished"
        );
        Ok(stats)
    }

    fn spawn_splitters(
        &self,
        files: Vec<FileDescriptor>,
        task_txs: Vec<Sender<BlockTask>>,
        shared: Arc<SharedRunState>,
    ) -> Vec<thread::JoinHandle<()>> {
        let groups = io::partition_files(files, self.config.splitter_count);
        let mut handles = Vec::with_capacity(groups.len());

        for group in groups {
            let splitter = Splitter::new(self.config.mode, self.config.threshold);
            let mut dispatcher =
                Dispatcher::new(self.config.dispatch, Arc::clone(&shared.queue_depths));
            let task_txs = task_txs.clone();
            let shared = Arc::clone(&shared);

            handles.push(thread::spawn(move || {
                for file in group {
                    match splitter.split(&file) {
                        Ok(tasks) => {
                            for task in tasks {
                                let index = dispatcher.select(&task);
                                shared.queue_depths[index].fetch_add(1, Ordering::AcqRel);
                                if task_txs[index].send(task).is_err() {
                                    shared.queue_depths[index].fetch_sub(1, Ordering::AcqRel);
                                    warn!(
                                        path = %file.path.display(),
                                        "worker channel closed; dropping remaining blocks"
                                    );
                                    shared.mark_failed(file.path.clone());
                                    break;
                                }
                            }
                        }
                        Err(error) => {
                            warn!(path = %file.path.display(), %error, "failed to split file");
                            shared.mark_failed(file.path.clone());
                        }
                    }
                }
            }));
        }

        handles
    }

    fn spawn_workers(
        &self,
        task_rxs: Vec<Receiver<BlockTask>>,
        result_tx: Sender<ResultBlock>,
        shared: Arc<SharedRunState>,
    ) -> Vec<thread::JoinHandle<()>> {
        let mut handles = Vec::with_capacity(task_rxs.len());

        for (worker_id, task_rx) in task_rxs.into_iter().enumerate() {
            let worker = CodecWorker::new(Arc::clone(&self.config), Arc::clone(&self.buffer_pool));
            let result_tx = result_tx.clone();
            let shared = Arc::clone(&shared);

            handles.push(thread::spawn(move || {
                for task in task_rx.iter() {
                    shared.queue_depths[worker_id].fetch_sub(1, Ordering::AcqRel);
                    let path = task.path.clone();
                    let block_started = Instant::now();

                    match worker.process(task) {
                        Ok(output) => {
                            // Failed blocks are counted against the file,
                            // not in the per-worker completion stats.
                            shared.record_task(worker_id, block_started.elapsed());
                            match output {
                                WorkerOutput::Forward(block) => {
                                    if result_tx.send(block).is_err() {
                                        warn!(
                                            "merger channel closed; stopping worker {worker_id}"
                                        );
                                        break;
                                    }
                                }
                                WorkerOutput::Written { output_bytes } => {
                                    shared.record_completed_file(output_bytes);
                                }
                            }
                        }
                        Err(error) => {
                            warn!(
                                path = %path.display(),
                                %error,
                                "block failed; abandoning file"
                            );
                            shared.mark_failed(path);
                        }
                    }
                }
            }));
        }

        handles
    }

    fn spawn_merger(
        &self,
        result_rx: Receiver<ResultBlock>,
        shared: Arc<SharedRunState>,
    ) -> thread::JoinHandle<()> {
        let mut merger = Merger::new(self.config.mode, self.config.remove_original);

        thread::spawn(move || {
            for block in result_rx.iter() {
                let path = block.path.clone();
                match merger.accept(block) {
                    Ok(MergeOutcome::Accumulating) => {}
                    Ok(MergeOutcome::Finalized { output_bytes, .. }) => {
                        shared.record_completed_file(output_bytes);
                    }
                    Err(error) => {
                        warn!(path = %path.display(), %error, "failed to finalize file");
                        shared.mark_failed(path);
                    }
                }
            }

            for path in merger.drain_pending() {
                shared.mark_failed(path);
            }
        })
    }
}

/// Counters shared across the stage threads of one run.
struct SharedRunState {
    queue_depths: Arc<Vec<AtomicUsize>>,
    completed_files: AtomicUsize,
    output_bytes: AtomicU64,
    failed_files: Mutex<HashSet<PathBuf>>,
    worker_tasks: Vec<AtomicUsize>,
    worker_busy_us: Vec<AtomicU64>,
}

impl SharedRunState {
    fn new(worker_count: usize) -> Self {
        Self {
            queue_depths: Arc::new((0..worker_count).map(|_| AtomicUsize::new(0)).collect()),
            completed_files: AtomicUsize::new(0),
            output_bytes: AtomicU64::new(0),
            failed_files: Mutex::new(HashSet::new()),
            worker_tasks: (0..worker_count).map(|_| AtomicUsize::new(0)).collect(),
            worker_busy_us: (0..worker_count).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn mark_failed(&self, path: PathBuf) {
        self.failed_files
            .lock()
            .expect("failed-files mutex poisoned")
            .insert(path);
    }

    fn record_completed_file(&self, output_bytes: u64) {
        self.completed_files.fetch_add(1, Ordering::AcqRel);
        self.output_bytes.fetch_add(output_bytes, Ordering::AcqRel);
    }

    fn record_task(&self, worker_id: usize, elapsed: Duration) {
        self.worker_tasks[worker_id].fetch_add(1, Ordering::AcqRel);
        let elapsed_us = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.worker_busy_us[worker_id].fetch_add(elapsed_us, Ordering::AcqRel);
    }

    fn into_stats(
        self: Arc<Self>,
        mode: Mode,
        elapsed: Duration,
        files_total: usize,
        input_bytes: u64,
    ) -> RunStats {
        let workers = self
            .worker_tasks
            .iter()
            .zip(self.worker_busy_us.iter())
            .enumerate()
            .map(|(worker_id, (tasks, busy_us))| WorkerRunStats {
                worker_id,
                tasks_completed: tasks.load(Ordering::Acquire),
                busy: Duration::from_micros(busy_us.load(Ordering::Acquire)),
            })
            .collect();

        let files_failed = self
            .failed_files
            .lock()
            .expect("failed-files mutex poisoned")
            .len();

        RunStats {
            mode,
            elapsed,
            files_total,
            files_completed: self.completed_files.load(Ordering::Acquire),
            files_failed,
            input_bytes,
            output_bytes: self.output_bytes.load(Ordering::Acquire),
            workers,
        }
    }
}

fn join_stage(handle: thread::JoinHandle<()>, stage: &str) -> Result<()> {
    handle.join().map_err(|payload| {
        let details = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        ParzipError::Pipeline(format!("{stage} thread panicked: {details}"))
    })
}
