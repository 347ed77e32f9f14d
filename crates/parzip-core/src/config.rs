use crate::pipeline::DispatchPolicyKind;
use crate::types::Mode;

/// Default split threshold: files above this size are partitioned into blocks.
pub const DEFAULT_THRESHOLD: u64 = 2 * 1024 * 1024;

/// Suffix appended to compressed containers.
pub const CONTAINER_SUFFIX: &str = ".pz";

/// Plain-value configuration for one pipeline run.
///
/// The core never reads command lines or environment variables; the caller
/// supplies everything here.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: Mode,
    pub threshold: u64,
    pub splitter_count: usize,
    pub worker_count: usize,
    pub remove_original: bool,
    pub dispatch: DispatchPolicyKind,
}

impl PipelineConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            threshold: DEFAULT_THRESHOLD,
            splitter_count: 1,
            worker_count: 1,
            remove_original: false,
            dispatch: DispatchPolicyKind::RoundRobin,
        }
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    pub fn with_splitters(mut self, splitters: usize) -> Self {
        self.splitter_count = splitters.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    pub fn with_remove_original(mut self, remove: bool) -> Self {
        self.remove_original = remove;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchPolicyKind) -> Self {
        self.dispatch = dispatch;
        self
    }
}
