pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod merger;
pub mod pipeline;
pub mod splitter;
pub mod types;
pub mod worker;

pub use buffer::{BufferPool, PoolMetricsSnapshot, PooledBuffer};
pub use config::{PipelineConfig, CONTAINER_SUFFIX, DEFAULT_THRESHOLD};
pub use error::ParzipError;
pub use io::MmapInput;
pub use merger::{MergeOutcome, Merger};
pub use pipeline::{DispatchPolicyKind, Pipeline, RunStats, WorkerRunStats};
pub use splitter::Splitter;
pub use types::{BlockData, BlockTask, FileDescriptor, Mode, Result, ResultBlock};
pub use worker::{CodecWorker, WorkerOutput};
