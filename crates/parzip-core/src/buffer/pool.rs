use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

/// A pool of reusable byte buffers to reduce allocation overhead.
///
/// Codec workers acquire scratch buffers here for compression output; a
/// buffer returns to the pool when dropped. The pool is bounded, so excess
/// buffers are simply freed instead of accumulating.
#[derive(Debug)]
pub struct BufferPool {
    recycler: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    default_capacity: usize,
    max_buffers: usize,
    metrics: Arc<PoolMetricsInner>,
}

impl BufferPool {
    /// Creates a new buffer pool.
    ///
    /// # Arguments
    /// * `default_capacity` - Initial capacity for newly created buffers
    /// * `max_buffers` - Maximum number of buffers to keep in the pool
    pub fn new(default_capacity: usize, max_buffers: usize) -> Self {
        let (tx, rx) = bounded(max_buffers);
        Self {
            recycler: tx,
            receiver: rx,
            default_capacity,
            max_buffers,
            metrics: Arc::new(PoolMetricsInner::default()),
        }
    }

    /// Acquires a buffer, recycling one if available.
    pub fn acquire(&self) -> PooledBuffer {
        let buffer = match self.receiver.try_recv() {
            Ok(mut buffer) => {
                buffer.clear();
                self.metrics.recycled.fetch_add(1, Ordering::Relaxed);
                buffer
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.default_capacity)
            }
        };

        PooledBuffer::new(buffer, self.recycler.clone(), Arc::clone(&self.metrics))
    }

    pub fn metrics(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            created: self.metrics.created.load(Ordering::Relaxed),
            recycled: self.metrics.recycled.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    pub fn max_buffers(&self) -> usize {
        self.max_buffers
    }
}

/// A snapshot of buffer pool metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolMetricsSnapshot {
    pub created: usize,
    pub recycled: usize,
    /// Buffers freed because the pool was full.
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct PoolMetricsInner {
    created: AtomicUsize,
    recycled: AtomicUsize,
    dropped: AtomicUsize,
}

/// A buffer on loan from a [`BufferPool`]; returns to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Vec<u8>,
    recycler: Sender<Vec<u8>>,
    metrics: Arc<PoolMetricsInner>,
}

impl PooledBuffer {
    fn new(buffer: Vec<u8>, recycler: Sender<Vec<u8>>, metrics: Arc<PoolMetricsInner>) -> Self {
        Self {
            buffer,
            recycler,
            metrics,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Moves the underlying Vec out, leaving an empty buffer behind.
    ///
    /// Used when the filled bytes outlive the loan, e.g. a compression
    /// scratch buffer that becomes a result payload.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        if buffer.capacity() == 0 {
            return;
        }
        if let Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) =
            self.recycler.try_send(buffer)
        {
            self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
