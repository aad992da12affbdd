use crate::error::Result;
use crate::event::LogEvent;
use crate::serializer::Serializer;
use crate::target::lock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// When events are serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Serialize in `write`; the threshold counts buffered bytes
    Sync,
    /// Queue the event and serialize at flush time; the threshold counts queued events
    Async,
}

type Pending = (Arc<LogEvent>, Arc<dyn Serializer>);

struct Buffers {
    /// Receives writes
    active: Vec<u8>,
    /// Empty spare, swapped in at the next flush
    standby: Vec<u8>,
    queue: Vec<Pending>,
}

/// Double-buffered batch shared by the built-in targets.
///
/// Producers append to the active buffer (or the async queue) under a short mutex hold.
/// A flush swaps the buffers under the mutex and performs I/O on the drained one with the
/// mutex released, so producers never wait on disk.
pub struct BatchBuffer {
    mode: BufferMode,
    cache_size: usize,
    interval: Duration,
    buffers: Mutex<Buffers>,
    /// Bytes (sync) or events (async) since the last swap. Read without the mutex.
    cached: AtomicUsize,
    epoch: Instant,
    /// Deadline as milliseconds since `epoch`
    next_flush_ms: AtomicU64,
}

impl BatchBuffer {
    pub fn new(mode: BufferMode, cache_size: usize, interval: Duration) -> Self {
        let buffer = Self {
            mode,
            cache_size,
            interval,
            buffers: Mutex::new(Buffers {
                active: Vec::new(),
                standby: Vec::new(),
                queue: Vec::new(),
            }),
            cached: AtomicUsize::new(0),
            epoch: Instant::now(),
            next_flush_ms: AtomicU64::new(0),
        };
        buffer.schedule_next();
        buffer
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    /// Buffer one event. No I/O happens here.
    pub fn write(&self, event: &Arc<LogEvent>, serializer: &Arc<dyn Serializer>) {
        match self.mode {
            BufferMode::Async => {
                let mut buffers = lock(&self.buffers);
                buffers.queue.push((Arc::clone(event), Arc::clone(serializer)));
                self.cached.fetch_add(1, Ordering::Relaxed);
            }
            BufferMode::Sync => {
                let Some(bytes) = serializer.encode(event) else {
                    return;
                };
                let mut buffers = lock(&self.buffers);
                buffers.active.extend_from_slice(&bytes);
                buffers.active.push(b'\n');
                self.cached.fetch_add(bytes.len() + 1, Ordering::Relaxed);
            }
        }
    }

    /// True once the interval has elapsed or the threshold is reached.
    ///
    /// Reads the counters without the mutex; a stale value only shifts the flush by a tick.
    pub fn needs_flush(&self) -> bool {
        self.now_ms() >= self.next_flush_ms.load(Ordering::Relaxed)
            || self.cached.load(Ordering::Relaxed) >= self.cache_size
    }

    /// Bytes (sync) or events (async) waiting for the next flush
    pub fn cached(&self) -> usize {
        self.cached.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        let buffers = lock(&self.buffers);
        buffers.active.is_empty() && buffers.queue.is_empty()
    }

    /// Swap out the pending batch and hand its bytes to `sink`.
    ///
    /// `sink` is not called when nothing is pending. Returns the number of bytes handed over.
    pub fn flush_with<F>(&self, sink: F) -> Result<usize>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let (mut batch, queue) = {
            let mut buffers = lock(&self.buffers);
            let standby = std::mem::take(&mut buffers.standby);
            let batch = std::mem::replace(&mut buffers.active, standby);
            let queue = std::mem::take(&mut buffers.queue);
            self.cached.store(0, Ordering::Relaxed);
            (batch, queue)
        };
        self.schedule_next();

        for (event, serializer) in queue {
            if let Some(bytes) = serializer.encode(&event) {
                batch.extend_from_slice(&bytes);
                batch.push(b'\n');
            }
        }

        let written = batch.len();
        let result = if batch.is_empty() {
            Ok(())
        } else {
            sink(&batch)
        };

        self.recycle(batch);
        result.map(|_| written)
    }

    /// Return a drained buffer as the standby so its allocation is reused
    fn recycle(&self, mut batch: Vec<u8>) {
        batch.clear();
        let mut buffers = lock(&self.buffers);
        if buffers.standby.capacity() < batch.capacity() {
            buffers.standby = batch;
        }
    }

    fn schedule_next(&self) {
        let deadline = self.now_ms() + self.interval.as_millis() as u64;
        self.next_flush_ms.store(deadline, Ordering::Relaxed);
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}
