use crate::event::LogEvent;
use crate::serializer::Serializer;
use crate::target::{BatchBuffer, BufferMode, Route, Target};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::error;

/// Target that batches like a file target but flushes to stderr
pub struct ConsoleTarget {
    route: Route,
    buffer: BatchBuffer,
    /// Replaces stderr, used to capture output
    sink: Option<Arc<Mutex<Vec<u8>>>>,
}

impl ConsoleTarget {
    pub fn new(route: Route, mode: BufferMode, cache_size: usize, interval: Duration) -> Self {
        Self {
            route,
            buffer: BatchBuffer::new(mode, cache_size, interval),
            sink: None,
        }
    }

    /// Send flushed batches to an in-memory buffer instead of stderr
    pub fn with_capture(mut self, sink: Arc<Mutex<Vec<u8>>>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Target for ConsoleTarget {
    fn route(&self) -> &Route {
        &self.route
    }

    fn write(&self, event: &Arc<LogEvent>, serializer: &Arc<dyn Serializer>) {
        self.buffer.write(event, serializer);
    }

    fn needs_flush(&self) -> bool {
        self.buffer.needs_flush()
    }

    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn flush(&self) {
        let result = self.buffer.flush_with(|batch| {
            match &self.sink {
                Some(sink) => super::lock(sink).extend_from_slice(batch),
                None => {
                    let mut stderr = std::io::stderr().lock();
                    stderr.write_all(batch)?;
                    stderr.flush()?;
                }
            }
            Ok(())
        });

        if let Err(e) = result {
            error!(error = %e, "Failed to write log batch to stderr, batch dropped");
        }
    }
}
