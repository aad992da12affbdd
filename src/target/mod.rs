// Targets - log sinks with their own buffering and flush policy

mod buffer;
mod console;
mod file;

pub use buffer::{BatchBuffer, BufferMode};
pub use console::ConsoleTarget;
pub use file::{
    FileTarget, FileTargetConfig, DEFAULT_CACHE_BYTES, DEFAULT_CACHE_EVENTS, DEFAULT_MAX_SLICES,
    DEFAULT_VOLUME_SIZE,
};

use crate::event::{Level, LogEvent};
use crate::serializer::Serializer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Which events a target accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Logger name to accept; empty accepts every name
    pub name: String,
    pub min_level: Level,
    pub max_level: Level,
}

impl Route {
    pub fn new(name: impl Into<String>, min_level: Level, max_level: Level) -> Self {
        Self {
            name: name.into(),
            min_level,
            max_level,
        }
    }

    /// Accept every event
    pub fn all() -> Self {
        Self::new("", Level::Trace, Level::Fatal)
    }

    /// `min_level <= level <= max_level` and the name is a wildcard or equal
    pub fn matches(&self, event: &LogEvent) -> bool {
        event.level >= self.min_level
            && event.level <= self.max_level
            && (self.name.is_empty() || self.name == event.name)
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::all()
    }
}

/// A log sink.
///
/// `write` is called concurrently from producer threads and must not do I/O.
/// `needs_flush` and `flush` are only ever called by one thread at a time: the manager's
/// scheduler, or the thread running a reload/stop after the scheduler has been halted.
pub trait Target: Send + Sync {
    fn route(&self) -> &Route;

    fn write(&self, event: &Arc<LogEvent>, serializer: &Arc<dyn Serializer>);

    fn needs_flush(&self) -> bool;

    /// Nothing is waiting to be flushed
    fn is_empty(&self) -> bool;

    /// Drain buffered events to storage. I/O failures are logged and the batch dropped.
    fn flush(&self);
}

/// A target paired with the serializer used to encode events for it
#[derive(Clone)]
pub struct Layout {
    pub target: Arc<dyn Target>,
    pub serializer: Arc<dyn Serializer>,
}

impl Layout {
    pub fn new(target: Arc<dyn Target>, serializer: Arc<dyn Serializer>) -> Self {
        Self { target, serializer }
    }

    pub fn matches(&self, event: &LogEvent) -> bool {
        self.target.route().matches(event)
    }
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layout")
            .field("route", self.target.route())
            .finish_non_exhaustive()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
