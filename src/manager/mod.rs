// Manager - routes events to targets and owns the flush scheduler

mod scheduler;

pub use scheduler::DEFAULT_TICK;

use crate::config::Config;
use crate::error::{panic_message, LogError, Result};
use crate::event::LogEvent;
use crate::logger::Logger;
use crate::target::{lock, Layout};
use scheduler::Scheduler;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{error, info};

/// The live config, shared by producers, loggers and the scheduler
pub(crate) struct Router {
    config: RwLock<Config>,
}

impl Router {
    fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Config> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append the event to every matching target under the read lock
    pub(crate) fn write_event(&self, event: LogEvent) {
        let config = self.read();
        let event = Arc::new(event);
        for layout in config.layouts() {
            if layout.matches(&event) {
                layout.target.write(&event, &layout.serializer);
            }
        }
    }

    /// One scheduler pass: flush every target that asks for it
    pub(crate) fn flush_cycle(&self, force: bool) {
        let config = self.read();
        flush_layouts(config.layouts(), force);
    }
}

/// Flush layouts one by one; a panicking target does not stop the others
fn flush_layouts(layouts: &[Layout], force: bool) {
    for layout in layouts {
        let result = catch_unwind(AssertUnwindSafe(|| {
            if force || layout.target.needs_flush() {
                layout.target.flush();
            }
        }));

        if let Err(panic) = result {
            error!(
                route = ?layout.target.route(),
                panic = %panic_message(panic.as_ref()),
                "Target flush panicked"
            );
        }
    }
}

enum Lifecycle {
    Running(Scheduler),
    Stopped,
}

/// Put a restarted scheduler in place, or record that the manager is now inert
fn resume(lifecycle: &mut Lifecycle, started: Result<Scheduler>) -> Result<()> {
    match started {
        Ok(scheduler) => {
            *lifecycle = Lifecycle::Running(scheduler);
            Ok(())
        }
        Err(e) => {
            *lifecycle = Lifecycle::Stopped;
            error!(
                error = %e,
                "Flush scheduler could not be restarted, log manager stopped"
            );
            Err(e)
        }
    }
}

/// Central router and lifecycle owner.
///
/// Producers call [`write_event`](Manager::write_event) (usually through a [`Logger`]) from
/// any thread; a single background thread flushes targets. [`reload`](Manager::reload) swaps
/// the whole config only after every target of the old one has been flushed.
pub struct Manager {
    router: Arc<Router>,
    /// Held for the whole of a reload/stop, which serializes them
    lifecycle: Mutex<Lifecycle>,
    loggers: RwLock<HashMap<String, Logger>>,
    tick: Duration,
}

impl Manager {
    /// Create a manager and start its flush scheduler
    pub fn new(config: Config) -> Result<Self> {
        Self::with_tick(config, DEFAULT_TICK)
    }

    /// Create a manager whose scheduler checks targets every `tick`
    pub fn with_tick(config: Config, tick: Duration) -> Result<Self> {
        let router = Arc::new(Router::new(config));
        let scheduler = Scheduler::start(Arc::clone(&router), tick)?;

        Ok(Self {
            router,
            lifecycle: Mutex::new(Lifecycle::Running(scheduler)),
            loggers: RwLock::new(HashMap::new()),
            tick,
        })
    }

    /// Get the logger for `name`, creating it on first use.
    ///
    /// Every call with the same name returns a handle to the same logger.
    pub fn get_logger(&self, name: &str) -> Logger {
        {
            let loggers = self.loggers.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(logger) = loggers.get(name) {
                return logger.clone();
            }
        }

        let mut loggers = self.loggers.write().unwrap_or_else(PoisonError::into_inner);
        loggers
            .entry(name.to_string())
            .or_insert_with(|| Logger::new(name, Arc::clone(&self.router)))
            .clone()
    }

    /// Number of distinct loggers handed out
    pub fn logger_count(&self) -> usize {
        self.loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Route an event to every matching target.
    ///
    /// Never performs I/O. After [`stop`](Manager::stop) events are still buffered but no
    /// longer flushed.
    pub fn write_event(&self, event: LogEvent) {
        self.router.write_event(event);
    }

    /// Replace the config without losing buffered events.
    ///
    /// Stops the scheduler, flushes every target of the current config under the write lock,
    /// installs `config` and restarts the scheduler. Fails with [`LogError::Stopped`] once the
    /// manager has been stopped.
    ///
    /// If the scheduler thread cannot be restarted, `config` stays installed but the manager
    /// is left stopped: [`is_stopped`](Manager::is_stopped) turns true and nothing is
    /// flushed again.
    pub fn reload(&self, config: Config) -> Result<()> {
        let mut lifecycle = lock(&self.lifecycle);
        let scheduler = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(scheduler) => scheduler,
            Lifecycle::Stopped => return Err(LogError::Stopped),
        };
        scheduler.stop();

        let layouts = config.len();
        {
            let mut current = self.router.write();
            // Events may have arrived between the stop signal and the lock
            flush_layouts(current.layouts(), true);
            *current = config;
        }

        let started = Scheduler::start(Arc::clone(&self.router), self.tick);
        resume(&mut lifecycle, started)?;
        info!(layouts, "Logging config reloaded");
        Ok(())
    }

    /// Stop the scheduler and flush everything buffered. Idempotent.
    pub fn stop(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if let Lifecycle::Running(scheduler) = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            scheduler.stop();
            let current = self.router.write();
            flush_layouts(current.layouts(), true);
            info!("Log manager stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(*lock(&self.lifecycle), Lifecycle::Stopped)
    }

    /// Number of layouts in the live config
    pub fn layout_count(&self) -> usize {
        self.router.read().len()
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests;
