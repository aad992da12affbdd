use crate::error::Result;
use crate::manager::Router;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Default pause between flush checks
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// The background flush thread. One per running manager.
pub(crate) struct Scheduler {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub(crate) fn start(router: Arc<Router>, tick: Duration) -> Result<Self> {
        let (stop, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("relaylog-flush".to_string())
            .spawn(move || run(router, tick, stop_rx))?;

        debug!(tick_ms = tick.as_millis() as u64, "Flush scheduler started");
        Ok(Self { stop, handle })
    }

    /// Signal the thread and wait for its in-flight cycle to finish
    pub(crate) fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            error!("Flush scheduler thread panicked");
        }
        debug!("Flush scheduler stopped");
    }
}

fn run(router: Arc<Router>, tick: Duration, stop: mpsc::Receiver<()>) {
    loop {
        match stop.recv_timeout(tick) {
            Err(RecvTimeoutError::Timeout) => router.flush_cycle(false),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
