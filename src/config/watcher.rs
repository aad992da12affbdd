use crate::config::{load, Config};
use crate::error::{panic_message, LogError, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How often the config file's modification time is checked
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

struct Monitor {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A config file on disk that can be watched for changes
pub struct ConfigSource {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
    poll_interval: Duration,
    monitor: Option<Monitor>,
}

impl ConfigSource {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            path: None,
            modified: None,
            poll_interval,
            monitor: None,
        }
    }

    /// Load the config at `path` and remember it for monitoring
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let (config, modified) = load(path)?;
        self.path = Some(path.to_path_buf());
        self.modified = Some(modified);
        Ok(config)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    /// Poll the loaded file and hand every successfully reloaded config to `callback`.
    ///
    /// Must be called from within a tokio runtime. The callback runs on the blocking pool;
    /// a panic inside it is logged and monitoring continues. Does nothing if no file has
    /// been loaded or monitoring is already running.
    pub fn start_monitor<F>(&mut self, callback: F)
    where
        F: Fn(Config) + Send + Sync + 'static,
    {
        let Some(path) = self.path.clone() else {
            debug!("No config file loaded, monitoring skipped");
            return;
        };
        if self.monitor.is_some() {
            debug!(path = %path.display(), "Config monitor already running");
            return;
        }

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(monitor_loop(
            path,
            self.modified,
            self.poll_interval,
            Arc::new(callback),
            stop_rx,
        ));

        self.monitor = Some(Monitor { stop, handle });
    }

    /// Stop monitoring and wait for the poll task to finish
    pub async fn stop_monitor(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.stop.send(());
            if let Err(e) = monitor.handle.await {
                error!(error = %e, "Config monitor task failed");
            }
        }
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConfigSource {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.handle.abort();
        }
    }
}

async fn monitor_loop<F>(
    path: PathBuf,
    mut modified: Option<SystemTime>,
    poll_interval: Duration,
    callback: Arc<F>,
    mut stop: oneshot::Receiver<()>,
) where
    F: Fn(Config) + Send + Sync + 'static,
{
    info!(path = %path.display(), "Watching config file for changes");

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                warn!(path = %path.display(), "Config path is not a file");
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat config file");
                continue;
            }
        };

        let current = match metadata.modified() {
            Ok(time) => time,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Modification time unavailable");
                continue;
            }
        };

        if modified == Some(current) {
            continue;
        }
        modified = Some(current);

        let reload_path = path.clone();
        let reload_callback = Arc::clone(&callback);
        let result = tokio::task::spawn_blocking(move || -> Result<()> {
            let (config, _) = load(&reload_path)?;
            catch_unwind(AssertUnwindSafe(|| reload_callback(config)))
                .map_err(|panic| LogError::Callback(panic_message(panic.as_ref())))
        })
        .await;

        match result {
            Ok(Ok(())) => info!(path = %path.display(), "Config reloaded"),
            Ok(Err(e)) => error!(path = %path.display(), error = %e, "Config reload failed"),
            Err(e) => error!(path = %path.display(), error = %e, "Config reload task failed"),
        }
    }

    debug!(path = %path.display(), "Config monitor stopped");
}
