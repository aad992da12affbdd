use crate::error::{LogError, Result};
use crate::event::LogEvent;
use crate::serializer::Serializer;
use crate::target::{lock, BatchBuffer, BufferMode, Route, Target};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error};

/// Default maximum file size before moving to the next slice (10MB)
pub const DEFAULT_VOLUME_SIZE: u64 = 10 * 1024 * 1024;

/// Default flush threshold in synchronous mode, in bytes
pub const DEFAULT_CACHE_BYTES: usize = 8 * 1024;

/// Default flush threshold in asynchronous mode, in queued events
pub const DEFAULT_CACHE_EVENTS: usize = 1024;

/// Highest slice index; once reached, the target keeps appending to that slice
pub const DEFAULT_MAX_SLICES: u32 = 100;

/// Settings for a [`FileTarget`]
#[derive(Debug, Clone)]
pub struct FileTargetConfig {
    pub route: Route,
    /// Directory the log files live in
    pub root: PathBuf,
    /// Last component of `{date}-{slice}-{suffix}`
    pub suffix: String,
    /// Maximum bytes per physical file
    pub volume_size: u64,
    /// Flush threshold: bytes in sync mode, queued events in async mode
    pub cache_size: usize,
    /// Maximum time between flushes
    pub interval: Duration,
    pub mode: BufferMode,
    pub max_slices: u32,
}

impl Default for FileTargetConfig {
    fn default() -> Self {
        Self {
            route: Route::all(),
            root: PathBuf::from("./logs"),
            suffix: "log".to_string(),
            volume_size: DEFAULT_VOLUME_SIZE,
            cache_size: DEFAULT_CACHE_BYTES,
            interval: Duration::from_secs(1),
            mode: BufferMode::Sync,
            max_slices: DEFAULT_MAX_SLICES,
        }
    }
}

/// Where the next batch goes. Only touched by the flushing thread.
#[derive(Debug, Default)]
struct Rotation {
    slice: u32,
    file_name: Option<PathBuf>,
    /// Bytes already in `file_name` on disk
    size: u64,
    last_date: String,
}

/// Target that appends batches to dated, size-capped files:
/// `{root}/{date}-{slice}-{suffix}`
pub struct FileTarget {
    config: FileTargetConfig,
    buffer: BatchBuffer,
    rotation: Mutex<Rotation>,
}

impl FileTarget {
    /// Create a file target, creating its root directory if needed
    pub fn new(config: FileTargetConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root).map_err(|source| LogError::CreateRoot {
            path: config.root.clone(),
            source,
        })?;

        let buffer = BatchBuffer::new(config.mode, config.cache_size, config.interval);

        Ok(Self {
            config,
            buffer,
            rotation: Mutex::new(Rotation::default()),
        })
    }

    pub fn config(&self) -> &FileTargetConfig {
        &self.config
    }

    /// File the last batch was written to
    pub fn current_file(&self) -> Option<PathBuf> {
        lock(&self.rotation).file_name.clone()
    }

    pub fn current_slice(&self) -> u32 {
        lock(&self.rotation).slice
    }

    /// Tracked size of the current file
    pub fn current_size(&self) -> u64 {
        lock(&self.rotation).size
    }

    /// Flush as if the wall-clock date were `date`
    pub(crate) fn flush_on(&self, date: &str) {
        let result = self.buffer.flush_with(|batch| {
            let mut rotation = lock(&self.rotation);
            let path = self.select_output_file(&mut rotation, date, batch.len() as u64);
            if let Err(e) = append(&path, batch) {
                // Part of the batch may have landed; take the size from disk next time
                rotation.file_name = None;
                return Err(e);
            }
            rotation.size += batch.len() as u64;
            Ok(())
        });

        match result {
            Ok(0) => {}
            Ok(written) => debug!(
                root = %self.config.root.display(),
                bytes = written,
                "Flushed batch to file"
            ),
            Err(e) => error!(
                root = %self.config.root.display(),
                suffix = %self.config.suffix,
                error = %e,
                "Failed to write log batch, batch dropped"
            ),
        }
    }

    /// Pick the file for the next batch of `batch_len` bytes.
    ///
    /// A slice below the cap only takes the batch if it still fits within `volume_size`;
    /// an empty slice always takes it. The capped slice takes everything. Sizes of candidate
    /// files are read back from disk, so a fresh target resumes the slice a previous process
    /// was writing instead of overwriting or overflowing it.
    fn select_output_file(&self, rotation: &mut Rotation, date: &str, batch_len: u64) -> PathBuf {
        let max_slices = self.config.max_slices;
        let volume_size = self.config.volume_size;
        let fits = |size: u64, slice: u32| {
            size == 0 || size + batch_len <= volume_size || slice >= max_slices
        };

        if rotation.last_date != date {
            rotation.slice = 0;
            rotation.size = 0;
            rotation.file_name = None;
            rotation.last_date = date.to_string();
        }

        if let Some(path) = &rotation.file_name {
            if fits(rotation.size, rotation.slice) {
                return path.clone();
            }
            rotation.slice += 1;
            rotation.file_name = None;
            rotation.size = 0;
        }

        loop {
            let candidate = self.slice_path(date, rotation.slice);
            rotation.size = std::fs::metadata(&candidate).map(|m| m.len()).unwrap_or(0);

            if fits(rotation.size, rotation.slice) {
                rotation.file_name = Some(candidate.clone());
                return candidate;
            }
            rotation.slice += 1;
        }
    }

    fn slice_path(&self, date: &str, slice: u32) -> PathBuf {
        self.config
            .root
            .join(format!("{}-{}-{}", date, slice, self.config.suffix))
    }
}

impl Target for FileTarget {
    fn route(&self) -> &Route {
        &self.config.route
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
        self.flush_on(&today());
    }
}

/// Local calendar date used in file names
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Append a batch and force it to disk
fn append(path: &Path, batch: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(batch)?;
    file.sync_all()?;
    Ok(())
}
