// Config module - routing snapshots and their on-disk description

mod watcher;

pub use watcher::{ConfigSource, DEFAULT_POLL_INTERVAL};

use crate::error::{LogError, Result};
use crate::event::Level;
use crate::registry;
use crate::target::{
    BufferMode, FileTargetConfig, Layout, Route, DEFAULT_CACHE_BYTES, DEFAULT_CACHE_EVENTS,
    DEFAULT_MAX_SLICES, DEFAULT_VOLUME_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Root directory for file targets that name none
pub const DEFAULT_ROOT: &str = "./logs";

/// Immutable routing snapshot: the layouts events are dispatched through.
///
/// Replaced wholesale on reload; never modified in place.
#[derive(Debug, Clone, Default)]
pub struct Config {
    layouts: Vec<Layout>,
}

impl Config {
    pub fn new(layouts: Vec<Layout>) -> Self {
        Self { layouts }
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Load a config file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Config> {
        load(path).map(|(config, _)| config)
    }

    /// Instantiate targets and serializers for every entry through the registry
    pub fn from_file_content(content: ConfigFile) -> Result<Config> {
        let descriptors = content.resolved_targets();

        let mut layouts = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let target = registry::create_target(&descriptor.kind, &descriptor)?;
            let serializer = registry::find_serializer(&descriptor.serializer);
            layouts.push(Layout::new(target, serializer));
        }

        Ok(Config::new(layouts))
    }
}

/// Top-level structure of a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default root for file targets
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub targets: Vec<TargetDescriptor>,
}

impl ConfigFile {
    /// Target entries with the top-level root filled in where they name none
    pub fn resolved_targets(&self) -> Vec<TargetDescriptor> {
        let default_root = self
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

        self.targets
            .iter()
            .cloned()
            .map(|mut descriptor| {
                if descriptor.root.is_none() {
                    descriptor.root = Some(default_root.clone());
                }
                descriptor
            })
            .collect()
    }

    /// Read and parse a config file without instantiating targets
    pub fn read(path: &Path) -> Result<ConfigFile> {
        check_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        Self::parse(path, &contents)
    }

    /// Parse by file extension
    pub fn parse(path: &Path, contents: &str) -> Result<ConfigFile> {
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => Self::parse_toml(contents),
            "json" => Self::parse_json(contents),
            other => Err(LogError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn parse_toml(contents: &str) -> Result<ConfigFile> {
        toml::from_str(contents).map_err(|e| LogError::Parse(format!("invalid TOML: {}", e)))
    }

    pub fn parse_json(contents: &str) -> Result<ConfigFile> {
        serde_json::from_str(contents).map_err(|e| LogError::Parse(format!("invalid JSON: {}", e)))
    }
}

/// One `[[targets]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Registered target kind (`file`, `console`, or a custom name)
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Logger name filter; empty or `*` accepts all
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub min_level: String,

    #[serde(default)]
    pub max_level: String,

    /// Registered serializer name
    #[serde(default = "default_serializer")]
    pub serializer: String,

    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub suffix: Option<String>,

    /// Maximum bytes per file
    #[serde(default)]
    pub volume_size: Option<u64>,

    /// Flush threshold: bytes in sync mode, events in async mode
    #[serde(default)]
    pub cache_size: Option<usize>,

    /// Maximum time between flushes (milliseconds)
    #[serde(default)]
    pub interval_ms: Option<u64>,

    /// Defer serialization to flush time
    #[serde(default, rename = "async")]
    pub async_mode: bool,

    #[serde(default)]
    pub max_slices: Option<u32>,

    /// Options for custom target factories
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

// Default value functions for serde
fn default_kind() -> String {
    registry::DEFAULT_TARGET.to_string()
}

fn default_serializer() -> String {
    registry::DEFAULT_SERIALIZER.to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            name: String::new(),
            min_level: String::new(),
            max_level: String::new(),
            serializer: default_serializer(),
            root: None,
            suffix: None,
            volume_size: None,
            cache_size: None,
            interval_ms: None,
            async_mode: false,
            max_slices: None,
            extra: HashMap::new(),
        }
    }
}

impl TargetDescriptor {
    /// Routing filter with wildcards resolved
    pub fn route(&self) -> Result<Route> {
        let name = if self.name == "*" { "" } else { self.name.as_str() };
        Ok(Route::new(
            name,
            Level::parse_bound(&self.min_level, Level::Trace)?,
            Level::parse_bound(&self.max_level, Level::Fatal)?,
        ))
    }

    pub fn mode(&self) -> BufferMode {
        if self.async_mode {
            BufferMode::Async
        } else {
            BufferMode::Sync
        }
    }

    /// Configured threshold, or the default for the buffering mode
    pub fn cache_size(&self) -> usize {
        match (self.cache_size, self.mode()) {
            (Some(size), _) if size > 0 => size,
            (_, BufferMode::Sync) => DEFAULT_CACHE_BYTES,
            (_, BufferMode::Async) => DEFAULT_CACHE_EVENTS,
        }
    }

    pub fn interval(&self) -> Duration {
        match self.interval_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Duration::from_millis(default_interval_ms()),
        }
    }

    pub fn file_config(&self) -> Result<FileTargetConfig> {
        let volume_size = self.volume_size.unwrap_or(DEFAULT_VOLUME_SIZE);
        if volume_size == 0 {
            return Err(LogError::InvalidConfig(
                "volume_size must be greater than 0".to_string(),
            ));
        }

        Ok(FileTargetConfig {
            route: self.route()?,
            root: self
                .root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            suffix: self
                .suffix
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "log".to_string()),
            volume_size,
            cache_size: self.cache_size(),
            interval: self.interval(),
            mode: self.mode(),
            max_slices: self.max_slices.unwrap_or(DEFAULT_MAX_SLICES),
        })
    }
}

/// Validate that `path` names a readable file
fn check_path(path: &Path) -> Result<SystemTime> {
    if path.as_os_str().is_empty() {
        return Err(LogError::EmptyPath);
    }

    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LogError::NotFound(path.to_path_buf()),
        _ => LogError::Io(e),
    })?;

    if metadata.is_dir() {
        return Err(LogError::IsDirectory(path.to_path_buf()));
    }

    Ok(metadata.modified()?)
}

/// Load a config and the modification time it was read at
pub(crate) fn load(path: &Path) -> Result<(Config, SystemTime)> {
    let modified = check_path(path)?;
    let contents = std::fs::read_to_string(path)?;
    let content = ConfigFile::parse(path, &contents)?;
    let config = Config::from_file_content(content)?;
    Ok((config, modified))
}
