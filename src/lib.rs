// Library exports for relaylog

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod logger;
pub mod manager;
pub mod registry;
pub mod serializer;
pub mod target;

pub use config::{Config, ConfigFile, ConfigSource, TargetDescriptor};
pub use error::{LogError, Result};
pub use event::{Level, LogEvent, Properties};
pub use logger::Logger;
pub use manager::Manager;
