// Registry - name-keyed serializers and target factories used when loading configs

use crate::config::TargetDescriptor;
use crate::error::Result;
use crate::serializer::{JsonSerializer, PlainSerializer, Serializer};
use crate::target::{ConsoleTarget, FileTarget, Target};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Builds a target from its config entry
pub type TargetFactory = Arc<dyn Fn(&TargetDescriptor) -> Result<Arc<dyn Target>> + Send + Sync>;

/// Serializer used for unknown names
pub const DEFAULT_SERIALIZER: &str = "plain";

/// Target kind used for unknown names
pub const DEFAULT_TARGET: &str = "file";

struct Registry {
    serializers: HashMap<String, Arc<dyn Serializer>>,
    targets: HashMap<String, TargetFactory>,
}

impl Registry {
    fn with_builtins() -> Self {
        let mut serializers: HashMap<String, Arc<dyn Serializer>> = HashMap::new();
        serializers.insert("plain".to_string(), Arc::new(PlainSerializer));
        serializers.insert("json".to_string(), Arc::new(JsonSerializer));

        let mut targets: HashMap<String, TargetFactory> = HashMap::new();
        targets.insert("file".to_string(), Arc::new(create_file_target));
        targets.insert("console".to_string(), Arc::new(create_console_target));

        Self {
            serializers,
            targets,
        }
    }
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::with_builtins()))
}

/// Register a serializer under `name`, replacing any previous one.
///
/// Meant to be called during start-up, before configs naming it are loaded.
pub fn register_serializer(name: impl Into<String>, serializer: Arc<dyn Serializer>) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .serializers
        .insert(name.into(), serializer);
}

/// Register a target factory under `name`, replacing any previous one.
///
/// Meant to be called during start-up, before configs naming it are loaded.
pub fn register_target<F>(name: impl Into<String>, factory: F)
where
    F: Fn(&TargetDescriptor) -> Result<Arc<dyn Target>> + Send + Sync + 'static,
{
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .targets
        .insert(name.into(), Arc::new(factory));
}

/// Look up a serializer, falling back to `plain`
pub fn find_serializer(name: &str) -> Arc<dyn Serializer> {
    let registry = registry().read().unwrap_or_else(PoisonError::into_inner);
    registry
        .serializers
        .get(name)
        .or_else(|| registry.serializers.get(DEFAULT_SERIALIZER))
        .cloned()
        .unwrap_or_else(|| Arc::new(PlainSerializer))
}

/// Build a target of `kind`, falling back to `file` for unknown kinds
pub fn create_target(kind: &str, descriptor: &TargetDescriptor) -> Result<Arc<dyn Target>> {
    let factory = {
        let registry = registry().read().unwrap_or_else(PoisonError::into_inner);
        registry
            .targets
            .get(kind)
            .or_else(|| registry.targets.get(DEFAULT_TARGET))
            .cloned()
    };

    match factory {
        // Called outside the lock so factories may themselves use the registry
        Some(factory) => factory(descriptor),
        None => create_file_target(descriptor),
    }
}

fn create_file_target(descriptor: &TargetDescriptor) -> Result<Arc<dyn Target>> {
    Ok(Arc::new(FileTarget::new(descriptor.file_config()?)?))
}

fn create_console_target(descriptor: &TargetDescriptor) -> Result<Arc<dyn Target>> {
    Ok(Arc::new(ConsoleTarget::new(
        descriptor.route()?,
        descriptor.mode(),
        descriptor.cache_size(),
        descriptor.interval(),
    )))
}
