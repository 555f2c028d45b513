//! Config Store: synchronous get/set access backed by a fully-populated configuration

use crate::{ConfigError, LauncherConfig};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Synchronous settings access used by the launch pipeline
pub trait ConfigStore: Send + Sync {
    /// Snapshot of the current configuration
    fn get(&self) -> LauncherConfig;

    /// Replace the configuration, persisting it where the store is backed by storage
    fn set(&self, config: LauncherConfig) -> Result<(), ConfigError>;

    /// Apply an in-place edit to the current configuration
    fn update(&self, edit: &mut dyn FnMut(&mut LauncherConfig)) -> Result<(), ConfigError> {
        let mut config = self.get();
        edit(&mut config);
        self.set(config)
    }
}

/// Configuration kept only in memory
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: RwLock<LauncherConfig>,
}

impl MemoryConfigStore {
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self) -> LauncherConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, config: LauncherConfig) -> Result<(), ConfigError> {
        match self.config.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        Ok(())
    }
}

/// Configuration persisted to a TOML file on every `set`
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    memory: MemoryConfigStore,
}

impl FileConfigStore {
    /// Open the store at `path`, layering `ROMDOCK_*` environment overrides on top
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = LauncherConfig::load_layered(&path)?;

        if !path.exists() {
            tracing::warn!(
                "No configuration file at {}, using defaults",
                path.display()
            );
        }

        Ok(Self {
            path,
            memory: MemoryConfigStore::new(config),
        })
    }

    /// Open the store at the default user location
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(crate::default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self) -> LauncherConfig {
        self.memory.get()
    }

    fn set(&self, config: LauncherConfig) -> Result<(), ConfigError> {
        config.save(&self.path)?;
        self.memory.set(config)
    }
}
