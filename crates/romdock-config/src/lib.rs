//! Configuration management for romdock
//!
//! Holds user settings for emulator discovery and launching: custom executable
//! paths, per-platform defaults, disabled emulators, BIOS files, embedded core
//! preferences and controller profiles. Settings are stored as TOML and every
//! key has a default, so a missing or partial file still yields a complete
//! configuration.

mod emulator_settings;
mod store;

pub use emulator_settings::{
    BiosSettings, ControllerProfile, ControllerSettings, EmbeddedSettings, EmulatorSettings,
    LibrarySettings,
};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to layer configuration sources: {0}")]
    Layered(#[from] config::ConfigError),
}

/// Prefix for environment variable overrides (`ROMDOCK_EMBEDDED__PREFER_EMBEDDED=true`)
pub const ENV_PREFIX: &str = "ROMDOCK";

/// Application directory name under the platform config/data roots
pub const APP_DIR: &str = "romdock";

/// Default location of the user configuration file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Default directory for application data (database, cores)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Main launcher configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub emulators: EmulatorSettings,

    #[serde(default)]
    pub bios: BiosSettings,

    #[serde(default)]
    pub embedded: EmbeddedSettings,

    #[serde(default)]
    pub controllers: ControllerSettings,

    #[serde(default)]
    pub library: LibrarySettings,
}

impl LauncherConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load a file with `ROMDOCK_*` environment overrides layered on top.
    ///
    /// A missing file is not an error; defaults fill every unset key. Keys
    /// read from the file keep their case.
    pub fn load_layered(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// `load_layered` with an explicit environment instead of the process one
    fn load_with_env(
        path: &Path,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut table = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str::<toml::Table>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(e.into()),
        };

        let overrides: toml::Table = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        if !overrides.is_empty() {
            tracing::debug!("Applying {} environment override section(s)", overrides.len());
        }
        merge_tables(&mut table, overrides);

        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Whether an emulator may be used. Emulators are enabled unless listed as disabled.
    pub fn is_emulator_enabled(&self, emulator_id: &str) -> bool {
        !self.emulators.disabled.contains(emulator_id)
    }

    /// User-configured executable path for an emulator, if any
    pub fn custom_path(&self, emulator_id: &str) -> Option<&Path> {
        self.emulators
            .custom_paths
            .get(emulator_id)
            .map(PathBuf::as_path)
    }

    /// User's default emulator for a platform, if any
    pub fn platform_default(&self, platform: &str) -> Option<&str> {
        self.emulators
            .platform_defaults
            .get(platform)
            .map(String::as_str)
    }
}

/// Recursively overlay `overrides` onto `base`; scalar values replace
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(nested) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, nested);
                } else {
                    base.insert(key, toml::Value::Table(nested));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
