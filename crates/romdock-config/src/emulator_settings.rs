//! Emulator, BIOS, embedded core and controller settings

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// External emulator discovery and selection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmulatorSettings {
    /// Executable paths set by the user, keyed by emulator id
    #[serde(default)]
    pub custom_paths: BTreeMap<String, PathBuf>,

    /// Default emulator per platform id
    #[serde(default)]
    pub platform_defaults: BTreeMap<String, String>,

    /// Emulators the user has switched off
    #[serde(default)]
    pub disabled: BTreeSet<String>,
}

/// BIOS images required by emulators that cannot boot without them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiosSettings {
    /// Original Xbox MCPX boot ROM
    #[serde(default)]
    pub xbox_boot_rom: Option<PathBuf>,

    /// Original Xbox flash ROM (kernel image)
    #[serde(default)]
    pub xbox_flash_rom: Option<PathBuf>,

    /// Original Xbox hard disk image
    #[serde(default)]
    pub xbox_hdd_image: Option<PathBuf>,
}

impl BiosSettings {
    /// Xbox BIOS entries as (setting key, configured path) pairs
    pub fn xbox_files(&self) -> [(&'static str, Option<&Path>); 3] {
        [
            ("bios.xbox_boot_rom", self.xbox_boot_rom.as_deref()),
            ("bios.xbox_flash_rom", self.xbox_flash_rom.as_deref()),
            ("bios.xbox_hdd_image", self.xbox_hdd_image.as_deref()),
        ]
    }
}

/// In-process emulation core settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedSettings {
    /// Prefer an installed embedded core over an external emulator
    #[serde(default)]
    pub prefer_embedded: bool,

    /// Allow embedded play at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding installed cores
    #[serde(default = "default_cores_dir")]
    pub cores_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_cores_dir() -> PathBuf {
    crate::default_data_dir().join("cores")
}

impl Default for EmbeddedSettings {
    fn default() -> Self {
        Self {
            prefer_embedded: false,
            enabled: true,
            cores_dir: default_cores_dir(),
        }
    }
}

/// A controller mapping written into an emulator's own config before launch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerProfile {
    /// Input device string as the emulator expects it (e.g. `SDL/0/Xbox Controller`)
    pub device: String,

    /// Emulator control name to device input expression
    #[serde(default)]
    pub buttons: BTreeMap<String, String>,
}

/// Stored controller profiles per emulator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Applied to Dolphin's GameCube pad configuration
    #[serde(default)]
    pub dolphin: Option<ControllerProfile>,
}

/// Game library storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directories scanned by `import`
    #[serde(default)]
    pub rom_dirs: Vec<PathBuf>,
}

fn default_database_path() -> PathBuf {
    crate::default_data_dir().join("library.db")
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            rom_dirs: Vec::new(),
        }
    }
}
