//! Emulator management for romdock
//!
//! Decides which external emulator (or embedded core) runs a game, finds the
//! emulator on disk, checks firmware, BIOS and ROM preconditions, launches the
//! process detached from the manager and accrues play time when it exits.

mod catalog;
mod controller;
mod embedded;
mod launcher;
mod locator;
mod preconditions;
mod retroarch;
mod selection;
mod session;
mod version;

pub use catalog::{
    ArgStrategy, Catalog, EmulatorDefinition, HostOs, LaunchContext, Requirement,
};
pub use controller::{apply_dolphin_profile, dolphin_pad_config_path};
pub use embedded::{CoreDirectory, CoreManager, EmbeddedSessionTracker, InstalledCore};
pub use launcher::{ExternalLaunch, GameLauncher, GameLauncherBuilder, PlayOutcome};
pub use locator::{BinaryLocator, expand_candidate};
pub use preconditions::{PreconditionValidator, resolve_rom_path};
pub use retroarch::{CoreChoice, core_for_platform, select_core};
pub use selection::{ResolvedEmulator, SelectionPolicy};
pub use session::{
    Clock, SessionEvent, SessionKind, SessionObserver, SessionTracker, SystemClock,
};
pub use version::{EmulatorVersion, VERSION_PROBE_TIMEOUT, probe_version};

use romdock_library::{GameId, LibraryError, Platform};
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to the caller of `launch`, `play` or `start_session`
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Game {0} is not in the library")]
    GameNotFound(GameId),

    #[error("{0} is not installed. Install it or set its path under [emulators.custom_paths]")]
    EmulatorNotInstalled(String),

    #[error("{0} is disabled. Remove it from emulators.disabled to use it")]
    EmulatorDisabled(String),

    #[error("No emulator configured for platform {0}. Install a supported emulator or set emulators.platform_defaults")]
    NoEmulatorForPlatform(Platform),

    #[error(
        "{emulator} firmware is not installed (looked in {searched}). Download the official firmware and install it from the emulator's File > Install Firmware menu"
    )]
    FirmwareMissing { emulator: String, searched: String },

    #[error("Missing BIOS files: {}. Set them under [bios] in the configuration", .0.join(", "))]
    BiosFilesMissing(Vec<String>),

    #[error("ROM file not found: {0}")]
    RomFileNotFound(PathBuf),

    #[error("Failed to start {emulator}: {source}")]
    SpawnFailure {
        emulator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No embedded core installed for platform {0}")]
    CoreNotInstalled(Platform),

    #[error("Embedded play is disabled. Set embedded.enabled = true to use installed cores")]
    EmbeddedDisabled,

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}
