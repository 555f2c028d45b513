//! Checks that must pass before an emulator is spawned

use crate::controller::{apply_dolphin_profile, dolphin_pad_config_path};
use crate::{HostOs, LaunchError, Requirement, ResolvedEmulator};
use romdock_config::{BiosSettings, ConfigStore, LauncherConfig};
use romdock_library::{GameRecord, Platform};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Path to launch for a stored ROM path.
///
/// Disc-based platforms launch a raw `.bin` track through the `.cue` sheet
/// with the same base name when one exists. The result must exist on disk.
pub fn resolve_rom_path(rom: &Path, platform: Platform) -> Result<PathBuf, LaunchError> {
    let is_bin = rom
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));

    let resolved = if platform.is_disc_based() && is_bin {
        ["cue", "CUE"]
            .into_iter()
            .map(|ext| rom.with_extension(ext))
            .find(|cue| cue.is_file())
            .unwrap_or_else(|| rom.to_path_buf())
    } else {
        rom.to_path_buf()
    };

    if !resolved.exists() {
        return Err(LaunchError::RomFileNotFound(resolved));
    }
    Ok(resolved)
}

/// Setup that runs after every veto check passed; failures are only logged
type BestEffortStep = fn(&PreconditionValidator, &ResolvedEmulator, &LauncherConfig);

/// Emulator-specific launch gate: firmware, BIOS, ROM and controller setup
pub struct PreconditionValidator {
    config: Arc<dyn ConfigStore>,
    os: HostOs,
    config_root: Option<PathBuf>,
}

impl PreconditionValidator {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self {
            config,
            os: HostOs::current(),
            config_root: dirs::config_dir(),
        }
    }

    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    /// Override the per-user application config root (`~/.config` on Linux)
    pub fn with_config_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config_root = Some(root.into());
        self
    }

    /// Run every check for `emulator` and return the ROM path to launch.
    ///
    /// Firmware, BIOS and ROM failures veto the launch. Controller setup is
    /// best effort and only logged.
    pub fn check(
        &self,
        emulator: &ResolvedEmulator,
        game: &GameRecord,
    ) -> Result<PathBuf, LaunchError> {
        let config = self.config.get();
        let mut best_effort: Vec<BestEffortStep> = Vec::new();

        for requirement in &emulator.definition.requirements {
            match requirement {
                Requirement::Ps3Firmware => self.check_firmware(emulator)?,
                Requirement::XboxBios => check_bios(&config.bios)?,
                Requirement::DolphinControllerProfile => {
                    best_effort.push(Self::configure_controller)
                }
            }
        }

        let rom = resolve_rom_path(&game.path, game.platform)?;

        // Only once nothing else can veto the launch
        for step in best_effort {
            step(self, emulator, &config);
        }

        Ok(rom)
    }

    /// Where installed PS3 firmware may live: beside the executable, then the user config root
    pub fn firmware_locations(&self, executable: &Path) -> Vec<PathBuf> {
        let beside = executable.parent().map(|dir| dir.join("dev_flash"));
        let app_data = self
            .config_root
            .as_ref()
            .map(|root| root.join("rpcs3").join("dev_flash"));

        beside.into_iter().chain(app_data).collect()
    }

    fn check_firmware(&self, emulator: &ResolvedEmulator) -> Result<(), LaunchError> {
        let locations = self.firmware_locations(&emulator.executable);
        if locations.iter().any(|dir| dir.is_dir()) {
            return Ok(());
        }

        let searched = locations
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(LaunchError::FirmwareMissing {
            emulator: emulator.definition.name.clone(),
            searched,
        })
    }

    fn configure_controller(&self, emulator: &ResolvedEmulator, config: &LauncherConfig) {
        let Some(profile) = &config.controllers.dolphin else {
            return;
        };

        let Some(file) =
            dolphin_pad_config_path(&emulator.executable, self.os, self.config_root.as_deref())
        else {
            tracing::warn!("Cannot locate Dolphin's config directory, skipping controller setup");
            return;
        };

        if let Err(e) = apply_dolphin_profile(profile, &file) {
            tracing::warn!(
                "Failed to apply controller profile to {}: {}",
                file.display(),
                e
            );
        }
    }
}

/// All three Xbox BIOS files must be configured and present
fn check_bios(bios: &BiosSettings) -> Result<(), LaunchError> {
    let missing: Vec<String> = bios
        .xbox_files()
        .into_iter()
        .filter_map(|(key, path)| match path {
            None => Some(format!("{} (not set)", key)),
            Some(path) if !path.is_file() => Some(format!("{}: {}", key, path.display())),
            Some(_) => None,
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LaunchError::BiosFilesMissing(missing))
    }
}
