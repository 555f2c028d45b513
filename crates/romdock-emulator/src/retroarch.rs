//! RetroArch core selection

use crate::HostOs;
use romdock_library::Platform;
use std::path::{Path, PathBuf};

/// Default libretro core per platform
const PLATFORM_CORES: &[(Platform, &str)] = &[
    (Platform::Nes, "mesen"),
    (Platform::Snes, "snes9x"),
    (Platform::N64, "mupen64plus_next"),
    (Platform::GameBoy, "gambatte"),
    (Platform::GameBoyColor, "gambatte"),
    (Platform::GameBoyAdvance, "mgba"),
    (Platform::Nds, "melonds"),
    (Platform::N3ds, "citra"),
    (Platform::GameCube, "dolphin"),
    (Platform::Wii, "dolphin"),
    (Platform::Genesis, "genesis_plus_gx"),
    (Platform::MasterSystem, "genesis_plus_gx"),
    (Platform::GameGear, "genesis_plus_gx"),
    (Platform::SegaCd, "genesis_plus_gx"),
    (Platform::Saturn, "mednafen_saturn"),
    (Platform::Dreamcast, "flycast"),
    (Platform::Ps1, "pcsx_rearmed"),
    (Platform::Psp, "ppsspp"),
    (Platform::PcEngine, "mednafen_pce_fast"),
    (Platform::Arcade, "fbneo"),
];

/// Which core RetroArch is told to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreChoice {
    /// Core file found next to the executable
    Explicit(PathBuf),
    /// Core name only; RetroArch resolves it from its own core directory
    AutoDetect(String),
}

/// Default core name for a platform
pub fn core_for_platform(platform: Platform) -> Option<&'static str> {
    PLATFORM_CORES
        .iter()
        .find(|(p, _)| *p == platform)
        .map(|(_, core)| *core)
}

/// Platforms RetroArch can run with a mapped core
pub(crate) fn supported_platforms() -> Vec<Platform> {
    PLATFORM_CORES.iter().map(|(p, _)| *p).collect()
}

/// File name of a core library, e.g. `snes9x_libretro.so`
pub(crate) fn core_file_name(core: &str, os: HostOs) -> String {
    format!("{}_libretro.{}", core, os.shared_library_extension())
}

/// Pick the core for `platform` given the RetroArch executable.
///
/// A core file in the `cores` directory beside the executable is passed by
/// path. A missing file is not an error: the core name is passed and
/// RetroArch searches its own directories.
pub fn select_core(executable: &Path, platform: Platform, os: HostOs) -> Option<CoreChoice> {
    let core = core_for_platform(platform)?;

    let candidate = executable
        .parent()
        .map(|dir| dir.join("cores").join(core_file_name(core, os)));

    match candidate {
        Some(path) if path.is_file() => {
            tracing::debug!("Using RetroArch core {}", path.display());
            Some(CoreChoice::Explicit(path))
        }
        _ => {
            tracing::debug!(
                "No bundled {} core beside {}, letting RetroArch find it",
                core,
                executable.display()
            );
            Some(CoreChoice::AutoDetect(core.to_string()))
        }
    }
}

/// `-L` arguments for a core choice
pub(crate) fn core_arguments(choice: &CoreChoice) -> Vec<String> {
    match choice {
        CoreChoice::Explicit(path) => vec!["-L".into(), path.to_string_lossy().to_string()],
        CoreChoice::AutoDetect(core) => vec!["-L".into(), core.clone()],
    }
}
