//! Static table of known emulator programs

use crate::retroarch::{self, CoreChoice};
use romdock_library::Platform;
use std::collections::HashMap;
use std::path::Path;

/// Operating system family, deciding install locations and library extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
}

impl HostOs {
    /// OS this binary was compiled for
    pub fn current() -> Self {
        if cfg!(windows) {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else {
            HostOs::Linux
        }
    }

    /// Extension of shared libraries (emulation cores)
    pub fn shared_library_extension(&self) -> &'static str {
        match self {
            HostOs::Windows => "dll",
            HostOs::MacOs => "dylib",
            HostOs::Linux => "so",
        }
    }
}

/// Emulator-specific checks run before spawning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// PS3 system firmware (`dev_flash`) must be installed
    Ps3Firmware,
    /// Original Xbox boot ROM, flash ROM and HDD image must be configured
    XboxBios,
    /// Stored controller profile is written to Dolphin's pad config (best effort)
    DolphinControllerProfile,
}

/// How an emulator's command line is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgStrategy {
    /// Just the ROM path
    RomOnly,
    /// Fixed flags followed by the ROM path
    FlagsThenRom(Vec<String>),
    /// Core selection (`-L`) followed by the ROM path
    RetroArch,
    /// Batch mode, no GUI, boot the ROM
    Dolphin,
    /// Boot without the game list
    Rpcs3,
    /// Disc image passed as the DVD drive
    Xemu,
    /// ROM directory plus the set name
    Mame,
}

/// Inputs that depend on the resolved installation rather than the ROM
#[derive(Debug, Clone)]
pub struct LaunchContext<'a> {
    pub platform: Platform,
    pub executable: &'a Path,
    pub core: Option<CoreChoice>,
}

/// Static description of one supported external emulator
#[derive(Debug, Clone)]
pub struct EmulatorDefinition {
    /// Identifier used in config files and game preferences
    pub id: String,

    /// Display name
    pub name: String,

    /// Executable file name (without `.exe`; Windows adds it unless overridden)
    pub executable: String,

    /// Per-OS executable name overrides
    pub executable_overrides: HashMap<HostOs, String>,

    /// Supported platforms
    pub platforms: Vec<Platform>,

    /// Candidate install directories per OS, in search order
    pub install_dirs: HashMap<HostOs, Vec<String>>,

    /// Command line builder
    pub args: ArgStrategy,

    /// Pre-launch checks
    pub requirements: Vec<Requirement>,

    pub can_install: bool,
    pub skips_version_check: bool,
    pub supports_version_flag: bool,
}

impl EmulatorDefinition {
    /// Create a definition that takes the ROM path as its only argument
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            executable: executable.into(),
            executable_overrides: HashMap::new(),
            platforms: Vec::new(),
            install_dirs: HashMap::new(),
            args: ArgStrategy::RomOnly,
            requirements: Vec::new(),
            can_install: false,
            skips_version_check: false,
            supports_version_flag: false,
        }
    }

    /// Add supported platforms
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms.extend(platforms);
        self
    }

    /// Add candidate install directories for one OS
    pub fn with_dirs<S: Into<String>>(
        mut self,
        os: HostOs,
        dirs: impl IntoIterator<Item = S>,
    ) -> Self {
        self.install_dirs
            .entry(os)
            .or_default()
            .extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Use a different executable name on one OS
    pub fn with_executable_on(mut self, os: HostOs, executable: impl Into<String>) -> Self {
        self.executable_overrides.insert(os, executable.into());
        self
    }

    pub fn with_args(mut self, args: ArgStrategy) -> Self {
        self.args = args;
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn installable(mut self) -> Self {
        self.can_install = true;
        self
    }

    pub fn with_version_flag(mut self) -> Self {
        self.supports_version_flag = true;
        self
    }

    pub fn skip_version_check(mut self) -> Self {
        self.skips_version_check = true;
        self
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn requires(&self, requirement: Requirement) -> bool {
        self.requirements.contains(&requirement)
    }

    /// Executable file name on `os`
    pub fn executable_for(&self, os: HostOs) -> String {
        match self.executable_overrides.get(&os) {
            Some(name) => name.clone(),
            None if os == HostOs::Windows && !self.executable.ends_with(".exe") => {
                format!("{}.exe", self.executable)
            }
            None => self.executable.clone(),
        }
    }

    /// Candidate install directories on `os`
    pub fn dirs_for(&self, os: HostOs) -> &[String] {
        self.install_dirs.get(&os).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Command line arguments for launching `rom`
    pub fn arguments_for(&self, rom: &Path, context: Option<&LaunchContext<'_>>) -> Vec<String> {
        let rom_arg = rom.to_string_lossy().to_string();

        match &self.args {
            ArgStrategy::RomOnly => vec![rom_arg],
            ArgStrategy::FlagsThenRom(flags) => {
                let mut args = flags.clone();
                args.push(rom_arg);
                args
            }
            ArgStrategy::RetroArch => {
                let mut args = context
                    .and_then(|ctx| ctx.core.as_ref())
                    .map(retroarch::core_arguments)
                    .unwrap_or_default();
                args.push(rom_arg);
                args
            }
            ArgStrategy::Dolphin => vec!["-b".into(), "-e".into(), rom_arg],
            ArgStrategy::Rpcs3 => vec!["--no-gui".into(), rom_arg],
            ArgStrategy::Xemu => vec!["-full-screen".into(), "-dvd_path".into(), rom_arg],
            ArgStrategy::Mame => {
                let rom_dir = rom
                    .parent()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| ".".into());
                let set_name = rom
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or(rom_arg);
                vec!["-rompath".into(), rom_dir, set_name]
            }
        }
    }
}

/// Ordered emulator table. Order matters: platform fallback picks the first match.
#[derive(Debug, Clone)]
pub struct Catalog {
    emulators: Vec<EmulatorDefinition>,
}

impl Catalog {
    pub fn new(emulators: Vec<EmulatorDefinition>) -> Self {
        Self { emulators }
    }

    /// Get emulator by id
    pub fn get(&self, id: &str) -> Option<&EmulatorDefinition> {
        self.emulators.iter().find(|e| e.id == id)
    }

    /// All emulators, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &EmulatorDefinition> {
        self.emulators.iter()
    }

    /// Emulators supporting a platform, in catalog order
    pub fn for_platform(&self, platform: Platform) -> impl Iterator<Item = &EmulatorDefinition> {
        self.emulators.iter().filter(move |e| e.supports(platform))
    }

    pub fn len(&self) -> usize {
        self.emulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emulators.is_empty()
    }

    /// Built-in emulator table
    pub fn builtin() -> Self {
        use HostOs::{Linux, MacOs, Windows};

        let unix_bins = ["~/.local/bin", "/usr/local/bin", "/usr/bin", "~/Applications"];
        let flags = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let emulators = vec![
            EmulatorDefinition::new("retroarch", "RetroArch", "retroarch")
                .with_platforms(retroarch::supported_platforms())
                .with_args(ArgStrategy::RetroArch)
                .with_executable_on(MacOs, "RetroArch")
                .with_dirs(
                    Windows,
                    [
                        r"C:\RetroArch-Win64",
                        r"%PROGRAMFILES%\RetroArch",
                        r"%APPDATA%\RetroArch",
                        r"%USERPROFILE%\RetroArch",
                    ],
                )
                .with_dirs(
                    MacOs,
                    [
                        "/Applications/RetroArch.app/Contents/MacOS",
                        "~/Applications/RetroArch.app/Contents/MacOS",
                    ],
                )
                .with_dirs(Linux, unix_bins)
                .with_dirs(Linux, ["/snap/bin"])
                .installable()
                .with_version_flag(),
            EmulatorDefinition::new("dolphin", "Dolphin", "dolphin-emu")
                .with_platforms([Platform::GameCube, Platform::Wii])
                .with_args(ArgStrategy::Dolphin)
                .with_requirement(Requirement::DolphinControllerProfile)
                .with_executable_on(Windows, "Dolphin.exe")
                .with_executable_on(MacOs, "Dolphin")
                .with_dirs(
                    Windows,
                    [r"%PROGRAMFILES%\Dolphin", r"%LOCALAPPDATA%\Dolphin", r"C:\Dolphin"],
                )
                .with_dirs(
                    MacOs,
                    [
                        "/Applications/Dolphin.app/Contents/MacOS",
                        "~/Applications/Dolphin.app/Contents/MacOS",
                    ],
                )
                .with_dirs(Linux, unix_bins)
                .installable()
                .with_version_flag(),
            EmulatorDefinition::new("rpcs3", "RPCS3", "rpcs3")
                .with_platforms([Platform::Ps3])
                .with_args(ArgStrategy::Rpcs3)
                .with_requirement(Requirement::Ps3Firmware)
                .with_dirs(
                    Windows,
                    [r"C:\rpcs3", r"%PROGRAMFILES%\RPCS3", r"%USERPROFILE%\rpcs3"],
                )
                .with_dirs(
                    MacOs,
                    [
                        "/Applications/RPCS3.app/Contents/MacOS",
                        "~/Applications/RPCS3.app/Contents/MacOS",
                    ],
                )
                .with_dirs(Linux, unix_bins)
                .installable()
                .skip_version_check(),
            EmulatorDefinition::new("xemu", "xemu", "xemu")
                .with_platforms([Platform::Xbox])
                .with_args(ArgStrategy::Xemu)
                .with_requirement(Requirement::XboxBios)
                .with_dirs(
                    Windows,
                    [r"%PROGRAMFILES%\xemu", r"%LOCALAPPDATA%\xemu", r"C:\xemu"],
                )
                .with_dirs(MacOs, ["/Applications/xemu.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins)
                .installable()
                .with_version_flag(),
            EmulatorDefinition::new("pcsx2", "PCSX2", "pcsx2-qt")
                .with_platforms([Platform::Ps2])
                .with_args(ArgStrategy::FlagsThenRom(flags(&["-batch", "-fullscreen", "--"])))
                .with_executable_on(MacOs, "PCSX2")
                .with_dirs(Windows, [r"%PROGRAMFILES%\PCSX2", r"%LOCALAPPDATA%\PCSX2"])
                .with_dirs(MacOs, ["/Applications/PCSX2.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins)
                .installable(),
            EmulatorDefinition::new("duckstation", "DuckStation", "duckstation-qt")
                .with_platforms([Platform::Ps1])
                .with_args(ArgStrategy::FlagsThenRom(flags(&["-batch", "-fullscreen", "--"])))
                .with_executable_on(Windows, "duckstation-qt-x64-ReleaseLTCG.exe")
                .with_executable_on(MacOs, "DuckStation")
                .with_dirs(Windows, [r"%LOCALAPPDATA%\DuckStation", r"%PROGRAMFILES%\DuckStation"])
                .with_dirs(MacOs, ["/Applications/DuckStation.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins),
            EmulatorDefinition::new("ppsspp", "PPSSPP", "PPSSPPSDL")
                .with_platforms([Platform::Psp])
                .with_args(ArgStrategy::FlagsThenRom(flags(&["--fullscreen"])))
                .with_executable_on(Windows, "PPSSPPWindows64.exe")
                .with_dirs(Windows, [r"%PROGRAMFILES%\PPSSPP"])
                .with_dirs(MacOs, ["/Applications/PPSSPPSDL.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins)
                .installable()
                .with_version_flag(),
            EmulatorDefinition::new("mgba", "mGBA", "mgba-qt")
                .with_platforms([
                    Platform::GameBoy,
                    Platform::GameBoyColor,
                    Platform::GameBoyAdvance,
                ])
                .with_args(ArgStrategy::FlagsThenRom(flags(&["-f"])))
                .with_executable_on(Windows, "mGBA.exe")
                .with_executable_on(MacOs, "mGBA")
                .with_dirs(Windows, [r"%PROGRAMFILES%\mGBA"])
                .with_dirs(MacOs, ["/Applications/mGBA.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins)
                .with_version_flag(),
            EmulatorDefinition::new("melonds", "melonDS", "melonDS")
                .with_platforms([Platform::Nds])
                .with_dirs(Windows, [r"%PROGRAMFILES%\melonDS", r"%USERPROFILE%\melonDS"])
                .with_dirs(MacOs, ["/Applications/melonDS.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins),
            EmulatorDefinition::new("citra", "Citra", "citra-qt")
                .with_platforms([Platform::N3ds])
                .with_dirs(Windows, [r"%LOCALAPPDATA%\Citra\nightly"])
                .with_dirs(MacOs, ["/Applications/Citra.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins),
            EmulatorDefinition::new("ryujinx", "Ryujinx", "Ryujinx")
                .with_platforms([Platform::Switch])
                .with_args(ArgStrategy::FlagsThenRom(flags(&["--fullscreen"])))
                .with_dirs(Windows, [r"%LOCALAPPDATA%\Ryujinx", r"%PROGRAMFILES%\Ryujinx"])
                .with_dirs(MacOs, ["/Applications/Ryujinx.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins)
                .skip_version_check(),
            EmulatorDefinition::new("snes9x", "Snes9x", "snes9x-gtk")
                .with_platforms([Platform::Snes])
                .with_executable_on(Windows, "snes9x-x64.exe")
                .with_executable_on(MacOs, "Snes9x")
                .with_dirs(Windows, [r"%PROGRAMFILES%\Snes9x"])
                .with_dirs(MacOs, ["/Applications/Snes9x.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins),
            EmulatorDefinition::new("mesen", "Mesen", "Mesen")
                .with_platforms([Platform::Nes, Platform::Snes, Platform::PcEngine])
                .with_dirs(Windows, [r"%PROGRAMFILES%\Mesen", r"%USERPROFILE%\Mesen"])
                .with_dirs(MacOs, ["/Applications/Mesen.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins),
            EmulatorDefinition::new("flycast", "Flycast", "flycast")
                .with_platforms([Platform::Dreamcast])
                .with_executable_on(MacOs, "Flycast")
                .with_dirs(Windows, [r"%PROGRAMFILES%\Flycast"])
                .with_dirs(MacOs, ["/Applications/Flycast.app/Contents/MacOS"])
                .with_dirs(Linux, unix_bins),
            EmulatorDefinition::new("mame", "MAME", "mame")
                .with_platforms([Platform::Arcade])
                .with_args(ArgStrategy::Mame)
                .with_dirs(Windows, [r"C:\mame", r"%PROGRAMFILES%\MAME"])
                .with_dirs(MacOs, ["/opt/homebrew/bin", "/usr/local/bin"])
                .with_dirs(Linux, unix_bins),
        ];

        Self::new(emulators)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn test_builtin_ids_are_unique() {
        let catalog = Catalog::builtin();
        let ids: HashSet<_> = catalog.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_builtin_has_dirs_for_every_os() {
        for emulator in Catalog::builtin().iter() {
            for os in [HostOs::Windows, HostOs::MacOs, HostOs::Linux] {
                assert!(
                    !emulator.dirs_for(os).is_empty(),
                    "{} has no {:?} install dirs",
                    emulator.id,
                    os
                );
            }
        }
    }

    #[test]
    fn test_platform_lookup_in_catalog_order() {
        let catalog = Catalog::builtin();
        let wii: Vec<_> = catalog.for_platform(Platform::Wii).map(|e| e.id.as_str()).collect();
        assert_eq!(wii, ["retroarch", "dolphin"]);

        let ps3: Vec<_> = catalog.for_platform(Platform::Ps3).map(|e| e.id.as_str()).collect();
        assert_eq!(ps3, ["rpcs3"]);
    }

    #[test]
    fn test_executable_names_per_os() {
        let catalog = Catalog::builtin();
        let rpcs3 = catalog.get("rpcs3").unwrap();
        assert_eq!(rpcs3.executable_for(HostOs::Linux), "rpcs3");
        assert_eq!(rpcs3.executable_for(HostOs::Windows), "rpcs3.exe");

        let dolphin = catalog.get("dolphin").unwrap();
        assert_eq!(dolphin.executable_for(HostOs::Windows), "Dolphin.exe");
        assert_eq!(dolphin.executable_for(HostOs::MacOs), "Dolphin");
    }

    #[test]
    fn test_arguments_for_strategies() {
        let catalog = Catalog::builtin();
        let rom = PathBuf::from("/roms/wii/game.wbfs");

        assert_eq!(
            catalog.get("dolphin").unwrap().arguments_for(&rom, None),
            ["-b", "-e", "/roms/wii/game.wbfs"]
        );
        assert_eq!(
            catalog.get("pcsx2").unwrap().arguments_for(&rom, None),
            ["-batch", "-fullscreen", "--", "/roms/wii/game.wbfs"]
        );
        assert_eq!(
            catalog.get("melonds").unwrap().arguments_for(&rom, None),
            ["/roms/wii/game.wbfs"]
        );
        assert_eq!(
            catalog
                .get("mame")
                .unwrap()
                .arguments_for(Path::new("/roms/arcade/sf2.zip"), None),
            ["-rompath", "/roms/arcade", "sf2"]
        );
    }

    #[test]
    fn test_retroarch_arguments_use_core_choice() {
        let retroarch = Catalog::builtin().get("retroarch").cloned().unwrap();
        let rom = PathBuf::from("/roms/snes/game.sfc");
        let exe = PathBuf::from("/opt/retroarch/retroarch");

        let ctx = LaunchContext {
            platform: Platform::Snes,
            executable: &exe,
            core: Some(CoreChoice::Explicit(PathBuf::from(
                "/opt/retroarch/cores/snes9x_libretro.so",
            ))),
        };
        assert_eq!(
            retroarch.arguments_for(&rom, Some(&ctx)),
            ["-L", "/opt/retroarch/cores/snes9x_libretro.so", "/roms/snes/game.sfc"]
        );

        let ctx = LaunchContext {
            core: Some(CoreChoice::AutoDetect("snes9x".into())),
            ..ctx
        };
        assert_eq!(
            retroarch.arguments_for(&rom, Some(&ctx)),
            ["-L", "snes9x", "/roms/snes/game.sfc"]
        );

        assert_eq!(retroarch.arguments_for(&rom, None), ["/roms/snes/game.sfc"]);
    }
}
