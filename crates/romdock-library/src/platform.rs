//! Platform identifiers and ROM-to-platform detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported game platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Platform {
    // Nintendo
    #[serde(rename = "nes")]
    Nes,
    #[serde(rename = "snes")]
    Snes,
    #[serde(rename = "n64")]
    N64,
    #[serde(rename = "gb")]
    GameBoy,
    #[serde(rename = "gbc")]
    GameBoyColor,
    #[serde(rename = "gba")]
    GameBoyAdvance,
    #[serde(rename = "nds")]
    Nds,
    #[serde(rename = "3ds")]
    N3ds,
    #[serde(rename = "gamecube")]
    GameCube,
    #[serde(rename = "wii")]
    Wii,
    #[serde(rename = "switch")]
    Switch,

    // Sega
    #[serde(rename = "genesis")]
    Genesis,
    #[serde(rename = "sms")]
    MasterSystem,
    #[serde(rename = "gg")]
    GameGear,
    #[serde(rename = "segacd")]
    SegaCd,
    #[serde(rename = "saturn")]
    Saturn,
    #[serde(rename = "dreamcast")]
    Dreamcast,

    // Sony
    #[serde(rename = "ps1")]
    Ps1,
    #[serde(rename = "ps2")]
    Ps2,
    #[serde(rename = "ps3")]
    Ps3,
    #[serde(rename = "psp")]
    Psp,

    // Other
    #[serde(rename = "xbox")]
    Xbox,
    #[serde(rename = "pce")]
    PcEngine,
    #[serde(rename = "arcade")]
    Arcade,

    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Platform {
    pub const ALL: [Platform; 25] = [
        Platform::Nes,
        Platform::Snes,
        Platform::N64,
        Platform::GameBoy,
        Platform::GameBoyColor,
        Platform::GameBoyAdvance,
        Platform::Nds,
        Platform::N3ds,
        Platform::GameCube,
        Platform::Wii,
        Platform::Switch,
        Platform::Genesis,
        Platform::MasterSystem,
        Platform::GameGear,
        Platform::SegaCd,
        Platform::Saturn,
        Platform::Dreamcast,
        Platform::Ps1,
        Platform::Ps2,
        Platform::Ps3,
        Platform::Psp,
        Platform::Xbox,
        Platform::PcEngine,
        Platform::Arcade,
        Platform::Unknown,
    ];

    /// Stable identifier used in config files and the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Nes => "nes",
            Platform::Snes => "snes",
            Platform::N64 => "n64",
            Platform::GameBoy => "gb",
            Platform::GameBoyColor => "gbc",
            Platform::GameBoyAdvance => "gba",
            Platform::Nds => "nds",
            Platform::N3ds => "3ds",
            Platform::GameCube => "gamecube",
            Platform::Wii => "wii",
            Platform::Switch => "switch",
            Platform::Genesis => "genesis",
            Platform::MasterSystem => "sms",
            Platform::GameGear => "gg",
            Platform::SegaCd => "segacd",
            Platform::Saturn => "saturn",
            Platform::Dreamcast => "dreamcast",
            Platform::Ps1 => "ps1",
            Platform::Ps2 => "ps2",
            Platform::Ps3 => "ps3",
            Platform::Psp => "psp",
            Platform::Xbox => "xbox",
            Platform::PcEngine => "pce",
            Platform::Arcade => "arcade",
            Platform::Unknown => "unknown",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Nes => "Nintendo Entertainment System",
            Platform::Snes => "Super Nintendo",
            Platform::N64 => "Nintendo 64",
            Platform::GameBoy => "Game Boy",
            Platform::GameBoyColor => "Game Boy Color",
            Platform::GameBoyAdvance => "Game Boy Advance",
            Platform::Nds => "Nintendo DS",
            Platform::N3ds => "Nintendo 3DS",
            Platform::GameCube => "Nintendo GameCube",
            Platform::Wii => "Nintendo Wii",
            Platform::Switch => "Nintendo Switch",
            Platform::Genesis => "Sega Genesis",
            Platform::MasterSystem => "Sega Master System",
            Platform::GameGear => "Sega Game Gear",
            Platform::SegaCd => "Sega CD",
            Platform::Saturn => "Sega Saturn",
            Platform::Dreamcast => "Sega Dreamcast",
            Platform::Ps1 => "Sony PlayStation",
            Platform::Ps2 => "Sony PlayStation 2",
            Platform::Ps3 => "Sony PlayStation 3",
            Platform::Psp => "Sony PSP",
            Platform::Xbox => "Microsoft Xbox",
            Platform::PcEngine => "PC Engine / TurboGrafx-16",
            Platform::Arcade => "Arcade",
            Platform::Unknown => "Unknown",
        }
    }

    /// Disc-based platforms whose raw `.bin` tracks are launched through a `.cue` sheet
    pub fn is_disc_based(&self) -> bool {
        matches!(
            self,
            Platform::Ps1
                | Platform::Ps2
                | Platform::SegaCd
                | Platform::Saturn
                | Platform::Dreamcast
                | Platform::PcEngine
        )
    }

    /// Platform for an unambiguous file extension. Ambiguous and unrecognized
    /// extensions yield `Unknown`.
    pub fn from_extension(ext: &str) -> Platform {
        match ext.to_lowercase().as_str() {
            "nes" | "fds" | "unf" => Platform::Nes,
            "smc" | "sfc" | "fig" | "swc" => Platform::Snes,
            "n64" | "z64" | "v64" => Platform::N64,
            "gb" => Platform::GameBoy,
            "gbc" => Platform::GameBoyColor,
            "gba" => Platform::GameBoyAdvance,
            "nds" | "dsi" => Platform::Nds,
            "3ds" | "cia" | "cci" | "cxi" => Platform::N3ds,
            "gcm" => Platform::GameCube,
            "wbfs" | "wad" => Platform::Wii,
            "nsp" | "xci" | "nro" => Platform::Switch,
            "md" | "gen" | "smd" => Platform::Genesis,
            "sms" => Platform::MasterSystem,
            "gg" => Platform::GameGear,
            "gdi" | "cdi" => Platform::Dreamcast,
            "pbp" | "cso" => Platform::Psp,
            "xbe" => Platform::Xbox,
            "pce" => Platform::PcEngine,
            // iso, bin, cue, chd, img, rvz, zip, ... are shared by several platforms
            _ => Platform::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognized platform identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform(pub String);

impl fmt::Display for UnknownPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown platform identifier: {}", self.0)
    }
}

impl std::error::Error for UnknownPlatform {}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == id)
            .ok_or(UnknownPlatform(s.to_string()))
    }
}

/// Folder and filename hints, most specific platforms first so that
/// "PS3" is never read as "PS" (PlayStation).
const PLATFORM_HINTS: &[(Platform, &[&str])] = &[
    (
        Platform::Ps3,
        &["ps3", "playstation 3", "playstation3", "rpcs3"],
    ),
    (
        Platform::Ps2,
        &["ps2", "playstation 2", "playstation2", "pcsx2"],
    ),
    (Platform::Psp, &["psp", "playstation portable"]),
    (
        Platform::Ps1,
        &["ps1", "psx", "psone", "playstation 1", "playstation", "ps"],
    ),
    (Platform::Xbox, &["xbox", "xemu"]),
    (Platform::Wii, &["wii"]),
    (Platform::GameCube, &["gamecube", "gc", "ngc"]),
    (Platform::Switch, &["switch"]),
    (Platform::N3ds, &["3ds"]),
    (Platform::Saturn, &["saturn"]),
    (
        Platform::SegaCd,
        &["segacd", "sega cd", "mega cd", "megacd"],
    ),
    (Platform::Dreamcast, &["dreamcast", "dc"]),
    (
        Platform::PcEngine,
        &["pc engine", "pcengine", "turbografx", "tg16", "pce"],
    ),
    (Platform::Genesis, &["genesis", "mega drive", "megadrive"]),
    (Platform::Snes, &["snes", "super nintendo", "super famicom"]),
    (Platform::Nes, &["nes", "famicom"]),
    (Platform::Arcade, &["arcade", "mame", "fbneo"]),
];

/// Lowercase, with every non-alphanumeric run collapsed to one space and padded
/// so that hints only match on word boundaries.
fn tokenize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

fn match_hints(text: &str) -> Option<Platform> {
    let haystack = tokenize(text);
    PLATFORM_HINTS.iter().find_map(|(platform, hints)| {
        hints
            .iter()
            .any(|hint| haystack.contains(&format!(" {hint} ")))
            .then_some(*platform)
    })
}

/// Identify a ROM's platform.
///
/// The extension decides when it is unambiguous. Otherwise the filename, the
/// parent folder, the grandparent folder and finally the whole path are
/// checked for platform hints, in that order.
pub fn detect_platform(path: &Path) -> Platform {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(Platform::from_extension)
        .unwrap_or_default();
    if by_extension != Platform::Unknown {
        return by_extension;
    }

    let parent = path.parent();
    let grandparent = parent.and_then(Path::parent);
    let candidates = [
        path.file_stem(),
        parent.and_then(Path::file_name),
        grandparent.and_then(Path::file_name),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|part| match_hints(&part.to_string_lossy()))
        .or_else(|| match_hints(&path.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_extension() {
        assert_eq!(Platform::from_extension("gba"), Platform::GameBoyAdvance);
        assert_eq!(Platform::from_extension("SFC"), Platform::Snes);
        assert_eq!(Platform::from_extension("wbfs"), Platform::Wii);
        assert_eq!(Platform::from_extension("iso"), Platform::Unknown);
        assert_eq!(Platform::from_extension("xyz"), Platform::Unknown);
    }

    #[test]
    fn test_platform_id_roundtrip() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
        assert_eq!("PS1".parse::<Platform>(), Ok(Platform::Ps1));
        assert!("amiga".parse::<Platform>().is_err());
    }

    #[test]
    fn test_detect_by_extension_wins() {
        assert_eq!(
            detect_platform(Path::new("/roms/ps2/Game.gba")),
            Platform::GameBoyAdvance
        );
    }

    #[test]
    fn test_detect_filename_tag() {
        assert_eq!(
            detect_platform(Path::new("/games/Gran Turismo (PS2).iso")),
            Platform::Ps2
        );
    }

    #[test]
    fn test_detect_parent_folder() {
        assert_eq!(
            detect_platform(Path::new("/games/PlayStation 3/Demon's Souls.iso")),
            Platform::Ps3
        );
        assert_eq!(
            detect_platform(Path::new("/games/psx/Crash.bin")),
            Platform::Ps1
        );
    }

    #[test]
    fn test_detect_grandparent_folder() {
        assert_eq!(
            detect_platform(Path::new("/roms/wii/Super Mario Galaxy/game.rvz")),
            Platform::Wii
        );
    }

    #[test]
    fn test_specific_platform_before_general() {
        assert_eq!(
            detect_platform(Path::new("/roms/PS3 Games/title.iso")),
            Platform::Ps3
        );
        assert_eq!(
            detect_platform(Path::new("/roms/ps/title.cue")),
            Platform::Ps1
        );
    }

    #[test]
    fn test_hints_match_whole_words_only() {
        // "ps" inside "Maps" must not be read as PlayStation
        assert_eq!(
            detect_platform(Path::new("/home/user/Maps/disc.iso")),
            Platform::Unknown
        );
    }

    #[test]
    fn test_detect_full_path_fallback() {
        assert_eq!(
            detect_platform(Path::new("/mnt/saturn/usa/disc1/track.bin")),
            Platform::Saturn
        );
    }
}
