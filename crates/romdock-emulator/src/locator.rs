//! Finds installed emulator executables

use crate::{EmulatorDefinition, HostOs};
use romdock_config::ConfigStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Expand a candidate install directory.
///
/// A leading `~` becomes the home directory on every OS. On Windows `%VAR%`
/// placeholders are replaced from `env`. Returns `None` when a placeholder
/// cannot be resolved, so the candidate is skipped.
pub fn expand_candidate(
    raw: &str,
    os: HostOs,
    home: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    let mut expanded = String::with_capacity(raw.len());

    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
            expanded.push_str(&home?.to_string_lossy());
            rest
        }
        _ => raw,
    };

    if os != HostOs::Windows {
        expanded.push_str(rest);
        return Some(PathBuf::from(expanded));
    }

    let mut remaining = rest;
    while let Some(start) = remaining.find('%') {
        expanded.push_str(&remaining[..start]);
        let after = &remaining[start + 1..];
        let end = after.find('%')?;
        let value = env(&after[..end])?;
        expanded.push_str(&value);
        remaining = &after[end + 1..];
    }
    expanded.push_str(remaining);

    Some(PathBuf::from(expanded))
}

/// Resolves a catalog entry to an executable on disk.
///
/// Nothing is cached: every call re-reads the configuration and the
/// filesystem, so emulators installed or moved between launches are seen.
pub struct BinaryLocator {
    config: Arc<dyn ConfigStore>,
    os: HostOs,
    home: Option<PathBuf>,
    path_lookup: bool,
}

impl BinaryLocator {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self {
            config,
            os: HostOs::current(),
            home: dirs::home_dir(),
            path_lookup: true,
        }
    }

    /// Search another OS's install locations
    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    /// Override the directory `~` expands to
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Do not fall back to searching `PATH`
    pub fn without_path_lookup(mut self) -> Self {
        self.path_lookup = false;
        self
    }

    pub fn os(&self) -> HostOs {
        self.os
    }

    /// Absolute path of the emulator's executable, or `None` if it is not installed
    pub fn locate(&self, emulator: &EmulatorDefinition) -> Option<PathBuf> {
        let config = self.config.get();
        let exe_name = emulator.executable_for(self.os);

        if let Some(custom) = config.custom_path(&emulator.id) {
            if custom.is_file() {
                return Some(custom.to_path_buf());
            }
            let inside = custom.join(&exe_name);
            if custom.is_dir() && inside.is_file() {
                return Some(inside);
            }
            tracing::warn!(
                "Configured path for {} does not exist ({}), searching default locations",
                emulator.name,
                custom.display()
            );
        }

        for raw in emulator.dirs_for(self.os) {
            let Some(dir) =
                expand_candidate(raw, self.os, self.home.as_deref(), |var| std::env::var(var).ok())
            else {
                continue;
            };

            let candidate = dir.join(&exe_name);
            if candidate.is_file() {
                tracing::debug!("Found {} at {}", emulator.name, candidate.display());
                return Some(candidate);
            }

            // Full executable paths stored as a "directory"
            if dir.file_name().is_some_and(|name| *name == *exe_name) && dir.is_file() {
                return Some(dir);
            }
        }

        if self.path_lookup
            && let Ok(found) = which::which(&exe_name)
        {
            tracing::debug!("Found {} on PATH at {}", emulator.name, found.display());
            return Some(found);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romdock_config::{LauncherConfig, MemoryConfigStore};
    use std::fs;

    fn env(var: &str) -> Option<String> {
        match var {
            "APPDATA" => Some(r"C:\Users\me\AppData\Roaming".into()),
            "PROGRAMFILES" => Some(r"C:\Program Files".into()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/me");
        assert_eq!(
            expand_candidate("~/.local/bin", HostOs::Linux, Some(home), env),
            Some(PathBuf::from("/home/me/.local/bin"))
        );
        assert_eq!(expand_candidate("~/bin", HostOs::Linux, None, env), None);
        // Only a leading ~ followed by a separator is the home placeholder
        assert_eq!(
            expand_candidate("~user/bin", HostOs::Linux, Some(home), env),
            Some(PathBuf::from("~user/bin"))
        );
    }

    #[test]
    fn test_expand_windows_variables() {
        assert_eq!(
            expand_candidate(r"%APPDATA%\RetroArch", HostOs::Windows, None, env),
            Some(PathBuf::from(r"C:\Users\me\AppData\Roaming\RetroArch"))
        );
        assert_eq!(
            expand_candidate(r"%PROGRAMFILES%\%APPDATA%", HostOs::Windows, None, env),
            Some(PathBuf::from(r"C:\Program Files\C:\Users\me\AppData\Roaming"))
        );
        assert_eq!(
            expand_candidate(r"%MISSING%\RetroArch", HostOs::Windows, None, env),
            None
        );
        // Percent signs are literal elsewhere
        assert_eq!(
            expand_candidate("/opt/100%", HostOs::Linux, None, env),
            Some(PathBuf::from("/opt/100%"))
        );
    }

    fn definition(dirs: Vec<String>) -> EmulatorDefinition {
        EmulatorDefinition::new("fake", "Fake Emu", "fake-emu").with_dirs(HostOs::Linux, dirs)
    }

    fn locator(config: LauncherConfig, home: &Path) -> BinaryLocator {
        BinaryLocator::new(Arc::new(MemoryConfigStore::new(config)))
            .with_os(HostOs::Linux)
            .with_home(home)
            .without_path_lookup()
    }

    #[test]
    fn test_locate_in_home_candidate() {
        let home = tempfile::tempdir().unwrap();
        let bin = home.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("fake-emu"), b"").unwrap();

        let emulator = definition(vec!["/nonexistent".into(), "~/bin".into()]);
        let locator = locator(LauncherConfig::default(), home.path());

        assert_eq!(locator.locate(&emulator), Some(bin.join("fake-emu")));
        // Same filesystem, same answer
        assert_eq!(locator.locate(&emulator), Some(bin.join("fake-emu")));
    }

    #[test]
    fn test_locate_candidate_that_is_the_executable() {
        let home = tempfile::tempdir().unwrap();
        let exe = home.path().join("fake-emu");
        fs::write(&exe, b"").unwrap();

        let emulator = definition(vec![exe.to_string_lossy().to_string()]);
        let locator = locator(LauncherConfig::default(), home.path());

        assert_eq!(locator.locate(&emulator), Some(exe));
    }

    #[test]
    fn test_custom_path_wins() {
        let home = tempfile::tempdir().unwrap();
        let bin = home.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("fake-emu"), b"").unwrap();
        let custom = home.path().join("custom-build");
        fs::write(&custom, b"").unwrap();

        let mut config = LauncherConfig::default();
        config
            .emulators
            .custom_paths
            .insert("fake".into(), custom.clone());

        let emulator = definition(vec!["~/bin".into()]);
        assert_eq!(locator(config, home.path()).locate(&emulator), Some(custom));
    }

    #[test]
    fn test_stale_custom_path_falls_back() {
        let home = tempfile::tempdir().unwrap();
        let bin = home.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("fake-emu"), b"").unwrap();

        let mut config = LauncherConfig::default();
        config
            .emulators
            .custom_paths
            .insert("fake".into(), home.path().join("moved-away"));

        let emulator = definition(vec!["~/bin".into()]);
        assert_eq!(
            locator(config, home.path()).locate(&emulator),
            Some(bin.join("fake-emu"))
        );
    }

    #[test]
    fn test_not_found() {
        let home = tempfile::tempdir().unwrap();
        let emulator = definition(vec!["~/bin".into(), "/nonexistent/dir".into()]);
        assert_eq!(
            locator(LauncherConfig::default(), home.path()).locate(&emulator),
            None
        );
    }

    #[test]
    fn test_picks_up_newly_installed_binary() {
        let home = tempfile::tempdir().unwrap();
        let emulator = definition(vec!["~".into()]);
        let locator = locator(LauncherConfig::default(), home.path());

        assert_eq!(locator.locate(&emulator), None);
        fs::write(home.path().join("fake-emu"), b"").unwrap();
        assert_eq!(
            locator.locate(&emulator),
            Some(home.path().join("fake-emu"))
        );
    }
}
