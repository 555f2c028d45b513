//! Chooses which emulator runs a game

use crate::{BinaryLocator, Catalog, EmulatorDefinition, LaunchError};
use romdock_config::ConfigStore;
use romdock_library::{GameRecord, Platform};
use std::path::PathBuf;
use std::sync::Arc;

/// A catalog entry paired with the executable found for it.
///
/// Built fresh on every launch attempt.
#[derive(Debug, Clone)]
pub struct ResolvedEmulator {
    pub definition: EmulatorDefinition,
    pub executable: PathBuf,
}

/// Selection order: explicit choice, the game's preferred emulator, the
/// platform default, then the first enabled and installed catalog entry.
pub struct SelectionPolicy {
    catalog: Arc<Catalog>,
    locator: BinaryLocator,
    config: Arc<dyn ConfigStore>,
}

impl SelectionPolicy {
    pub fn new(catalog: Arc<Catalog>, locator: BinaryLocator, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            catalog,
            locator,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn locator(&self) -> &BinaryLocator {
        &self.locator
    }

    /// Resolve the emulator for `game`.
    ///
    /// An explicitly requested (or per-game preferred) emulator that is
    /// disabled or not installed is an error; it never falls back to another
    /// emulator.
    pub fn select(
        &self,
        game: &GameRecord,
        explicit: Option<&str>,
    ) -> Result<ResolvedEmulator, LaunchError> {
        let config = self.config.get();

        if let Some(id) = explicit.or(game.preferred_emulator.as_deref()) {
            let definition = self
                .catalog
                .get(id)
                .ok_or_else(|| LaunchError::EmulatorNotInstalled(id.to_string()))?;

            if !config.is_emulator_enabled(id) {
                return Err(LaunchError::EmulatorDisabled(definition.name.clone()));
            }

            let executable = self
                .locator
                .locate(definition)
                .ok_or_else(|| LaunchError::EmulatorNotInstalled(definition.name.clone()))?;

            return Ok(ResolvedEmulator {
                definition: definition.clone(),
                executable,
            });
        }

        if let Some(id) = config.platform_default(game.platform.as_str()) {
            match self.catalog.get(id) {
                Some(definition)
                    if config.is_emulator_enabled(id) && definition.supports(game.platform) =>
                {
                    if let Some(executable) = self.locator.locate(definition) {
                        return Ok(ResolvedEmulator {
                            definition: definition.clone(),
                            executable,
                        });
                    }
                    tracing::warn!(
                        "Default emulator {} for {} is not installed, trying others",
                        definition.name,
                        game.platform
                    );
                }
                _ => tracing::warn!(
                    "Ignoring unusable default emulator '{}' for {}",
                    id,
                    game.platform
                ),
            }
        }

        self.first_available(game.platform)
            .ok_or(LaunchError::NoEmulatorForPlatform(game.platform))
    }

    /// First enabled, installed emulator supporting `platform`, in catalog order
    pub fn first_available(&self, platform: Platform) -> Option<ResolvedEmulator> {
        let config = self.config.get();

        self.catalog
            .for_platform(platform)
            .filter(|definition| config.is_emulator_enabled(&definition.id))
            .find_map(|definition| {
                self.locator
                    .locate(definition)
                    .map(|executable| ResolvedEmulator {
                        definition: definition.clone(),
                        executable,
                    })
            })
    }

    /// Every installed emulator, enabled or not, with its executable
    pub fn installed(&self) -> Vec<ResolvedEmulator> {
        self.catalog
            .iter()
            .filter_map(|definition| {
                self.locator
                    .locate(definition)
                    .map(|executable| ResolvedEmulator {
                        definition: definition.clone(),
                        executable,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostOs;
    use romdock_config::{LauncherConfig, MemoryConfigStore};
    use std::fs;
    use std::path::Path;

    struct Fixture {
        dir: tempfile::TempDir,
        config: Arc<MemoryConfigStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                config: Arc::new(MemoryConfigStore::default()),
            }
        }

        /// Install a fake executable under `<tmp>/<id>/`
        fn install(&self, id: &str) {
            let dir = self.dir.path().join(id);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(id), b"").unwrap();
        }

        fn definition(&self, id: &str, platforms: &[Platform]) -> EmulatorDefinition {
            let dir = self.dir.path().join(id).to_string_lossy().to_string();
            EmulatorDefinition::new(id, id.to_uppercase(), id)
                .with_platforms(platforms.iter().copied())
                .with_dirs(HostOs::Linux, [dir])
        }

        fn policy(&self, emulators: Vec<EmulatorDefinition>) -> SelectionPolicy {
            let config: Arc<dyn ConfigStore> = self.config.clone();
            let locator = BinaryLocator::new(config.clone())
                .with_os(HostOs::Linux)
                .with_home(self.dir.path())
                .without_path_lookup();
            SelectionPolicy::new(Arc::new(Catalog::new(emulators)), locator, config)
        }

        fn configure(&self, edit: impl FnOnce(&mut LauncherConfig)) {
            let mut config = self.config.get();
            edit(&mut config);
            self.config.set(config).unwrap();
        }
    }

    fn game(platform: Platform, preferred: Option<&str>) -> GameRecord {
        GameRecord {
            id: 1,
            path: "/roms/game".into(),
            platform,
            name: "Game".into(),
            preferred_emulator: preferred.map(String::from),
            play_time_minutes: 0,
            last_played: None,
        }
    }

    fn executable_name(resolved: &ResolvedEmulator) -> &str {
        resolved
            .executable
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
    }

    #[test]
    fn test_first_installed_in_catalog_order() {
        let fx = Fixture::new();
        fx.install("second");
        fx.install("third");
        let policy = fx.policy(vec![
            fx.definition("first", &[Platform::Snes]),
            fx.definition("second", &[Platform::Snes]),
            fx.definition("third", &[Platform::Snes]),
        ]);

        let resolved = policy.select(&game(Platform::Snes, None), None).unwrap();
        assert_eq!(resolved.definition.id, "second");
        assert!(resolved.definition.supports(Platform::Snes));
        assert_eq!(executable_name(&resolved), "second");
    }

    #[test]
    fn test_disabled_emulators_are_skipped() {
        let fx = Fixture::new();
        fx.install("a");
        fx.install("b");
        fx.configure(|c| {
            c.emulators.disabled.insert("a".into());
        });
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::GameBoyAdvance]),
            fx.definition("b", &[Platform::GameBoyAdvance]),
        ]);

        let resolved = policy.select(&game(Platform::GameBoyAdvance, None), None).unwrap();
        assert_eq!(resolved.definition.id, "b");
    }

    #[test]
    fn test_no_emulator_for_platform() {
        let fx = Fixture::new();
        let policy = fx.policy(vec![
            fx.definition("dolphin", &[Platform::GameCube, Platform::Wii]),
            fx.definition("snes9x", &[Platform::Snes]),
        ]);
        fx.install("snes9x");

        let err = policy.select(&game(Platform::Wii, None), None).unwrap_err();
        assert!(matches!(err, LaunchError::NoEmulatorForPlatform(Platform::Wii)));
    }

    #[test]
    fn test_preferred_not_installed_does_not_fall_back() {
        let fx = Fixture::new();
        fx.install("b");
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::Nes]),
            fx.definition("b", &[Platform::Nes]),
        ]);

        let err = policy
            .select(&game(Platform::Nes, Some("a")), None)
            .unwrap_err();
        assert!(matches!(err, LaunchError::EmulatorNotInstalled(ref name) if name == "A"));
    }

    #[test]
    fn test_preferred_disabled_does_not_fall_back() {
        let fx = Fixture::new();
        fx.install("a");
        fx.install("b");
        fx.configure(|c| {
            c.emulators.disabled.insert("a".into());
        });
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::Nes]),
            fx.definition("b", &[Platform::Nes]),
        ]);

        let err = policy
            .select(&game(Platform::Nes, Some("a")), None)
            .unwrap_err();
        assert!(matches!(err, LaunchError::EmulatorDisabled(_)));
    }

    #[test]
    fn test_explicit_overrides_preferred() {
        let fx = Fixture::new();
        fx.install("a");
        fx.install("b");
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::Nes]),
            fx.definition("b", &[Platform::Nes]),
        ]);

        let resolved = policy
            .select(&game(Platform::Nes, Some("a")), Some("b"))
            .unwrap();
        assert_eq!(resolved.definition.id, "b");
    }

    #[test]
    fn test_unknown_explicit_id() {
        let fx = Fixture::new();
        let policy = fx.policy(vec![]);
        let err = policy
            .select(&game(Platform::Nes, None), Some("nope"))
            .unwrap_err();
        assert!(matches!(err, LaunchError::EmulatorNotInstalled(ref id) if id == "nope"));
    }

    #[test]
    fn test_platform_default_used_before_catalog_order() {
        let fx = Fixture::new();
        fx.install("a");
        fx.install("b");
        fx.configure(|c| {
            c.emulators
                .platform_defaults
                .insert("nes".into(), "b".into());
        });
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::Nes]),
            fx.definition("b", &[Platform::Nes]),
        ]);

        let resolved = policy.select(&game(Platform::Nes, None), None).unwrap();
        assert_eq!(resolved.definition.id, "b");
    }

    #[test]
    fn test_missing_platform_default_falls_back() {
        let fx = Fixture::new();
        fx.install("a");
        fx.configure(|c| {
            c.emulators
                .platform_defaults
                .insert("nes".into(), "b".into());
        });
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::Nes]),
            fx.definition("b", &[Platform::Nes]),
        ]);

        let resolved = policy.select(&game(Platform::Nes, None), None).unwrap();
        assert_eq!(resolved.definition.id, "a");
    }

    #[test]
    fn test_installed_lists_located_emulators() {
        let fx = Fixture::new();
        fx.install("b");
        let policy = fx.policy(vec![
            fx.definition("a", &[Platform::Nes]),
            fx.definition("b", &[Platform::Snes]),
        ]);

        let installed = policy.installed();
        assert_eq!(installed.len(), 1);
        assert!(installed[0].executable.starts_with(fx.dir.path()));
        assert!(Path::new(&installed[0].executable).is_file());
    }
}
