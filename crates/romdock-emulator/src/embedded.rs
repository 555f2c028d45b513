//! In-process cores: installed-core lookup and session bookkeeping

use crate::preconditions::resolve_rom_path;
use crate::retroarch::{core_file_name, core_for_platform, supported_platforms};
use crate::{HostOs, LaunchError, SessionEvent, SessionTracker};
use romdock_config::ConfigStore;
use romdock_library::{GameId, LibraryStore, Platform};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An embedded core present on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledCore {
    pub name: String,
    pub platforms: Vec<Platform>,
    pub path: PathBuf,
}

/// Knows which embedded cores are installed
pub trait CoreManager: Send + Sync {
    fn core_for_platform(&self, platform: Platform) -> Option<InstalledCore>;

    fn can_play_embedded(&self, platform: Platform) -> bool {
        self.core_for_platform(platform).is_some()
    }
}

/// Cores stored as `<name>_libretro.<ext>` files in a single directory
#[derive(Debug, Clone)]
pub struct CoreDirectory {
    dir: PathBuf,
    os: HostOs,
}

impl CoreDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            os: HostOs::current(),
        }
    }

    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every installed core, each listed once with all the platforms it serves
    pub fn installed(&self) -> Vec<InstalledCore> {
        let mut by_name: BTreeMap<&str, Vec<Platform>> = BTreeMap::new();
        for platform in supported_platforms() {
            if let Some(core) = core_for_platform(platform) {
                by_name.entry(core).or_default().push(platform);
            }
        }

        by_name
            .into_iter()
            .filter_map(|(name, platforms)| {
                let path = self.dir.join(core_file_name(name, self.os));
                path.is_file().then(|| InstalledCore {
                    name: name.to_string(),
                    platforms,
                    path,
                })
            })
            .collect()
    }
}

impl CoreManager for CoreDirectory {
    fn core_for_platform(&self, platform: Platform) -> Option<InstalledCore> {
        let name = core_for_platform(platform)?;
        let path = self.dir.join(core_file_name(name, self.os));
        if !path.is_file() {
            return None;
        }

        let platforms = supported_platforms()
            .into_iter()
            .filter(|p| core_for_platform(*p) == Some(name))
            .collect();
        Some(InstalledCore {
            name: name.to_string(),
            platforms,
            path,
        })
    }
}

/// Play-time tracking for games run by an embedded core.
///
/// Nothing is spawned; the caller reports when play ends.
pub struct EmbeddedSessionTracker {
    library: Arc<dyn LibraryStore>,
    config: Arc<dyn ConfigStore>,
    cores: Arc<dyn CoreManager>,
    sessions: Arc<SessionTracker>,
}

impl EmbeddedSessionTracker {
    pub fn new(
        library: Arc<dyn LibraryStore>,
        config: Arc<dyn ConfigStore>,
        cores: Arc<dyn CoreManager>,
        sessions: Arc<SessionTracker>,
    ) -> Self {
        Self {
            library,
            config,
            cores,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Validate that `game_id` can run embedded and record the start time
    pub fn start_session(&self, game_id: GameId) -> Result<InstalledCore, LaunchError> {
        let game = self
            .library
            .get_game(game_id)?
            .ok_or(LaunchError::GameNotFound(game_id))?;

        if !self.config.get().embedded.enabled {
            return Err(LaunchError::EmbeddedDisabled);
        }

        let core = self
            .cores
            .core_for_platform(game.platform)
            .ok_or(LaunchError::CoreNotInstalled(game.platform))?;

        resolve_rom_path(&game.path, game.platform)?;

        tracing::info!("Starting {} with embedded core {}", game.name, core.name);
        self.sessions.begin(game_id);
        Ok(core)
    }

    /// End the embedded session for `game_id`.
    ///
    /// Safe to call without a matching start; the duration is then zero
    /// unless `elapsed_ms` is given.
    pub fn end_session(&self, game_id: GameId, elapsed_ms: Option<u64>) -> SessionEvent {
        self.sessions.finish(game_id, elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionKind;
    use crate::session::testing::ManualClock;
    use romdock_config::{LauncherConfig, MemoryConfigStore};
    use romdock_library::{GameDatabase, NewGame};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        db: Arc<GameDatabase>,
        clock: Arc<ManualClock>,
        config: Arc<MemoryConfigStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("cores")).unwrap();
            Self {
                dir,
                db: Arc::new(GameDatabase::in_memory().unwrap()),
                clock: Arc::new(ManualClock::new()),
                config: Arc::new(MemoryConfigStore::default()),
            }
        }

        fn cores(&self) -> CoreDirectory {
            CoreDirectory::new(self.dir.path().join("cores")).with_os(HostOs::Linux)
        }

        fn install_core(&self, name: &str) {
            let path = self.dir.path().join("cores").join(format!("{name}_libretro.so"));
            fs::write(path, b"core").unwrap();
        }

        fn add_game(&self, file: &str, platform: Platform, create: bool) -> GameId {
            let path = self.dir.path().join(file);
            if create {
                fs::write(&path, b"rom").unwrap();
            }
            self.db
                .add_game(&NewGame {
                    path,
                    platform,
                    name: file.into(),
                })
                .unwrap()
        }

        fn tracker(&self) -> EmbeddedSessionTracker {
            let sessions = Arc::new(SessionTracker::new(
                SessionKind::Embedded,
                self.db.clone(),
                self.clock.clone(),
            ));
            EmbeddedSessionTracker::new(
                self.db.clone(),
                self.config.clone(),
                Arc::new(self.cores()),
                sessions,
            )
        }
    }

    #[test]
    fn test_core_lookup() {
        let fx = Fixture::new();
        assert!(!fx.cores().can_play_embedded(Platform::GameBoy));

        fx.install_core("gambatte");
        let core = fx.cores().core_for_platform(Platform::GameBoyColor).unwrap();
        assert_eq!(core.name, "gambatte");
        assert_eq!(
            core.platforms,
            vec![Platform::GameBoy, Platform::GameBoyColor]
        );
        assert!(fx.cores().can_play_embedded(Platform::GameBoy));
        assert!(!fx.cores().can_play_embedded(Platform::Ps3));
    }

    #[test]
    fn test_installed_lists_each_core_once() {
        let fx = Fixture::new();
        fx.install_core("gambatte");
        fx.install_core("mgba");

        let names: Vec<_> = fx.cores().installed().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["gambatte", "mgba"]);
    }

    #[test]
    fn test_session_accrues_play_time() {
        let fx = Fixture::new();
        fx.install_core("mgba");
        let id = fx.add_game("game.gba", Platform::GameBoyAdvance, true);
        let tracker = fx.tracker();

        let core = tracker.start_session(id).unwrap();
        assert_eq!(core.name, "mgba");

        fx.clock.advance_ms(125_000);
        let event = tracker.end_session(id, None);

        assert_eq!(event.kind, SessionKind::Embedded);
        assert_eq!(event.duration_minutes, 2);
        assert_eq!(fx.db.get_game(id).unwrap().unwrap().play_time_minutes, 2);
    }

    #[test]
    fn test_end_without_start() {
        let fx = Fixture::new();
        let id = fx.add_game("game.gba", Platform::GameBoyAdvance, true);

        let event = fx.tracker().end_session(id, None);
        assert_eq!(event.duration_minutes, 0);
    }

    #[test]
    fn test_start_failures() {
        let fx = Fixture::new();
        let tracker = fx.tracker();

        assert!(matches!(
            tracker.start_session(42),
            Err(LaunchError::GameNotFound(42))
        ));

        let gba = fx.add_game("game.gba", Platform::GameBoyAdvance, true);
        assert!(matches!(
            tracker.start_session(gba),
            Err(LaunchError::CoreNotInstalled(Platform::GameBoyAdvance))
        ));

        fx.install_core("mgba");
        let missing = fx.add_game("missing.gba", Platform::GameBoyAdvance, false);
        assert!(matches!(
            tracker.start_session(missing),
            Err(LaunchError::RomFileNotFound(_))
        ));
        assert!(!tracker.sessions().is_active(missing));

        fx.config
            .set(LauncherConfig {
                embedded: romdock_config::EmbeddedSettings {
                    enabled: false,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            tracker.start_session(gba),
            Err(LaunchError::EmbeddedDisabled)
        ));
    }
}
