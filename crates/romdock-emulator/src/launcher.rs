//! Launch orchestration: external processes and embedded sessions

use crate::{
    ArgStrategy, BinaryLocator, Catalog, Clock, CoreDirectory, CoreManager,
    EmbeddedSessionTracker, InstalledCore, LaunchContext, LaunchError, PreconditionValidator,
    ResolvedEmulator, SelectionPolicy, SessionEvent, SessionKind, SessionObserver,
    SessionTracker, SystemClock, select_core,
};
use romdock_config::ConfigStore;
use romdock_library::{GameId, GameRecord, LibraryStore};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::task::JoinHandle;

/// A spawned emulator process.
///
/// Dropping this does not stop the emulator or its exit watcher.
#[derive(Debug)]
pub struct ExternalLaunch {
    pub game_id: GameId,
    pub emulator_id: String,
    pub emulator_name: String,
    pub pid: Option<u32>,
    pub executable: PathBuf,
    pub args: Vec<String>,
    exit: JoinHandle<SessionEvent>,
}

impl ExternalLaunch {
    /// Wait until the emulator exits and its play time has been recorded
    pub async fn wait_for_exit(self) -> Option<SessionEvent> {
        match self.exit.await {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::error!("Exit watcher for game {} failed: {}", self.game_id, e);
                None
            }
        }
    }
}

/// How a game ended up running
#[derive(Debug)]
pub enum PlayOutcome {
    Embedded(InstalledCore),
    External(ExternalLaunch),
}

/// Builder for [`GameLauncher`] with every collaborator replaceable
pub struct GameLauncherBuilder {
    library: Arc<dyn LibraryStore>,
    config: Arc<dyn ConfigStore>,
    catalog: Option<Arc<Catalog>>,
    locator: Option<BinaryLocator>,
    validator: Option<PreconditionValidator>,
    clock: Option<Arc<dyn Clock>>,
    cores: Option<Arc<dyn CoreManager>>,
}

impl GameLauncherBuilder {
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn locator(mut self, locator: BinaryLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn validator(mut self, validator: PreconditionValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn cores(mut self, cores: Arc<dyn CoreManager>) -> Self {
        self.cores = Some(cores);
        self
    }

    pub fn build(self) -> GameLauncher {
        let config = self.config;
        let library = self.library;

        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(Catalog::builtin()));
        let locator = self
            .locator
            .unwrap_or_else(|| BinaryLocator::new(config.clone()));
        let validator = self
            .validator
            .unwrap_or_else(|| PreconditionValidator::new(config.clone()).with_os(locator.os()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cores = self.cores.unwrap_or_else(|| {
            let dir = config.get().embedded.cores_dir;
            Arc::new(CoreDirectory::new(dir).with_os(locator.os()))
        });

        let sessions = Arc::new(SessionTracker::new(
            SessionKind::External,
            library.clone(),
            clock.clone(),
        ));
        let embedded = EmbeddedSessionTracker::new(
            library.clone(),
            config.clone(),
            cores.clone(),
            Arc::new(SessionTracker::new(SessionKind::Embedded, library.clone(), clock)),
        );

        GameLauncher {
            library,
            config: config.clone(),
            selection: SelectionPolicy::new(catalog, locator, config),
            validator,
            sessions,
            embedded,
            cores,
        }
    }
}

/// Runs games: picks an emulator or core, checks preconditions, spawns and tracks sessions
pub struct GameLauncher {
    library: Arc<dyn LibraryStore>,
    config: Arc<dyn ConfigStore>,
    selection: SelectionPolicy,
    validator: PreconditionValidator,
    sessions: Arc<SessionTracker>,
    embedded: EmbeddedSessionTracker,
    cores: Arc<dyn CoreManager>,
}

impl GameLauncher {
    /// Launcher with the built-in catalog, host filesystem lookup and system clock
    pub fn new(library: Arc<dyn LibraryStore>, config: Arc<dyn ConfigStore>) -> Self {
        Self::builder(library, config).build()
    }

    pub fn builder(
        library: Arc<dyn LibraryStore>,
        config: Arc<dyn ConfigStore>,
    ) -> GameLauncherBuilder {
        GameLauncherBuilder {
            library,
            config,
            catalog: None,
            locator: None,
            validator: None,
            clock: None,
            cores: None,
        }
    }

    pub fn selection(&self) -> &SelectionPolicy {
        &self.selection
    }

    pub fn embedded(&self) -> &EmbeddedSessionTracker {
        &self.embedded
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Deliver session-ended events from both trackers to `observer`
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.sessions.subscribe(observer.clone());
        self.embedded.sessions().subscribe(observer);
    }

    /// Run `game_id`, preferring an embedded core when configured.
    ///
    /// An explicit emulator always takes the external path.
    pub async fn play(
        &self,
        game_id: GameId,
        explicit: Option<&str>,
    ) -> Result<PlayOutcome, LaunchError> {
        if explicit.is_none() {
            let embedded = self.config.get().embedded;
            if embedded.prefer_embedded && embedded.enabled {
                let game = self.game(game_id)?;
                if self.cores.can_play_embedded(game.platform) {
                    return self
                        .embedded
                        .start_session(game_id)
                        .map(PlayOutcome::Embedded);
                }
                tracing::debug!(
                    "No embedded core for {}, using an external emulator",
                    game.platform
                );
            }
        }

        self.launch(game_id, explicit).await.map(PlayOutcome::External)
    }

    /// End an embedded session started by [`GameLauncher::play`]
    pub fn end_embedded(&self, game_id: GameId, elapsed_ms: Option<u64>) -> SessionEvent {
        self.embedded.end_session(game_id, elapsed_ms)
    }

    /// Spawn an external emulator for `game_id`.
    ///
    /// Returns once the process has started. Play time is recorded by a
    /// background task when it exits.
    pub async fn launch(
        &self,
        game_id: GameId,
        explicit: Option<&str>,
    ) -> Result<ExternalLaunch, LaunchError> {
        let game = self.game(game_id)?;
        let emulator = self.selection.select(&game, explicit)?;
        let rom = self.validator.check(&emulator, &game)?;
        let args = self.arguments(&emulator, &game, &rom);

        tracing::info!(
            "Launching {} with {} ({})",
            game.name,
            emulator.definition.name,
            emulator.executable.display()
        );
        tracing::debug!("Arguments: {:?}", args);

        let mut child = detached_command(&emulator.executable, &args)
            .spawn()
            .map_err(|source| LaunchError::SpawnFailure {
                emulator: emulator.definition.name.clone(),
                source,
            })?;
        let pid = child.id();

        self.sessions.begin(game_id);

        let sessions = Arc::clone(&self.sessions);
        let emulator_name = emulator.definition.name.clone();
        let exit = tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::info!("{} exited with {}", emulator_name, status),
                Err(e) => tracing::warn!("Lost track of {}: {}", emulator_name, e),
            }
            sessions.finish(game_id, None)
        });

        Ok(ExternalLaunch {
            game_id,
            emulator_id: emulator.definition.id,
            emulator_name: emulator.definition.name,
            pid,
            executable: emulator.executable,
            args,
            exit,
        })
    }

    fn game(&self, game_id: GameId) -> Result<GameRecord, LaunchError> {
        self.library
            .get_game(game_id)?
            .ok_or(LaunchError::GameNotFound(game_id))
    }

    fn arguments(&self, emulator: &ResolvedEmulator, game: &GameRecord, rom: &Path) -> Vec<String> {
        let core = match emulator.definition.args {
            ArgStrategy::RetroArch => select_core(
                &emulator.executable,
                game.platform,
                self.selection.locator().os(),
            ),
            _ => None,
        };
        let context = LaunchContext {
            platform: game.platform,
            executable: &emulator.executable,
            core,
        };
        emulator.definition.arguments_for(rom, Some(&context))
    }
}

/// Command that outlives the launcher: own process group, no inherited stdio
fn detached_command(executable: &Path, args: &[String]) -> Command {
    let mut command = Command::new(executable);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);

    if let Some(dir) = executable.parent().filter(|d| !d.as_os_str().is_empty()) {
        command.current_dir(dir);
    }

    #[cfg(unix)]
    command.process_group(0);

    #[cfg(windows)]
    {
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ManualClock;
    use crate::{EmulatorDefinition, HostOs};
    use romdock_config::{LauncherConfig, MemoryConfigStore};
    use romdock_library::{GameDatabase, NewGame, Platform};
    use std::fs;

    fn launcher(
        db: Arc<GameDatabase>,
        config: LauncherConfig,
        cores_dir: &Path,
    ) -> GameLauncher {
        let config: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new(config));
        let catalog = Catalog::new(vec![
            EmulatorDefinition::new("mgba", "mGBA", "mgba").with_platforms([Platform::GameBoyAdvance]),
        ]);
        GameLauncher::builder(db, config.clone())
            .catalog(catalog)
            .locator(
                BinaryLocator::new(config)
                    .with_os(HostOs::Linux)
                    .without_path_lookup(),
            )
            .clock(Arc::new(ManualClock::new()))
            .cores(Arc::new(CoreDirectory::new(cores_dir).with_os(HostOs::Linux)))
            .build()
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(GameDatabase::in_memory().unwrap());
        let launcher = launcher(db, LauncherConfig::default(), dir.path());

        assert!(matches!(
            launcher.launch(7, None).await,
            Err(LaunchError::GameNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_play_prefers_installed_core() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mgba_libretro.so"), b"core").unwrap();
        let rom = dir.path().join("game.gba");
        fs::write(&rom, b"rom").unwrap();

        let db = Arc::new(GameDatabase::in_memory().unwrap());
        let id = db
            .add_game(&NewGame {
                path: rom,
                platform: Platform::GameBoyAdvance,
                name: "Game".into(),
            })
            .unwrap();

        let mut config = LauncherConfig::default();
        config.embedded.prefer_embedded = true;
        let launcher = launcher(db, config, dir.path());

        match launcher.play(id, None).await.unwrap() {
            PlayOutcome::Embedded(core) => assert_eq!(core.name, "mgba"),
            other => panic!("expected embedded play, got {other:?}"),
        }
        assert!(launcher.embedded().sessions().is_active(id));
        assert!(!launcher.sessions().is_active(id));
    }

    #[tokio::test]
    async fn test_play_without_core_goes_external() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.gba");
        fs::write(&rom, b"rom").unwrap();

        let db = Arc::new(GameDatabase::in_memory().unwrap());
        let id = db
            .add_game(&NewGame {
                path: rom,
                platform: Platform::GameBoyAdvance,
                name: "Game".into(),
            })
            .unwrap();

        let mut config = LauncherConfig::default();
        config.embedded.prefer_embedded = true;
        let launcher = launcher(db, config, dir.path());

        // mGBA is not installed anywhere the locator may look
        assert!(matches!(
            launcher.play(id, None).await,
            Err(LaunchError::NoEmulatorForPlatform(Platform::GameBoyAdvance))
        ));
    }

    #[test]
    fn test_detached_command_runs_from_executable_dir() {
        let command = detached_command(Path::new("/opt/emu/bin/emu"), &["game.iso".into()]);
        let std = command.as_std();
        assert_eq!(std.get_current_dir(), Some(Path::new("/opt/emu/bin")));
        assert_eq!(std.get_args().collect::<Vec<_>>(), vec!["game.iso"]);
    }
}
