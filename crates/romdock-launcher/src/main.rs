//! romdock
//!
//! Command-line front end: imports ROMs into the library, lists installed
//! emulators and launches games through the external emulator pipeline.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use romdock_config::{ConfigStore, FileConfigStore};
use romdock_emulator::{CoreDirectory, GameLauncher, ResolvedEmulator, probe_version};
use romdock_library::{GameDatabase, GameId, RomScanner, detect_platform};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "romdock", version, about = "ROM library emulator launcher")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Launch a game with an external emulator
    Launch {
        id: GameId,

        /// Emulator id to use instead of the normal selection
        #[arg(long)]
        emulator: Option<String>,

        /// Stay attached until the emulator exits and play time is recorded
        #[arg(long)]
        wait: bool,
    },
    /// List known emulators with their install location and version
    Emulators,
    /// List installed embedded cores
    Cores,
    /// Print the platform detected for a ROM path
    Detect { path: PathBuf },
    /// Scan directories and add the ROMs found to the library
    Import { dirs: Vec<PathBuf> },
    /// List games in the library
    Games {
        #[arg(long)]
        json: bool,
    },
    /// Print the configuration file path
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = Arc::new(match &cli.config {
        Some(path) => FileConfigStore::open(path.clone()),
        None => FileConfigStore::open_default(),
    }?);

    match cli.command {
        Command::ConfigPath => println!("{}", config.path().display()),
        Command::Detect { path } => println!("{}", detect_platform(&path)),
        Command::Cores => list_cores(config.as_ref()),
        Command::Emulators => {
            let db = open_library(config.as_ref())?;
            list_emulators(&GameLauncher::new(db, config)).await;
        }
        Command::Games { json } => {
            let db = open_library(config.as_ref())?;
            list_games(&db, json)?;
        }
        Command::Import { dirs } => {
            let db = open_library(config.as_ref())?;
            import(&db, config.as_ref(), dirs)?;
        }
        Command::Launch { id, emulator, wait } => {
            let db = open_library(config.as_ref())?;
            launch(GameLauncher::new(db, config), id, emulator.as_deref(), wait).await?;
        }
    }

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn open_library(config: &dyn ConfigStore) -> Result<Arc<GameDatabase>> {
    let path = config.get().library.database_path;
    let db = GameDatabase::open(&path)
        .with_context(|| format!("Failed to open library at {}", path.display()))?;
    Ok(Arc::new(db))
}

async fn launch(launcher: GameLauncher, id: GameId, emulator: Option<&str>, wait: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    launcher.subscribe(Arc::new(tx));

    let launch = launcher.launch(id, emulator).await?;
    println!(
        "Started {} (pid {})",
        launch.emulator_name,
        launch.pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into())
    );

    if !wait {
        info!("Not waiting for exit; play time is only recorded with --wait");
        return Ok(());
    }

    match rx.recv().await {
        Some(event) => println!("Session ended after {} minute(s)", event.duration_minutes),
        None => warn!("Session tracker closed before the emulator exited"),
    }
    Ok(())
}

async fn list_emulators(launcher: &GameLauncher) {
    let selection = launcher.selection();
    let installed = selection.installed();

    for definition in selection.catalog().iter() {
        let platforms: Vec<&str> = definition.platforms.iter().map(|p| p.as_str()).collect();
        let found = installed.iter().find(|r| r.definition.id == definition.id);

        let status = match found {
            Some(resolved) => describe_install(resolved).await,
            None => "not installed".to_string(),
        };
        println!(
            "{:<12} {:<12} {:<40} {}",
            definition.id,
            definition.name,
            platforms.join(","),
            status
        );
    }
}

async fn describe_install(resolved: &ResolvedEmulator) -> String {
    let version = probe_version(resolved)
        .await
        .map(|v| v.raw)
        .unwrap_or_else(|| "unknown version".into());
    format!("{} ({})", resolved.executable.display(), version)
}

fn list_cores(config: &dyn ConfigStore) {
    let cores = CoreDirectory::new(config.get().embedded.cores_dir);
    let installed = cores.installed();
    if installed.is_empty() {
        println!("No cores installed in {}", cores.dir().display());
    }
    for core in installed {
        let platforms: Vec<&str> = core.platforms.iter().map(|p| p.as_str()).collect();
        println!("{:<20} {:<30} {}", core.name, platforms.join(","), core.path.display());
    }
}

fn list_games(db: &GameDatabase, json: bool) -> Result<()> {
    let games = db.all_games()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&games)?);
        return Ok(());
    }

    for game in games {
        println!(
            "{:>5}  {:<10} {:>6}m  {}",
            game.id,
            game.platform.as_str(),
            game.play_time_minutes,
            game.name
        );
    }
    Ok(())
}

fn import(db: &GameDatabase, config: &dyn ConfigStore, dirs: Vec<PathBuf>) -> Result<()> {
    let dirs = if dirs.is_empty() {
        config.get().library.rom_dirs
    } else {
        dirs
    };
    if dirs.is_empty() {
        bail!("No directories given and library.rom_dirs is empty");
    }

    let scanner = RomScanner::new();
    for dir in dirs {
        let result = scanner
            .scan(&dir)
            .with_context(|| format!("Failed to scan {}", dir.display()))?;

        for game in &result.games {
            db.add_game(game)?;
        }
        for path in &result.unrecognized {
            warn!("Unrecognized platform for {}", path.display());
        }
        println!(
            "{}: {} game(s) imported, {} unrecognized",
            dir.display(),
            result.games.len(),
            result.unrecognized.len()
        );
    }
    Ok(())
}
