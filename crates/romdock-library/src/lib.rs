//! Game library for romdock
//!
//! Stores game records (path, platform, preferred emulator, play time) in
//! SQLite, identifies a ROM's platform from its extension and surrounding
//! folder names, and scans ROM directories for import.

mod database;
mod platform;
mod scanner;

pub use database::GameDatabase;
pub use platform::{Platform, UnknownPlatform, detect_platform};
pub use scanner::{RomScanner, ScanConfig, ScanResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Library-assigned game identifier
pub type GameId = i64;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A game in the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub path: PathBuf,
    pub platform: Platform,
    pub name: String,
    /// Emulator chosen for this game, overriding platform defaults
    pub preferred_emulator: Option<String>,
    /// Cumulative play time in minutes. Only ever grows.
    pub play_time_minutes: u64,
    pub last_played: Option<DateTime<Utc>>,
}

/// A game about to be added to the library
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub path: PathBuf,
    pub platform: Platform,
    pub name: String,
}

/// Partial update merged onto a stored record. `None` leaves a field untouched.
///
/// Play time is not patchable; it only grows through [`LibraryStore::add_play_time`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamePatch {
    pub path: Option<PathBuf>,
    pub platform: Option<Platform>,
    pub name: Option<String>,
    /// `Some(None)` clears the preference
    pub preferred_emulator: Option<Option<String>>,
    pub last_played: Option<DateTime<Utc>>,
}

impl GamePatch {
    /// Merge this patch onto a record
    pub fn apply(self, game: &mut GameRecord) {
        if let Some(path) = self.path {
            game.path = path;
        }
        if let Some(platform) = self.platform {
            game.platform = platform;
        }
        if let Some(name) = self.name {
            game.name = name;
        }
        if let Some(preferred) = self.preferred_emulator {
            game.preferred_emulator = preferred;
        }
        if let Some(last_played) = self.last_played {
            game.last_played = Some(last_played);
        }
    }
}

/// Record access used by the launch pipeline
pub trait LibraryStore: Send + Sync {
    fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, LibraryError>;

    /// Merge `patch` onto the stored record and persist it immediately
    fn update_game(&self, id: GameId, patch: GamePatch) -> Result<(), LibraryError>;

    /// Add a finished session's minutes to the cumulative play time and stamp `last_played`
    fn add_play_time(
        &self,
        id: GameId,
        minutes: u64,
        played_at: DateTime<Utc>,
    ) -> Result<(), LibraryError>;
}
