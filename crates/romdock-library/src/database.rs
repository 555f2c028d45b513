//! Game database using SQLite

use crate::{GameId, GamePatch, GameRecord, LibraryError, LibraryStore, NewGame, Platform};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Game database manager
pub struct GameDatabase {
    conn: Mutex<Connection>,
}

impl GameDatabase {
    /// Open or create a database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LibraryError> {
        self.conn
            .lock()
            .map_err(|_| LibraryError::Database("connection lock poisoned".into()))
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), LibraryError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                platform TEXT NOT NULL,
                name TEXT NOT NULL,
                preferred_emulator TEXT,
                play_time_minutes INTEGER NOT NULL DEFAULT 0,
                last_played TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_games_platform ON games(platform);
            CREATE INDEX IF NOT EXISTS idx_games_name ON games(name);
        "#,
        )?;

        Ok(())
    }

    /// Add a game, or refresh name and platform if its path is already known
    pub fn add_game(&self, game: &NewGame) -> Result<GameId, LibraryError> {
        let id = self.conn()?.query_row(
            r#"INSERT INTO games (path, platform, name)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(path) DO UPDATE SET
                   platform = excluded.platform,
                   name = excluded.name
               RETURNING id"#,
            params![
                game.path.to_string_lossy(),
                game.platform.as_str(),
                game.name
            ],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    /// Get all games
    pub fn all_games(&self) -> Result<Vec<GameRecord>, LibraryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM games ORDER BY name")?;

        let games = stmt
            .query_map([], Self::row_to_game)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(games)
    }

    /// Get games by platform
    pub fn games_for_platform(&self, platform: Platform) -> Result<Vec<GameRecord>, LibraryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM games WHERE platform = ?1 ORDER BY name")?;

        let games = stmt
            .query_map(params![platform.as_str()], Self::row_to_game)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(games)
    }

    /// Get total game count
    pub fn game_count(&self) -> Result<i64, LibraryError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Convert a row to a GameRecord
    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let path: String = row.get("path")?;
        let platform: String = row.get("platform")?;
        let play_time: i64 = row.get("play_time_minutes")?;

        Ok(GameRecord {
            id: row.get("id")?,
            path: PathBuf::from(path),
            platform: platform.parse().unwrap_or_default(),
            name: row.get("name")?,
            preferred_emulator: row.get("preferred_emulator")?,
            play_time_minutes: play_time.max(0) as u64,
            last_played: row.get("last_played")?,
        })
    }
}

impl LibraryStore for GameDatabase {
    fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, LibraryError> {
        let game = self
            .conn()?
            .query_row(
                "SELECT * FROM games WHERE id = ?1",
                params![id],
                Self::row_to_game,
            )
            .optional()?;

        Ok(game)
    }

    fn update_game(&self, id: GameId, patch: GamePatch) -> Result<(), LibraryError> {
        // One guard for the read and the write so a finishing session cannot interleave
        let conn = self.conn()?;
        let mut game = conn
            .query_row(
                "SELECT * FROM games WHERE id = ?1",
                params![id],
                Self::row_to_game,
            )
            .optional()?
            .ok_or(LibraryError::GameNotFound(id))?;
        patch.apply(&mut game);

        conn.execute(
            r#"UPDATE games SET
                   path = ?1,
                   platform = ?2,
                   name = ?3,
                   preferred_emulator = ?4,
                   last_played = ?5
               WHERE id = ?6"#,
            params![
                game.path.to_string_lossy(),
                game.platform.as_str(),
                game.name,
                game.preferred_emulator,
                game.last_played,
                id
            ],
        )?;
        Ok(())
    }

    fn add_play_time(
        &self,
        id: GameId,
        minutes: u64,
        played_at: DateTime<Utc>,
    ) -> Result<(), LibraryError> {
        let minutes = i64::try_from(minutes).unwrap_or(i64::MAX);
        let changed = self.conn()?.execute(
            r#"UPDATE games SET
                   play_time_minutes = play_time_minutes + ?1,
                   last_played = ?2
               WHERE id = ?3"#,
            params![minutes, played_at, id],
        )?;

        if changed == 0 {
            return Err(LibraryError::GameNotFound(id));
        }
        Ok(())
    }
}
