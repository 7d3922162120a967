//! SQLite-backed song store implementation.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{
    CreateSongRequest, ProcessingTransition, Song, SongError, SongStatus, SongStore, StatusUpdate,
};

const SELECT_COLUMNS: &str = "id, title, artist, filename_original, status, progress, error_message, backing_path, vocals_path, created_at";

/// SQLite-backed song store.
pub struct SqliteSongStore {
    conn: Mutex<Connection>,
}

impl SqliteSongStore {
    /// Create a new SQLite song store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, SongError> {
        let conn = Connection::open(path).map_err(|e| SongError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite song store (useful for testing).
    pub fn in_memory() -> Result<Self, SongError> {
        let conn = Connection::open_in_memory().map_err(|e| SongError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SongError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS songs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                filename_original TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'UPLOADED',
                created_at TEXT NOT NULL,
                error_message TEXT,
                backing_path TEXT,
                vocals_path TEXT,
                progress INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_songs_created_at ON songs(created_at);
            CREATE INDEX IF NOT EXISTS idx_songs_status ON songs(status);
            "#,
        )
        .map_err(|e| SongError::Database(e.to_string()))?;

        // Migration: databases created before progress tracking lack the column
        let _ = conn.execute(
            "ALTER TABLE songs ADD COLUMN progress INTEGER NOT NULL DEFAULT 0",
            [],
        );

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SongError> {
        self.conn
            .lock()
            .map_err(|_| SongError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_song(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        let status_str: String = row.get(4)?;
        let status = status_str.parse::<SongStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let created_at_str: String = row.get(9)?;
        // Parse timestamp - use default if parsing fails (shouldn't happen with valid data)
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Song {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            filename_original: row.get(3)?,
            status,
            progress: row.get(5)?,
            error_message: row.get(6)?,
            backing_path: row.get::<_, Option<String>>(7)?.map(PathBuf::from),
            vocals_path: row.get::<_, Option<String>>(8)?.map(PathBuf::from),
            created_at,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Song>, SongError> {
        conn.query_row(
            &format!("SELECT {} FROM songs WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_song,
        )
        .optional()
        .map_err(|e| SongError::Database(e.to_string()))
    }
}

impl SongStore for SqliteSongStore {
    fn create(&self, request: CreateSongRequest) -> Result<Song, SongError> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO songs (id, title, artist, filename_original, status, created_at, progress) VALUES (?, ?, ?, ?, ?, ?, 0)",
            params![
                request.id,
                request.title,
                request.artist,
                request.filename_original,
                SongStatus::Uploaded.as_str(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => SongError::AlreadyExists(request.id.clone()),
            _ => SongError::Database(e.to_string()),
        })?;

        Ok(Song {
            id: request.id,
            title: request.title,
            artist: request.artist,
            filename_original: request.filename_original,
            status: SongStatus::Uploaded,
            progress: 0,
            error_message: None,
            backing_path: None,
            vocals_path: None,
            created_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Song>, SongError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn list(&self, query: &str) -> Result<Vec<Song>, SongError> {
        let conn = self.conn()?;
        let query = query.trim();

        let (sql, pattern) = if query.is_empty() {
            (
                format!("SELECT {} FROM songs ORDER BY created_at DESC", SELECT_COLUMNS),
                None,
            )
        } else {
            (
                format!(
                    "SELECT {} FROM songs WHERE title LIKE ?1 OR artist LIKE ?1 ORDER BY created_at DESC",
                    SELECT_COLUMNS
                ),
                Some(format!("%{}%", query)),
            )
        };

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| SongError::Database(e.to_string()))?;

        let rows = match pattern {
            Some(ref pattern) => stmt.query_map(params![pattern], Self::row_to_song),
            None => stmt.query_map([], Self::row_to_song),
        }
        .map_err(|e| SongError::Database(e.to_string()))?;

        let mut songs = Vec::new();
        for row_result in rows {
            songs.push(row_result.map_err(|e| SongError::Database(e.to_string()))?);
        }

        Ok(songs)
    }

    fn count_by_status(&self, status: SongStatus) -> Result<i64, SongError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM songs WHERE status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| SongError::Database(e.to_string()))
    }

    fn begin_processing(&self, id: &str) -> Result<ProcessingTransition, SongError> {
        let conn = self.conn()?;

        // Conditional update: only one caller can win the transition, even
        // across connections sharing the same database file.
        let changed = conn
            .execute(
                "UPDATE songs SET status = ?1, progress = 0, error_message = NULL, backing_path = NULL, vocals_path = NULL WHERE id = ?2 AND status IN (?3, ?4)",
                params![
                    SongStatus::Processing.as_str(),
                    id,
                    SongStatus::Uploaded.as_str(),
                    SongStatus::Failed.as_str(),
                ],
            )
            .map_err(|e| SongError::Database(e.to_string()))?;

        let song = Self::fetch(&conn, id)?.ok_or_else(|| SongError::NotFound(id.to_string()))?;

        if changed == 1 {
            Ok(ProcessingTransition::Started(song))
        } else {
            Ok(ProcessingTransition::AlreadyActive(song))
        }
    }

    fn set_status(&self, id: &str, update: StatusUpdate) -> Result<(), SongError> {
        let conn = self.conn()?;

        let status = update.status();
        let (error_message, backing_path, vocals_path) = match update {
            StatusUpdate::Processing => (None, None, None),
            StatusUpdate::Ready {
                backing_path,
                vocals_path,
            } => (
                None,
                Some(backing_path.to_string_lossy().to_string()),
                Some(vocals_path.to_string_lossy().to_string()),
            ),
            StatusUpdate::Failed { error_message } => (Some(error_message), None, None),
        };

        let changed = conn
            .execute(
                "UPDATE songs SET status = ?, error_message = ?, backing_path = ?, vocals_path = ? WHERE id = ?",
                params![status.as_str(), error_message, backing_path, vocals_path, id],
            )
            .map_err(|e| SongError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(SongError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn set_progress(&self, id: &str, progress: u8) -> Result<(), SongError> {
        let conn = self.conn()?;

        let changed = conn
            .execute(
                "UPDATE songs SET progress = ? WHERE id = ?",
                params![progress, id],
            )
            .map_err(|e| SongError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(SongError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
