//! Song storage trait and types.

use std::path::PathBuf;
use thiserror::Error;

use crate::song::{Song, SongStatus};

/// Error type for song store operations.
#[derive(Debug, Error)]
pub enum SongError {
    /// Song not found.
    #[error("Song not found: {0}")]
    NotFound(String),
    /// A song with this id already exists.
    #[error("Song already exists: {0}")]
    AlreadyExists(String),
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to register a newly uploaded song.
#[derive(Debug, Clone)]
pub struct CreateSongRequest {
    /// Identifier assigned at upload time (see [`crate::song::new_song_id`]).
    pub id: String,
    pub title: String,
    pub artist: String,
    pub filename_original: String,
}

/// A status write. Each variant replaces status, error message and both
/// artifact paths in a single update, so a partial artifact set is never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Run in progress; error and artifacts cleared.
    Processing,
    /// Run succeeded with both stems in place.
    Ready {
        backing_path: PathBuf,
        vocals_path: PathBuf,
    },
    /// Run failed; artifacts cleared.
    Failed { error_message: String },
}

impl StatusUpdate {
    pub fn status(&self) -> SongStatus {
        match self {
            StatusUpdate::Processing => SongStatus::Processing,
            StatusUpdate::Ready { .. } => SongStatus::Ready,
            StatusUpdate::Failed { .. } => SongStatus::Failed,
        }
    }
}

/// Outcome of [`SongStore::begin_processing`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingTransition {
    /// The song moved to `PROCESSING` with progress reset; the caller owns the run.
    Started(Song),
    /// The song is already `PROCESSING` or `READY`; nothing was written.
    AlreadyActive(Song),
}

/// Trait for song storage backends.
///
/// All operations are synchronous and durable on return.
pub trait SongStore: Send + Sync {
    /// Insert a new song with status `UPLOADED` and progress 0.
    fn create(&self, request: CreateSongRequest) -> Result<Song, SongError>;

    /// Get a song by ID.
    fn get(&self, id: &str) -> Result<Option<Song>, SongError>;

    /// List songs, newest first. A non-empty query keeps only songs whose
    /// title or artist contains it.
    fn list(&self, query: &str) -> Result<Vec<Song>, SongError>;

    /// Count songs currently in the given status.
    fn count_by_status(&self, status: SongStatus) -> Result<i64, SongError>;

    /// Atomically move `UPLOADED | FAILED → PROCESSING`, resetting progress to 0
    /// and clearing error and artifact fields in the same write.
    fn begin_processing(&self, id: &str) -> Result<ProcessingTransition, SongError>;

    /// Replace status, error message and artifact paths in one update.
    fn set_status(&self, id: &str, update: StatusUpdate) -> Result<(), SongError>;

    /// Update only the progress field.
    fn set_progress(&self, id: &str, progress: u8) -> Result<(), SongError>;
}
