//! Core song data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Generates a fresh song identifier.
///
/// Identifiers are random v4 UUIDs, assigned once at upload time and never reused.
pub fn new_song_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lifecycle status of a song.
///
/// ```text
/// UPLOADED ──► PROCESSING ──► READY
///                  │
///                  └────────► FAILED ──► PROCESSING (re-trigger)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SongStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
}

impl SongStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [SongStatus; 4] = [
        SongStatus::Uploaded,
        SongStatus::Processing,
        SongStatus::Ready,
        SongStatus::Failed,
    ];

    /// The persisted (and wire) representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SongStatus::Uploaded => "UPLOADED",
            SongStatus::Processing => "PROCESSING",
            SongStatus::Ready => "READY",
            SongStatus::Failed => "FAILED",
        }
    }

    /// Whether a new separation run may start from this status.
    pub fn can_start_run(&self) -> bool {
        matches!(self, SongStatus::Uploaded | SongStatus::Failed)
    }
}

impl fmt::Display for SongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a persisted status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown song status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SongStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADED" => Ok(SongStatus::Uploaded),
            "PROCESSING" => Ok(SongStatus::Processing),
            "READY" => Ok(SongStatus::Ready),
            "FAILED" => Ok(SongStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A persisted song record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// Unique identifier (UUID), immutable.
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Name of the file as uploaded by the user.
    pub filename_original: String,
    pub status: SongStatus,
    /// Progress of the current (or last) run, 0-100.
    pub progress: u8,
    /// Only set when `status` is `Failed`.
    pub error_message: Option<String>,
    /// Only set when `status` is `Ready`.
    pub backing_path: Option<PathBuf>,
    /// Only set when `status` is `Ready`.
    pub vocals_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

/// Compact listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub status: SongStatus,
}

impl From<Song> for SongSummary {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            status: song.status,
        }
    }
}
