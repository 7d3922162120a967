//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides a scriptable [`MockSeparator`], so the controller and
//! the HTTP layer can be exercised without the real separation tool installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use karaoke_core::testing::{fixtures, MockSeparator};
//!
//! let separator = MockSeparator::new().with_lines(fixtures::progress_lines(&[10, 50, 100]));
//! let store = SqliteSongStore::in_memory()?;
//! let song = store.create(fixtures::create_request("Song", "Artist", "song.mp3"))?;
//!
//! // Use in AppState...
//! ```

mod mock_separator;

pub use mock_separator::{MockOutputs, MockSeparator, RecordedStart};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::song::{new_song_id, CreateSongRequest};

    /// Create a song request with a fresh id.
    pub fn create_request(title: &str, artist: &str, filename: &str) -> CreateSongRequest {
        CreateSongRequest {
            id: new_song_id(),
            title: title.to_string(),
            artist: artist.to_string(),
            filename_original: filename.to_string(),
        }
    }

    /// Progress bar lines, one per raw percentage, in the tool's format.
    pub fn progress_lines(percentages: &[u32]) -> Vec<String> {
        percentages
            .iter()
            .map(|p| {
                let filled = (*p as usize / 10).min(10);
                format!(
                    "{:>3}%|{}{}| {}/100",
                    p,
                    "█".repeat(filled),
                    " ".repeat(10 - filled),
                    p
                )
            })
            .collect()
    }

    /// A single line holding several redraws separated by `\r`.
    pub fn redraw_line(percentages: &[u32]) -> String {
        progress_lines(percentages).join("\r")
    }
}
