//! Song records: the persisted state of every uploaded track and its separation run.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteSongStore;
pub use store::{CreateSongRequest, ProcessingTransition, SongError, SongStore, StatusUpdate};
pub use types::{new_song_id, ParseStatusError, Song, SongStatus, SongSummary};
