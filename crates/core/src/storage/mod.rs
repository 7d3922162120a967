//! Content storage layout.
//!
//! Maps a song id to where its upload lives and where its separation output goes:
//!
//! ```text
//! <root>/uploads/<id><ext>                 uploaded track
//! <root>/outputs/<id>/                     per-song output directory
//! <root>/outputs/<id>/<raw_dir_name>/...   separator working tree
//! <root>/outputs/<id>/backing.wav          canonical instrumental stem
//! <root>/outputs/<id>/vocals.wav           canonical vocals stem
//! ```

mod error;
mod layout;

pub use error::PathError;
pub use layout::{StorageLayout, BACKING_FILENAME, DEFAULT_UPLOAD_EXTENSION, VOCALS_FILENAME};
