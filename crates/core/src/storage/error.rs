//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem faults while preparing or writing storage locations.
///
/// A missing input file is not a `PathError`; existence is checked by callers.
#[derive(Debug, Error)]
pub enum PathError {
    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to clear a stale working directory.
    #[error("Failed to clear directory {path}: {source}")]
    ClearFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PathError {
    /// The path the failed operation targeted.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::DirectoryCreationFailed { path, .. }
            | Self::ClearFailed { path, .. }
            | Self::WriteFailed { path, .. } => path,
        }
    }
}
