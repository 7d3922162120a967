//! Error types for the separation controller.

use std::path::PathBuf;
use thiserror::Error;

use crate::separator::{ExitOutcome, SeparatorError};
use crate::song::SongError;
use crate::storage::PathError;

/// Errors raised by a trigger or inside a separation run.
///
/// Only `NotFound` and `Store` reach the caller of
/// [`SeparationController::trigger`](super::SeparationController::trigger);
/// everything raised inside a run is committed to the song as `FAILED`.
#[derive(Debug, Error)]
pub enum JobError {
    /// Unknown song id.
    #[error("Song not found: {0}")]
    NotFound(String),

    /// Record store failure.
    #[error(transparent)]
    Store(SongError),

    /// Filesystem fault while preparing directories.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The separator could not be started or supervised.
    #[error(transparent)]
    Separator(#[from] SeparatorError),

    /// The separator ran but did not succeed.
    #[error("{tool} {outcome}")]
    ToolFailed { tool: String, outcome: ExitOutcome },

    /// The separator exited cleanly but the expected stems are absent.
    #[error("Expected {expected} under {}, found: {}", .dir.display(), describe_found(.found))]
    MissingArtifacts {
        dir: PathBuf,
        expected: String,
        found: Vec<String>,
    },

    /// More than one candidate directory holds the stems.
    #[error("Found {} candidates for {file}: {}", .candidates.len(), join_paths(.candidates))]
    AmbiguousArtifacts {
        file: String,
        candidates: Vec<PathBuf>,
    },

    /// I/O error while collecting artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SongError> for JobError {
    fn from(err: SongError) -> Self {
        match err {
            SongError::NotFound(id) => JobError::NotFound(id),
            other => JobError::Store(other),
        }
    }
}

impl JobError {
    /// Short label used for failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::NotFound(_) | JobError::Store(_) => "store",
            JobError::Path(_) | JobError::Io(_) => "io",
            JobError::Separator(_) => "spawn",
            JobError::ToolFailed { .. } => "exit_code",
            JobError::MissingArtifacts { .. } => "missing_artifacts",
            JobError::AmbiguousArtifacts { .. } => "ambiguous_artifacts",
        }
    }
}

fn describe_found(found: &[String]) -> String {
    if found.is_empty() {
        "nothing".to_string()
    } else {
        format!("[{}]", found.join(", "))
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
