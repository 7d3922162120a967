//! Error types for the separator module.

use thiserror::Error;

use super::types::ExitOutcome;

/// Errors that can occur while supervising the separation tool.
#[derive(Debug, Error)]
pub enum SeparatorError {
    /// The executable could not be located.
    #[error("Separator program not found: {program}")]
    ProgramNotFound { program: String },

    /// The executable was found but could not be started.
    #[error("Failed to start separator {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program started but its self-check did not succeed.
    #[error("Separator {program} is not usable: check {outcome}")]
    Unavailable {
        program: String,
        outcome: ExitOutcome,
    },

    /// I/O error while talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `wait` was called more than once.
    #[error("Separator process was already waited on")]
    AlreadyWaited,
}

impl SeparatorError {
    /// Classifies a spawn failure.
    pub fn from_spawn(program: &str, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::ProgramNotFound {
                program: program.to_string(),
            }
        } else {
            Self::Spawn {
                program: program.to_string(),
                source: error,
            }
        }
    }
}
