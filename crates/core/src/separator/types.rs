//! Types shared by separator implementations.

use std::fmt;
use std::process::ExitStatus;

/// How the separation process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    code: Option<i32>,
}

impl ExitOutcome {
    /// Normal exit with the given code.
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Terminated without an exit code (e.g. killed by a signal).
    pub fn terminated() -> Self {
        Self { code: None }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exited with code {}", code),
            None => write!(f, "was terminated by a signal"),
        }
    }
}
