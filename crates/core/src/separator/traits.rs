//! Trait definitions for the separator module.

use async_trait::async_trait;
use std::path::Path;

use super::error::SeparatorError;
use super::types::ExitOutcome;

/// Launches the stem-separation tool.
#[async_trait]
pub trait Separator: Send + Sync {
    /// Returns the name of the tool, used in diagnostics.
    fn name(&self) -> &str;

    /// Checks that the configured tool can be launched.
    async fn validate(&self) -> Result<(), SeparatorError>;

    /// Starts a two-stem separation of `input_path`, writing into `output_dir`.
    async fn start(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<Box<dyn SeparationProcess>, SeparatorError>;
}

/// Handle on one running separation.
///
/// Drain [`next_line`](Self::next_line) until it returns `None`, then call
/// [`wait`](Self::wait) exactly once to reap the process.
#[async_trait]
pub trait SeparationProcess: Send {
    /// OS process id, if the handle is backed by a live process.
    fn id(&self) -> Option<u32>;

    /// Next line of merged stdout/stderr output, in arrival order.
    /// `None` once the process has closed both streams.
    async fn next_line(&mut self) -> Option<String>;

    /// Waits for the process to terminate.
    async fn wait(&mut self) -> Result<ExitOutcome, SeparatorError>;
}
