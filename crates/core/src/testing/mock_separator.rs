//! Mock separator for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

use crate::separator::{ExitOutcome, SeparationProcess, Separator, SeparatorError};

/// Stem files the mock leaves behind when its process is waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutputs {
    /// Both stems in `htdemucs/<track>/`.
    Both,
    /// Only the vocals stem.
    VocalsOnly,
    /// No files at all.
    Nothing,
    /// Both stems in two different track directories.
    Ambiguous,
}

/// A recorded `start` call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStart {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
struct MockScript {
    lines: Vec<String>,
    exit: ExitOutcome,
    outputs: MockOutputs,
    held: bool,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            lines: vec![
                "Selected model is a bag of 1 models.".to_string(),
                "Separating track song.mp3".to_string(),
                " 50%|█████     | 50/100 [00:05<00:05]".to_string(),
                "100%|██████████| 100/100 [00:10<00:00]".to_string(),
            ],
            exit: ExitOutcome::exited(0),
            outputs: MockOutputs::Both,
            held: false,
        }
    }
}

/// Mock implementation of the Separator trait.
///
/// Provides controllable behavior for testing:
/// - Scripted output lines and exit code
/// - Stem files written (or not) into the output directory
/// - Spawn failures
/// - Holding a run open until released
///
/// Clones share state, so a test can keep a handle after passing one to the
/// controller.
///
/// # Example
///
/// ```rust,ignore
/// use karaoke_core::testing::{MockOutputs, MockSeparator};
///
/// let separator = MockSeparator::new()
///     .with_lines(["10%", "60%", "100%"])
///     .with_outputs(MockOutputs::VocalsOnly);
///
/// let controller = SeparationController::new(store, storage, Arc::new(separator.clone()), names);
/// controller.trigger(&id).await?;
///
/// assert_eq!(separator.start_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockSeparator {
    script: Arc<RwLock<MockScript>>,
    starts: Arc<RwLock<Vec<RecordedStart>>>,
    next_error: Arc<RwLock<Option<SeparatorError>>>,
    gate: Arc<Notify>,
}

impl Default for MockSeparator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSeparator {
    /// Create a mock that prints a short progress bar, exits 0 and leaves both stems.
    pub fn new() -> Self {
        Self {
            script: Arc::new(RwLock::new(MockScript::default())),
            starts: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            gate: Arc::new(Notify::new()),
        }
    }

    fn edit(self, f: impl FnOnce(&mut MockScript)) -> Self {
        {
            let mut script = self
                .script
                .try_write()
                .expect("mock script is locked; use the async setters on a shared mock");
            f(&mut script);
        }
        self
    }

    /// Output lines the process prints.
    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        self.edit(|s| s.lines = lines)
    }

    /// Exit code the process ends with.
    pub fn with_exit_code(self, code: i32) -> Self {
        self.edit(|s| s.exit = ExitOutcome::exited(code))
    }

    /// Which stem files the process leaves behind.
    pub fn with_outputs(self, outputs: MockOutputs) -> Self {
        self.edit(|s| s.outputs = outputs)
    }

    /// Processes block before their first line until [`release`](Self::release) is called.
    pub fn held(self) -> Self {
        self.edit(|s| s.held = true)
    }

    /// Let one held process continue.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Replace the scripted output lines.
    pub async fn set_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script.write().await.lines = lines.into_iter().map(Into::into).collect();
    }

    /// Replace the scripted exit code.
    pub async fn set_exit_code(&self, code: i32) {
        self.script.write().await.exit = ExitOutcome::exited(code);
    }

    /// Replace the scripted stem files.
    pub async fn set_outputs(&self, outputs: MockOutputs) {
        self.script.write().await.outputs = outputs;
    }

    /// Configure the next `start` to fail with the given error.
    pub async fn set_next_error(&self, error: SeparatorError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all recorded starts.
    pub async fn recorded_starts(&self) -> Vec<RecordedStart> {
        self.starts.read().await.clone()
    }

    /// Get the number of processes started.
    pub async fn start_count(&self) -> usize {
        self.starts.read().await.len()
    }
}

#[async_trait]
impl Separator for MockSeparator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), SeparatorError> {
        Ok(())
    }

    async fn start(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<Box<dyn SeparationProcess>, SeparatorError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        self.starts.write().await.push(RecordedStart {
            input_path: input_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        });

        let script = self.script.read().await.clone();
        let track = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "track".to_string());

        Ok(Box::new(MockProcess {
            lines: script.lines.into_iter().collect(),
            exit: script.exit,
            outputs: script.outputs,
            track_dir: output_dir.join("htdemucs").join(track),
            gate: script.held.then(|| Arc::clone(&self.gate)),
            waited: false,
        }))
    }
}

struct MockProcess {
    lines: VecDeque<String>,
    exit: ExitOutcome,
    outputs: MockOutputs,
    track_dir: PathBuf,
    gate: Option<Arc<Notify>>,
    waited: bool,
}

impl MockProcess {
    async fn write_outputs(&self) -> Result<(), SeparatorError> {
        let dirs = match self.outputs {
            MockOutputs::Nothing => return Ok(()),
            MockOutputs::Both | MockOutputs::VocalsOnly => vec![self.track_dir.clone()],
            MockOutputs::Ambiguous => vec![
                self.track_dir.clone(),
                self.track_dir.with_file_name("duplicate"),
            ],
        };

        for dir in dirs {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(dir.join("vocals.wav"), b"RIFF vocals").await?;
            if self.outputs != MockOutputs::VocalsOnly {
                tokio::fs::write(dir.join("no_vocals.wav"), b"RIFF backing").await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SeparationProcess for MockProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn next_line(&mut self) -> Option<String> {
        if let Some(gate) = self.gate.take() {
            gate.notified().await;
        }
        self.lines.pop_front()
    }

    async fn wait(&mut self) -> Result<ExitOutcome, SeparatorError> {
        if self.waited {
            return Err(SeparatorError::AlreadyWaited);
        }
        self.waited = true;

        self.write_outputs().await?;
        Ok(self.exit)
    }
}
