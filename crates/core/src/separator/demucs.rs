//! Demucs-based separator implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::config::SeparatorConfig;
use super::error::SeparatorError;
use super::traits::{SeparationProcess, Separator};
use super::types::ExitOutcome;

/// Buffered output lines between the pipe readers and the consumer.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Longest line kept whole; longer output is split at this size.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Demucs-based separator implementation.
pub struct DemucsSeparator {
    config: SeparatorConfig,
}

impl DemucsSeparator {
    /// Creates a new Demucs separator with the given configuration.
    pub fn new(config: SeparatorConfig) -> Self {
        Self { config }
    }

    /// Creates a separator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SeparatorConfig::default())
    }

    pub fn config(&self) -> &SeparatorConfig {
        &self.config
    }

    /// Builds the tool arguments. The input file is always the last positional argument.
    fn build_args(&self, input_path: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = self.config.args.clone();

        args.extend([
            "--two-stems".to_string(),
            self.config.two_stems.clone(),
            "-o".to_string(),
            output_dir.to_string_lossy().to_string(),
        ]);

        args.push(input_path.to_string_lossy().to_string());

        args
    }
}

#[async_trait]
impl Separator for DemucsSeparator {
    fn name(&self) -> &str {
        "demucs"
    }

    async fn validate(&self) -> Result<(), SeparatorError> {
        // `<program> <args> --help` exercises the tool itself, not just the interpreter
        let status = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| SeparatorError::from_spawn(&self.config.program, e))?;

        let outcome = ExitOutcome::from(status);
        if !outcome.success() {
            return Err(SeparatorError::Unavailable {
                program: self.config.program.clone(),
                outcome,
            });
        }

        Ok(())
    }

    async fn start(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<Box<dyn SeparationProcess>, SeparatorError> {
        let args = self.build_args(input_path, output_dir);
        debug!(program = %self.config.program, ?args, "Spawning separator");

        let mut command = Command::new(&self.config.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (child, readers) = spawn_with_merged_output(command, &self.config.program, tx)?;

        Ok(Box::new(DemucsProcess {
            child: Some(child),
            lines: rx,
            readers,
        }))
    }
}

/// A running Demucs process.
///
/// Dropping the handle kills the process if it is still running.
pub struct DemucsProcess {
    child: Option<Child>,
    lines: mpsc::Receiver<String>,
    readers: Vec<JoinHandle<()>>,
}

#[async_trait]
impl SeparationProcess for DemucsProcess {
    fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn wait(&mut self) -> Result<ExitOutcome, SeparatorError> {
        let mut child = self.child.take().ok_or(SeparatorError::AlreadyWaited)?;

        // Unread lines are discarded so the readers can always run to EOF.
        self.lines.close();
        for reader in self.readers.drain(..) {
            if let Err(e) = reader.await {
                warn!("Separator output reader task failed: {}", e);
            }
        }

        let status = child.wait().await?;
        Ok(ExitOutcome::from(status))
    }
}

/// Spawns `command` with stdout and stderr sharing one pipe, so output arrives
/// in the order the process wrote it.
#[cfg(unix)]
fn spawn_with_merged_output(
    mut command: Command,
    program: &str,
    tx: mpsc::Sender<String>,
) -> Result<(Child, Vec<JoinHandle<()>>), SeparatorError> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = std::io::pipe()?;
    command.stdout(writer.try_clone()?).stderr(writer);

    let child = command
        .spawn()
        .map_err(|e| SeparatorError::from_spawn(program, e))?;
    // Release the parent's write ends; EOF arrives once the child closes its own.
    drop(command);

    let output = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok((child, vec![tokio::spawn(forward_lines(output, tx))]))
}

/// Spawns `command` with stdout and stderr on separate pipes feeding one channel.
/// Lines keep their order within each stream.
#[cfg(not(unix))]
fn spawn_with_merged_output(
    mut command: Command,
    program: &str,
    tx: mpsc::Sender<String>,
) -> Result<(Child, Vec<JoinHandle<()>>), SeparatorError> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| SeparatorError::from_spawn(program, e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

    let readers = vec![
        tokio::spawn(forward_lines(stdout, tx.clone())),
        tokio::spawn(forward_lines(stderr, tx)),
    ];
    Ok((child, readers))
}

/// Reads `reader` to EOF, sending each non-blank line to `tx`.
///
/// Keeps draining after the receiver is gone so the child never blocks on a full pipe.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut receiver_open = true;

    loop {
        buf.clear();
        match read_segment(&mut reader, &mut buf).await {
            Ok(true) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if line.is_empty() || !receiver_open {
                    continue;
                }
                if tx.send(line.to_string()).await.is_err() {
                    receiver_open = false;
                }
            }
            Ok(false) => break,
            Err(e) => {
                warn!("Failed to read separator output: {}", e);
                break;
            }
        }
    }
}

/// Reads one segment terminated by `\n` or `\r` into `buf`, without the terminator.
///
/// Terminal progress bars redraw in place with bare `\r`, so both count as line
/// ends; `\r\n` yields an empty segment that callers skip. Returns `false` at EOF
/// when nothing was read.
async fn read_segment<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(!buf.is_empty());
        }

        match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(pos) => {
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                return Ok(true);
            }
            None => {
                let take = available.len().min(MAX_LINE_BYTES - buf.len());
                buf.extend_from_slice(&available[..take]);
                reader.consume(take);
                if buf.len() >= MAX_LINE_BYTES {
                    return Ok(true);
                }
            }
        }
    }
}
