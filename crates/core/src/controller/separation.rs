//! Separation run lifecycle.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::progress::{parse_progress, ProgressTracker};
use crate::separator::Separator;
use crate::song::{ProcessingTransition, Song, SongStatus, SongStore, StatusUpdate};
use crate::storage::StorageLayout;

use super::artifacts::{locate_artifacts, ArtifactNames, LocatedArtifacts};
use super::error::JobError;
use super::types::{ControllerStatus, TriggerResponse};

/// Cumulative run counters.
#[derive(Default)]
struct RunStats {
    total_completed: AtomicU64,
    total_failed: AtomicU64,
}

/// Everything a background run needs.
struct RunContext {
    store: Arc<dyn SongStore>,
    storage: StorageLayout,
    separator: Arc<dyn Separator>,
    artifacts: ArtifactNames,
}

/// Drives songs from `UPLOADED` (or `FAILED`) through a separation run to
/// `READY` or `FAILED`.
///
/// Runs execute as background tasks; callers observe them by polling the store.
pub struct SeparationController {
    context: Arc<RunContext>,
    active_runs: Arc<RwLock<HashSet<String>>>,
    stats: Arc<RunStats>,
}

impl SeparationController {
    /// Creates a new controller.
    pub fn new(
        store: Arc<dyn SongStore>,
        storage: StorageLayout,
        separator: Arc<dyn Separator>,
        artifacts: ArtifactNames,
    ) -> Self {
        Self {
            context: Arc::new(RunContext {
                store,
                storage,
                separator,
                artifacts,
            }),
            active_runs: Arc::new(RwLock::new(HashSet::new())),
            stats: Arc::new(RunStats::default()),
        }
    }

    /// Returns the current controller status.
    pub async fn status(&self) -> ControllerStatus {
        let mut active_runs: Vec<String> = self.active_runs.read().await.iter().cloned().collect();
        active_runs.sort();

        ControllerStatus {
            active_runs,
            total_completed: self.stats.total_completed.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
        }
    }

    /// Requests separation of a song.
    ///
    /// Returns immediately after committing `PROCESSING`; the run proceeds in the
    /// background. A song that is already `PROCESSING` or `READY` is left untouched
    /// and its current status is reported.
    pub async fn trigger(&self, song_id: &str) -> Result<TriggerResponse, JobError> {
        let song = match self.context.store.begin_processing(song_id)? {
            ProcessingTransition::Started(song) => song,
            ProcessingTransition::AlreadyActive(song) => {
                debug!(song_id = %song.id, status = %song.status, "Trigger ignored");
                let message = match song.status {
                    SongStatus::Ready => "Song is already separated",
                    _ => "Separation already in progress",
                };
                return Ok(TriggerResponse {
                    id: song.id,
                    status: song.status,
                    message: Some(message.to_string()),
                });
            }
        };

        info!(song_id = %song.id, title = %song.title, "Separation triggered");

        let response = TriggerResponse {
            id: song.id.clone(),
            status: song.status,
            message: None,
        };

        self.active_runs.write().await.insert(song.id.clone());

        let context = Arc::clone(&self.context);
        let active_runs = Arc::clone(&self.active_runs);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let song_id = song.id.clone();
            context.run(song, &stats).await;

            let mut runs = active_runs.write().await;
            runs.remove(&song_id);
        });

        Ok(response)
    }
}

impl RunContext {
    /// Runs the separator for `song` and commits the terminal status.
    async fn run(&self, song: Song, stats: &RunStats) {
        let start = Instant::now();
        metrics::RUNS_STARTED.inc();
        info!(
            song_id = %song.id,
            separator = self.separator.name(),
            "Starting separation"
        );

        let result = self.execute(&song).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                stats.total_completed.fetch_add(1, Ordering::Relaxed);
                metrics::RUNS_TOTAL.with_label_values(&["ready"]).inc();
                metrics::RUN_DURATION
                    .with_label_values(&["ready"])
                    .observe(elapsed);
                info!(song_id = %song.id, elapsed_secs = elapsed, "Separation finished");
            }
            Err(e) => {
                stats.total_failed.fetch_add(1, Ordering::Relaxed);
                metrics::RUNS_TOTAL.with_label_values(&["failed"]).inc();
                metrics::RUN_FAILURES.with_label_values(&[e.kind()]).inc();
                metrics::RUN_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                error!(song_id = %song.id, error = %e, "Separation failed");

                let update = StatusUpdate::Failed {
                    error_message: e.to_string(),
                };
                if let Err(commit_err) = self.store.set_status(&song.id, update) {
                    error!(
                        song_id = %song.id,
                        error = %commit_err,
                        "Failed to record separation failure"
                    );
                }
            }
        }
    }

    async fn execute(&self, song: &Song) -> Result<(), JobError> {
        let tool = self.separator.name();
        let input_path = self.storage.upload_path(&song.id, &song.filename_original);
        let raw_dir = self.storage.fresh_raw_output_dir(&song.id).await?;

        let mut process = self.separator.start(&input_path, &raw_dir).await?;
        debug!(song_id = %song.id, pid = ?process.id(), "Separator started");

        let mut tracker = ProgressTracker::starting_at(song.progress);
        while let Some(line) = process.next_line().await {
            metrics::OUTPUT_LINES.inc();
            debug!(song_id = %song.id, "[{}] {}", tool, line);

            if let Some(progress) = parse_progress(&line).and_then(|p| tracker.advance(p)) {
                self.store.set_progress(&song.id, progress)?;
                metrics::PROGRESS_UPDATES.inc();
            }
        }

        let outcome = process.wait().await?;
        if !outcome.success() {
            return Err(JobError::ToolFailed {
                tool: tool.to_string(),
                outcome,
            });
        }

        let found = self.find_artifacts(&raw_dir).await?;
        let backing_path = self.storage.backing_path(&song.id);
        let vocals_path = self.storage.vocals_path(&song.id);

        copy_artifact(&found.backing, &backing_path).await?;
        copy_artifact(&found.vocals, &vocals_path).await?;

        self.store.set_progress(&song.id, 100)?;
        self.store.set_status(
            &song.id,
            StatusUpdate::Ready {
                backing_path,
                vocals_path,
            },
        )?;

        Ok(())
    }

    async fn find_artifacts(&self, raw_dir: &Path) -> Result<LocatedArtifacts, JobError> {
        let raw_dir: PathBuf = raw_dir.to_path_buf();
        let names = self.artifacts.clone();

        tokio::task::spawn_blocking(move || locate_artifacts(&raw_dir, &names))
            .await
            .map_err(|e| JobError::Io(std::io::Error::other(e)))?
    }
}

async fn copy_artifact(src: &Path, dest: &Path) -> Result<(), JobError> {
    tokio::fs::copy(src, dest).await.map_err(|e| {
        warn!(
            "Failed to copy {} to {}: {}",
            src.display(),
            dest.display(),
            e
        );
        JobError::Io(e)
    })?;
    Ok(())
}
