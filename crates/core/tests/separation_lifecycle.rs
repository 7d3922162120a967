//! Separation lifecycle integration tests.
//!
//! These tests drive the separation controller with the mock separator:
//! - End-to-end run to READY with canonical stem paths
//! - Progress persistence (strictly increasing only)
//! - Failure paths (spawn, exit code, missing artifacts)
//! - Re-triggering rules for PROCESSING, READY and FAILED songs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use karaoke_core::{
    controller::{ArtifactNames, JobError, SeparationController},
    separator::SeparatorError,
    song::{
        CreateSongRequest, ProcessingTransition, Song, SongError, SongStatus, SongStore,
        SqliteSongStore, StatusUpdate,
    },
    storage::StorageLayout,
    testing::{fixtures, MockOutputs, MockSeparator},
};

/// Store wrapper that records every progress and status write.
struct RecordingSongStore {
    inner: SqliteSongStore,
    progress_writes: Mutex<Vec<u8>>,
    status_writes: Mutex<Vec<StatusUpdate>>,
}

impl RecordingSongStore {
    fn new(inner: SqliteSongStore) -> Self {
        Self {
            inner,
            progress_writes: Mutex::new(Vec::new()),
            status_writes: Mutex::new(Vec::new()),
        }
    }

    fn progress_writes(&self) -> Vec<u8> {
        self.progress_writes.lock().unwrap().clone()
    }

    fn status_writes(&self) -> Vec<StatusUpdate> {
        self.status_writes.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.progress_writes.lock().unwrap().clear();
        self.status_writes.lock().unwrap().clear();
    }
}

impl SongStore for RecordingSongStore {
    fn create(&self, request: CreateSongRequest) -> Result<Song, SongError> {
        self.inner.create(request)
    }

    fn get(&self, id: &str) -> Result<Option<Song>, SongError> {
        self.inner.get(id)
    }

    fn list(&self, query: &str) -> Result<Vec<Song>, SongError> {
        self.inner.list(query)
    }

    fn count_by_status(&self, status: SongStatus) -> Result<i64, SongError> {
        self.inner.count_by_status(status)
    }

    fn begin_processing(&self, id: &str) -> Result<ProcessingTransition, SongError> {
        self.inner.begin_processing(id)
    }

    fn set_status(&self, id: &str, update: StatusUpdate) -> Result<(), SongError> {
        self.status_writes.lock().unwrap().push(update.clone());
        self.inner.set_status(id, update)
    }

    fn set_progress(&self, id: &str, progress: u8) -> Result<(), SongError> {
        self.progress_writes.lock().unwrap().push(progress);
        self.inner.set_progress(id, progress)
    }
}

/// Test helper wiring the controller to a recording store and the mock separator.
struct TestHarness {
    controller: SeparationController,
    separator: MockSeparator,
    store: Arc<RecordingSongStore>,
    storage: StorageLayout,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new(separator: MockSeparator) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(RecordingSongStore::new(
            SqliteSongStore::new(&db_path).expect("Failed to create song store"),
        ));
        let storage = StorageLayout::new(temp_dir.path().join("storage"));
        storage.ensure_dirs().await.expect("Failed to create storage dirs");

        let controller = SeparationController::new(
            Arc::clone(&store) as Arc<dyn SongStore>,
            storage.clone(),
            Arc::new(separator.clone()),
            ArtifactNames::default(),
        );

        Self {
            controller,
            separator,
            store,
            storage,
            _temp_dir: temp_dir,
        }
    }

    async fn upload(&self, filename: &str) -> String {
        let song = self
            .store
            .create(fixtures::create_request("Song", "Artist", filename))
            .expect("Failed to create song");
        self.storage
            .save_upload(&song.id, filename, b"ID3 fake audio")
            .await
            .expect("Failed to save upload");
        song.id
    }

    fn song(&self, id: &str) -> Song {
        self.store.get(id).unwrap().expect("song should exist")
    }

    /// Polls until the song leaves PROCESSING and no run is active.
    async fn wait_for_terminal(&self, id: &str) -> Song {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let song = self.song(id);
                let idle = self.controller.status().await.active_runs.is_empty();
                if song.status != SongStatus::Processing && idle {
                    return song;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("run did not reach a terminal state")
    }
}

#[tokio::test]
async fn test_end_to_end_ready() {
    let separator = MockSeparator::new().with_lines([
        "Selected model is a bag of 1 models.",
        "Separating track song.mp3",
        " 50%|█████     | 50/100",
        "100%|██████████| 100/100",
    ]);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    let response = harness.controller.trigger(&id).await.unwrap();
    assert_eq!(response.status, SongStatus::Processing);
    assert!(response.started());

    let song = harness.wait_for_terminal(&id).await;

    assert_eq!(song.status, SongStatus::Ready);
    assert_eq!(song.progress, 100);
    assert!(song.error_message.is_none());
    assert_eq!(song.backing_path, Some(harness.storage.backing_path(&id)));
    assert_eq!(song.vocals_path, Some(harness.storage.vocals_path(&id)));

    assert_eq!(
        std::fs::read(harness.storage.backing_path(&id)).unwrap(),
        b"RIFF backing"
    );
    assert_eq!(
        std::fs::read(harness.storage.vocals_path(&id)).unwrap(),
        b"RIFF vocals"
    );

    assert_eq!(harness.store.progress_writes(), vec![50, 95, 100]);
}

#[tokio::test]
async fn test_separator_receives_input_and_fresh_raw_dir() {
    let harness = TestHarness::new(MockSeparator::new()).await;
    let id = harness.upload("track.flac").await;

    // Leftovers from an earlier run must not survive
    let raw_dir = harness.storage.raw_output_dir_path(&id);
    std::fs::create_dir_all(raw_dir.join("htdemucs/old")).unwrap();
    std::fs::write(raw_dir.join("htdemucs/old/vocals.wav"), b"stale").unwrap();

    harness.controller.trigger(&id).await.unwrap();
    let song = harness.wait_for_terminal(&id).await;
    assert_eq!(song.status, SongStatus::Ready);

    let starts = harness.separator.recorded_starts().await;
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].input_path, harness.storage.upload_path(&id, "track.flac"));
    assert_eq!(starts[0].output_dir, raw_dir);
    assert!(!raw_dir.join("htdemucs/old").exists());
}

#[tokio::test]
async fn test_progress_persisted_strictly_increasing() {
    // Raw 0, 0, 8, 3, 39 map to 5, 5, 12, 7, 40
    let separator = MockSeparator::new()
        .with_lines(fixtures::progress_lines(&[0, 0, 8, 3, 39]))
        .with_outputs(MockOutputs::Nothing);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let song = harness.wait_for_terminal(&id).await;

    assert_eq!(harness.store.progress_writes(), vec![5, 12, 40]);
    // Failure leaves progress where the run stopped
    assert_eq!(song.status, SongStatus::Failed);
    assert_eq!(song.progress, 40);
}

#[tokio::test]
async fn test_carriage_return_redraws_use_latest() {
    let separator = MockSeparator::new().with_lines(vec![
        fixtures::redraw_line(&[10, 20, 30]),
        "no percentage here".to_string(),
        fixtures::redraw_line(&[60, 25]),
    ]);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    harness.wait_for_terminal(&id).await;

    // 30% -> 32, then 25% -> 27 is a regression and dropped
    assert_eq!(harness.store.progress_writes(), vec![32, 100]);
}

#[tokio::test]
async fn test_nonzero_exit_fails_with_code() {
    let separator = MockSeparator::new()
        .with_lines(fixtures::progress_lines(&[10, 20]))
        .with_exit_code(3);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let song = harness.wait_for_terminal(&id).await;

    assert_eq!(song.status, SongStatus::Failed);
    let message = song.error_message.expect("error message should be set");
    assert!(message.contains("exited with code 3"), "message: {}", message);
    assert!(song.backing_path.is_none());
    assert!(song.vocals_path.is_none());
    assert_eq!(song.progress, 23);

    assert!(harness
        .store
        .status_writes()
        .iter()
        .all(|u| !matches!(u, StatusUpdate::Ready { .. })));
}

#[tokio::test]
async fn test_missing_artifacts_fail() {
    let separator = MockSeparator::new().with_outputs(MockOutputs::VocalsOnly);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let song = harness.wait_for_terminal(&id).await;

    assert_eq!(song.status, SongStatus::Failed);
    assert!(song.backing_path.is_none());
    assert!(song.vocals_path.is_none());
    let message = song.error_message.unwrap();
    assert!(message.contains("no_vocals.wav"), "message: {}", message);
    assert!(message.contains("vocals.wav"), "message: {}", message);
    assert!(!harness.storage.backing_path(&id).exists());
}

#[tokio::test]
async fn test_no_output_lists_nothing() {
    let separator = MockSeparator::new().with_outputs(MockOutputs::Nothing);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let song = harness.wait_for_terminal(&id).await;

    assert_eq!(song.status, SongStatus::Failed);
    assert!(song.error_message.unwrap().contains("found: nothing"));
}

#[tokio::test]
async fn test_ambiguous_artifacts_fail() {
    let separator = MockSeparator::new().with_outputs(MockOutputs::Ambiguous);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let song = harness.wait_for_terminal(&id).await;

    assert_eq!(song.status, SongStatus::Failed);
    assert!(song.error_message.unwrap().contains("candidates"));
    assert!(song.backing_path.is_none());
}

#[tokio::test]
async fn test_spawn_failure_fails_run() {
    let harness = TestHarness::new(MockSeparator::new()).await;
    harness
        .separator
        .set_next_error(SeparatorError::ProgramNotFound {
            program: "python".to_string(),
        })
        .await;
    let id = harness.upload("song.mp3").await;

    let response = harness.controller.trigger(&id).await.unwrap();
    assert_eq!(response.status, SongStatus::Processing);

    let song = harness.wait_for_terminal(&id).await;
    assert_eq!(song.status, SongStatus::Failed);
    assert!(song.error_message.unwrap().contains("not found"));
    assert_eq!(song.progress, 0);
    assert_eq!(harness.controller.status().await.total_failed, 1);
}

#[tokio::test]
async fn test_unknown_song_is_not_found() {
    let harness = TestHarness::new(MockSeparator::new()).await;

    let result = harness.controller.trigger("no-such-song").await;

    assert!(matches!(result, Err(JobError::NotFound(_))));
    assert_eq!(harness.separator.start_count().await, 0);
    assert!(harness.store.status_writes().is_empty());
}

#[tokio::test]
async fn test_trigger_while_processing_is_noop() {
    let separator = MockSeparator::new().held();
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let before = harness.song(&id);

    let second = harness.controller.trigger(&id).await.unwrap();
    assert_eq!(second.status, SongStatus::Processing);
    assert!(!second.started());
    assert_eq!(harness.song(&id), before);

    harness.separator.release();
    let song = harness.wait_for_terminal(&id).await;
    assert_eq!(song.status, SongStatus::Ready);
    assert_eq!(harness.separator.start_count().await, 1);
}

#[tokio::test]
async fn test_trigger_when_ready_is_noop() {
    let harness = TestHarness::new(MockSeparator::new()).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let ready = harness.wait_for_terminal(&id).await;
    assert_eq!(ready.status, SongStatus::Ready);
    harness.store.clear();

    let response = harness.controller.trigger(&id).await.unwrap();
    assert_eq!(response.status, SongStatus::Ready);
    assert!(!response.started());

    assert_eq!(harness.song(&id), ready);
    assert!(harness.store.progress_writes().is_empty());
    assert!(harness.store.status_writes().is_empty());
    assert_eq!(harness.separator.start_count().await, 1);
}

#[tokio::test]
async fn test_retrigger_after_failure() {
    let separator = MockSeparator::new()
        .with_lines(fixtures::progress_lines(&[40]))
        .with_exit_code(1);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let failed = harness.wait_for_terminal(&id).await;
    assert_eq!(failed.status, SongStatus::Failed);
    assert_eq!(failed.progress, 41);

    harness.separator.set_exit_code(0).await;
    harness.separator.set_lines(fixtures::progress_lines(&[80])).await;
    harness.store.clear();

    let response = harness.controller.trigger(&id).await.unwrap();
    assert!(response.started());

    let song = harness.wait_for_terminal(&id).await;
    assert_eq!(song.status, SongStatus::Ready);
    assert!(song.error_message.is_none());
    assert_eq!(song.progress, 100);

    // The new run starts counting from the reset value
    assert_eq!(harness.store.progress_writes(), vec![77, 100]);
    assert_eq!(harness.separator.start_count().await, 2);
}

#[tokio::test]
async fn test_retrigger_resets_fields_before_first_update() {
    let separator = MockSeparator::new().with_exit_code(2);
    let harness = TestHarness::new(separator).await;
    let id = harness.upload("song.mp3").await;

    harness.controller.trigger(&id).await.unwrap();
    let failed = harness.wait_for_terminal(&id).await;
    assert!(failed.error_message.is_some());

    let transition = harness.store.begin_processing(&id).unwrap();
    match transition {
        ProcessingTransition::Started(song) => {
            assert_eq!(song.status, SongStatus::Processing);
            assert_eq!(song.progress, 0);
            assert!(song.error_message.is_none());
            assert!(song.backing_path.is_none());
            assert!(song.vocals_path.is_none());
        }
        other => panic!("expected a new run, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_songs_run_independently() {
    let harness = TestHarness::new(MockSeparator::new()).await;
    let a = harness.upload("a.mp3").await;
    let b = harness.upload("b.wav").await;

    harness.controller.trigger(&a).await.unwrap();
    harness.controller.trigger(&b).await.unwrap();

    assert_eq!(harness.wait_for_terminal(&a).await.status, SongStatus::Ready);
    assert_eq!(harness.wait_for_terminal(&b).await.status, SongStatus::Ready);
    assert_ne!(
        harness.storage.backing_path(&a),
        harness.storage.backing_path(&b)
    );
    assert_eq!(harness.controller.status().await.total_completed, 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_process_end_to_end() {
    use karaoke_core::separator::{DemucsSeparator, SeparatorConfig};

    // Stands in for the tool: prints a progress bar with \r redraws to stderr,
    // then writes both stems under the -o directory ($4).
    let script = r#"
printf 'Separating track %s\n' "$5"
printf ' 25%%|##  \r 50%%|#####\r' >&2
printf '100%%|##########\n' >&2
mkdir -p "$4/htdemucs/track"
printf 'vocals' > "$4/htdemucs/track/vocals.wav"
printf 'backing' > "$4/htdemucs/track/no_vocals.wav"
"#;
    let config = SeparatorConfig::with_program(
        "sh",
        vec!["-c".to_string(), script.to_string(), "sh".to_string()],
    );

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteSongStore::in_memory().unwrap());
    let storage = StorageLayout::new(temp_dir.path());
    let controller = SeparationController::new(
        Arc::clone(&store) as Arc<dyn SongStore>,
        storage.clone(),
        Arc::new(DemucsSeparator::new(config.clone())),
        ArtifactNames::from(&config),
    );

    let song = store
        .create(fixtures::create_request("Real", "Process", "real.mp3"))
        .unwrap();
    storage.save_upload(&song.id, "real.mp3", b"audio").await.unwrap();

    controller.trigger(&song.id).await.unwrap();

    let song = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let song = store.get(&song.id).unwrap().unwrap();
            if song.status != SongStatus::Processing {
                return song;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("real process run did not finish");

    assert_eq!(song.status, SongStatus::Ready, "error: {:?}", song.error_message);
    assert_eq!(song.progress, 100);
    assert_eq!(
        std::fs::read_to_string(storage.vocals_path(&song.id)).unwrap(),
        "vocals"
    );
    assert_eq!(
        std::fs::read_to_string(storage.backing_path(&song.id)).unwrap(),
        "backing"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_process_failure() {
    use karaoke_core::separator::{DemucsSeparator, SeparatorConfig};

    let config = SeparatorConfig::with_program(
        "sh",
        vec![
            "-c".to_string(),
            "echo 'RuntimeError: bad input' >&2; exit 7".to_string(),
            "sh".to_string(),
        ],
    );

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteSongStore::in_memory().unwrap());
    let storage = StorageLayout::new(temp_dir.path());
    let controller = SeparationController::new(
        Arc::clone(&store) as Arc<dyn SongStore>,
        storage.clone(),
        Arc::new(DemucsSeparator::new(config)),
        ArtifactNames::default(),
    );

    let song = store
        .create(fixtures::create_request("Broken", "Process", "broken.mp3"))
        .unwrap();

    controller.trigger(&song.id).await.unwrap();

    let song = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let song = store.get(&song.id).unwrap().unwrap();
            if song.status != SongStatus::Processing {
                return song;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("real process run did not finish");

    assert_eq!(song.status, SongStatus::Failed);
    assert_eq!(
        song.error_message.as_deref(),
        Some("demucs exited with code 7")
    );
}
