//! Deterministic path resolution for uploads and separation outputs.

use std::path::{Path, PathBuf};

use super::error::PathError;

/// File name of the canonical instrumental stem.
pub const BACKING_FILENAME: &str = "backing.wav";

/// File name of the canonical vocals stem.
pub const VOCALS_FILENAME: &str = "vocals.wav";

/// Extension used when the uploaded file name has none.
pub const DEFAULT_UPLOAD_EXTENSION: &str = "mp3";

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";
const DEFAULT_RAW_DIR_NAME: &str = "demucs_raw";

/// Resolves storage locations for songs under a single root directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    raw_dir_name: String,
}

impl StorageLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raw_dir_name: DEFAULT_RAW_DIR_NAME.to_string(),
        }
    }

    /// Sets the name of the separator's working directory inside each output directory.
    pub fn with_raw_dir_name(mut self, name: impl Into<String>) -> Self {
        self.raw_dir_name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    /// Creates the uploads and outputs roots. Idempotent.
    pub async fn ensure_dirs(&self) -> Result<(), PathError> {
        create_dir(&self.uploads_dir()).await?;
        create_dir(&self.outputs_dir()).await
    }

    /// Location of the uploaded track. The extension comes from the original
    /// file name, falling back to `.mp3`.
    pub fn upload_path(&self, song_id: &str, filename_original: &str) -> PathBuf {
        let extension = Path::new(filename_original)
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_EXTENSION.to_string());

        self.uploads_dir()
            .join(format!("{}.{}", song_id, extension))
    }

    /// Per-song output directory (path only, nothing is created).
    pub fn output_dir_path(&self, song_id: &str) -> PathBuf {
        self.outputs_dir().join(song_id)
    }

    /// Per-song output directory, created if absent.
    pub async fn output_dir(&self, song_id: &str) -> Result<PathBuf, PathError> {
        let dir = self.output_dir_path(song_id);
        create_dir(&dir).await?;
        Ok(dir)
    }

    /// The separator's working directory for a song (path only).
    pub fn raw_output_dir_path(&self, song_id: &str) -> PathBuf {
        self.output_dir_path(song_id).join(&self.raw_dir_name)
    }

    /// Recreates the separator's working directory empty, so a new run never
    /// sees files left behind by an earlier one.
    pub async fn fresh_raw_output_dir(&self, song_id: &str) -> Result<PathBuf, PathError> {
        let dir = self.raw_output_dir_path(song_id);

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(PathError::ClearFailed { path: dir, source }),
        }

        create_dir(&dir).await?;
        Ok(dir)
    }

    /// Canonical destination of the instrumental stem.
    pub fn backing_path(&self, song_id: &str) -> PathBuf {
        self.output_dir_path(song_id).join(BACKING_FILENAME)
    }

    /// Canonical destination of the vocals stem.
    pub fn vocals_path(&self, song_id: &str) -> PathBuf {
        self.output_dir_path(song_id).join(VOCALS_FILENAME)
    }

    /// Writes an uploaded track to its input location and returns that location.
    pub async fn save_upload(
        &self,
        song_id: &str,
        filename_original: &str,
        contents: &[u8],
    ) -> Result<PathBuf, PathError> {
        create_dir(&self.uploads_dir()).await?;

        let dest = self.upload_path(song_id, filename_original);
        tokio::fs::write(&dest, contents)
            .await
            .map_err(|source| PathError::WriteFailed {
                path: dest.clone(),
                source,
            })?;

        Ok(dest)
    }
}

async fn create_dir(path: &Path) -> Result<(), PathError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| PathError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source,
        })
}
