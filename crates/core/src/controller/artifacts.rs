//! Locating the separator's stems in its working tree.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::separator::SeparatorConfig;

use super::error::JobError;

/// File names the separator gives its two stems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub vocals_file: String,
    pub backing_file: String,
}

impl From<&SeparatorConfig> for ArtifactNames {
    fn from(config: &SeparatorConfig) -> Self {
        Self {
            vocals_file: config.vocals_file.clone(),
            backing_file: config.backing_file.clone(),
        }
    }
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self::from(&SeparatorConfig::default())
    }
}

/// Both stems, found in the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedArtifacts {
    pub vocals: PathBuf,
    pub backing: PathBuf,
}

/// Finds the stem directory under `raw_dir`.
///
/// The vocals file is searched recursively and must match exactly once; the
/// backing file must sit next to it.
pub fn locate_artifacts(raw_dir: &Path, names: &ArtifactNames) -> Result<LocatedArtifacts, JobError> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(raw_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == names.vocals_file.as_str())
        .map(|e| e.into_path())
        .collect();
    candidates.sort();

    let vocals = match candidates.len() {
        0 => {
            return Err(JobError::MissingArtifacts {
                dir: raw_dir.to_path_buf(),
                expected: names.vocals_file.clone(),
                found: list_contents(raw_dir),
            })
        }
        1 => candidates.remove(0),
        _ => {
            return Err(JobError::AmbiguousArtifacts {
                file: names.vocals_file.clone(),
                candidates,
            })
        }
    };

    let stem_dir = vocals.parent().unwrap_or(raw_dir).to_path_buf();
    let backing = stem_dir.join(&names.backing_file);
    if !backing.is_file() {
        return Err(JobError::MissingArtifacts {
            expected: format!("{} and {}", names.vocals_file, names.backing_file),
            found: list_contents(&stem_dir),
            dir: stem_dir,
        });
    }

    Ok(LocatedArtifacts { vocals, backing })
}

/// Relative paths of every file under `dir`, sorted.
fn list_contents(dir: &Path) -> Vec<String> {
    let mut found: Vec<String> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap_or(e.path())
                .to_string_lossy()
                .to_string()
        })
        .collect();
    found.sort();
    found
}
