//! Configuration for the separator module.

use serde::{Deserialize, Serialize};

/// Configuration for the Demucs-based separator.
///
/// The tool is invoked as
/// `<program> <args...> --two-stems <two_stems> -o <output dir> <input file>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorConfig {
    /// Executable to launch.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the separation flags.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Stem isolated by two-stem mode.
    #[serde(default = "default_two_stems")]
    pub two_stems: String,

    /// File name the tool gives the isolated stem.
    #[serde(default = "default_vocals_file")]
    pub vocals_file: String,

    /// File name the tool gives everything else.
    #[serde(default = "default_backing_file")]
    pub backing_file: String,

    /// Name of the tool's working directory inside each song's output directory.
    #[serde(default = "default_raw_dir_name")]
    pub raw_dir_name: String,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-m".to_string(), "demucs".to_string()]
}

fn default_two_stems() -> String {
    "vocals".to_string()
}

fn default_vocals_file() -> String {
    "vocals.wav".to_string()
}

fn default_backing_file() -> String {
    "no_vocals.wav".to_string()
}

fn default_raw_dir_name() -> String {
    "demucs_raw".to_string()
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            two_stems: default_two_stems(),
            vocals_file: default_vocals_file(),
            backing_file: default_backing_file(),
            raw_dir_name: default_raw_dir_name(),
        }
    }
}

impl SeparatorConfig {
    /// Creates a config launching `program` with the given leading arguments.
    pub fn with_program(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Default::default()
        }
    }

    /// Sets the artifact file names the tool produces.
    pub fn with_artifact_names(
        mut self,
        vocals_file: impl Into<String>,
        backing_file: impl Into<String>,
    ) -> Self {
        self.vocals_file = vocals_file.into();
        self.backing_file = backing_file.into();
        self
    }
}
