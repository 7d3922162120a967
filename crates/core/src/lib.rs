pub mod config;
pub mod controller;
pub mod metrics;
pub mod progress;
pub mod separator;
pub mod song;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ServerConfig, StorageConfig,
};
pub use controller::{
    ArtifactNames, ControllerStatus, JobError, SeparationController, TriggerResponse,
};
pub use progress::{parse_progress, ProgressTracker};
pub use separator::{DemucsSeparator, Separator, SeparatorConfig, SeparatorError};
pub use song::{
    CreateSongRequest, Song, SongError, SongStatus, SongStore, SongSummary, SqliteSongStore,
    StatusUpdate,
};
pub use storage::{PathError, StorageLayout};
