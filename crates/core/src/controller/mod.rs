//! Separation job controller.
//!
//! This module provides the `SeparationController` which owns the lifecycle of
//! a separation run:
//! - Atomically moves the song to `PROCESSING`
//! - Supervises the separator and turns its output into persisted progress
//! - Collects the produced stems into their canonical locations
//! - Commits `READY` with both stem paths, or `FAILED` with the error
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use karaoke_core::controller::{ArtifactNames, SeparationController};
//! use karaoke_core::separator::DemucsSeparator;
//! use karaoke_core::song::SqliteSongStore;
//! use karaoke_core::storage::StorageLayout;
//!
//! let store = Arc::new(SqliteSongStore::new("karaoke.db")?);
//! let controller = SeparationController::new(
//!     store.clone(),
//!     StorageLayout::new("storage"),
//!     Arc::new(DemucsSeparator::with_defaults()),
//!     ArtifactNames::default(),
//! );
//!
//! let response = controller.trigger(&song_id).await?;
//! println!("Song {} is {}", response.id, response.status);
//!
//! // Poll the store for progress
//! let song = store.get(&song_id)?;
//! ```

mod artifacts;
mod error;
mod separation;
mod types;

pub use artifacts::{locate_artifacts, ArtifactNames, LocatedArtifacts};
pub use error::JobError;
pub use separation::SeparationController;
pub use types::{ControllerStatus, TriggerResponse};
