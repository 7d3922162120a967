use std::sync::Arc;
use karaoke_core::{Config, SeparationController, SongStore, StorageLayout};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn SongStore>,
    storage: StorageLayout,
    controller: Arc<SeparationController>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SongStore>,
        storage: StorageLayout,
        controller: Arc<SeparationController>,
    ) -> Self {
        Self {
            config,
            store,
            storage,
            controller,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn SongStore {
        self.store.as_ref()
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    pub fn controller(&self) -> &SeparationController {
        self.controller.as_ref()
    }
}
