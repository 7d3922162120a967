use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use karaoke_core::{
    load_config, validate_config, ArtifactNames, DemucsSeparator, SeparationController,
    Separator, SongStore, SqliteSongStore, StorageLayout,
};
use karaoke_server::api::create_router;
use karaoke_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("KARAOKE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Storage root: {:?}", config.storage.root);

    // Create SQLite song store
    let store: Arc<dyn SongStore> = Arc::new(
        SqliteSongStore::new(&config.database.path).context("Failed to create song store")?,
    );
    info!("Song store initialized");

    // Prepare content storage
    let storage = StorageLayout::new(&config.storage.root)
        .with_raw_dir_name(&config.separator.raw_dir_name);
    storage
        .ensure_dirs()
        .await
        .context("Failed to create storage directories")?;
    info!("Storage directories ready");

    // Create separator; a missing tool only fails the runs, not startup
    let separator = DemucsSeparator::new(config.separator.clone());
    match separator.validate().await {
        Ok(()) => info!("Separator available: {}", config.separator.program),
        Err(e) => warn!("Separator check failed, separation runs will fail: {}", e),
    }

    let controller = Arc::new(SeparationController::new(
        Arc::clone(&store),
        storage.clone(),
        Arc::new(separator),
        ArtifactNames::from(&config.separator),
    ));

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        storage,
        controller,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
