use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, songs};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config().server.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        // Config and controller status
        .route("/config", get(handlers::get_config))
        .route("/separation/status", get(handlers::separation_status))
        // Songs
        .route("/songs", get(songs::list_songs))
        .route(
            "/songs/upload",
            post(songs::upload_song).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/songs/{id}", get(songs::get_song))
        .route("/songs/{id}/progress", get(songs::get_progress))
        .route("/songs/{id}/separate", post(songs::separate_song))
        // Stems
        .route("/songs/{id}/backing", get(songs::stream_backing))
        .route("/songs/{id}/vocals", get(songs::stream_vocals));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
