//! Song API handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use karaoke_core::{
    song::new_song_id, CreateSongRequest, JobError, Song, SongStatus, SongSummary,
    TriggerResponse,
};

use crate::metrics::SONGS_UPLOADED_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing songs
#[derive(Debug, Deserialize)]
pub struct ListSongsParams {
    /// Case-insensitive substring of the title or artist
    pub query: Option<String>,
}

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub status: SongStatus,
}

/// Response for progress polling
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub id: String,
    pub status: SongStatus,
    pub progress: u8,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct SongErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<SongErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(SongErrorResponse {
            error: error.into(),
        }),
    )
}

/// Which stem to stream.
#[derive(Debug, Clone, Copy)]
enum Stem {
    Backing,
    Vocals,
}

impl Stem {
    fn label(self) -> &'static str {
        match self {
            Stem::Backing => "backing",
            Stem::Vocals => "vocals",
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Upload a track (multipart fields `file`, `title`, `artist`)
pub async fn upload_song(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut title: Option<String> = None;
    let mut artist: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
                file = Some((filename, bytes.to_vec()));
            }
            "title" | "artist" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
                if name == "title" {
                    title = Some(value);
                } else {
                    artist = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, contents) =
        file.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing field: file"))?;
    let title = title.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing field: title"))?;
    let artist =
        artist.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing field: artist"))?;

    let id = new_song_id();
    let upload_path = state
        .storage()
        .save_upload(&id, &filename, &contents)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let request = CreateSongRequest {
        id: id.clone(),
        title,
        artist,
        filename_original: filename,
    };

    match state.store().create(request) {
        Ok(song) => {
            SONGS_UPLOADED_TOTAL.inc();
            info!(
                song_id = %song.id,
                title = %song.title,
                bytes = contents.len(),
                "Song uploaded"
            );
            Ok((
                StatusCode::CREATED,
                Json(UploadResponse {
                    id: song.id,
                    status: song.status,
                }),
            ))
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&upload_path).await {
                warn!("Failed to remove orphaned upload {:?}: {}", upload_path, remove_err);
            }
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// List songs, newest first
pub async fn list_songs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSongsParams>,
) -> Result<Json<Vec<SongSummary>>, ApiError> {
    let query = params.query.unwrap_or_default();

    state
        .store()
        .list(query.trim())
        .map(|songs| Json(songs.into_iter().map(SongSummary::from).collect()))
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Get a song by ID
pub async fn get_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Song>, ApiError> {
    load_song(&state, &id).map(Json)
}

/// Poll the progress of a song's separation
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let song = load_song(&state, &id)?;

    Ok(Json(ProgressResponse {
        id: song.id,
        status: song.status,
        progress: song.progress,
    }))
}

/// Trigger separation of a song
pub async fn separate_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TriggerResponse>, ApiError> {
    match state.controller().trigger(&id).await {
        Ok(response) => Ok(Json(response)),
        Err(JobError::NotFound(_)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Song not found: {}", id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Stream the instrumental stem
pub async fn stream_backing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    stream_stem(&state, &id, Stem::Backing, request).await
}

/// Stream the vocals stem
pub async fn stream_vocals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    stream_stem(&state, &id, Stem::Vocals, request).await
}

// ============================================================================
// Helpers
// ============================================================================

fn load_song(state: &AppState, id: &str) -> Result<Song, ApiError> {
    match state.store().get(id) {
        Ok(Some(song)) => Ok(song),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Song not found: {}", id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn stream_stem(
    state: &AppState,
    id: &str,
    stem: Stem,
    request: Request,
) -> Result<Response, ApiError> {
    let song = load_song(state, id)?;
    if song.status != SongStatus::Ready {
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("Song is not ready (status: {})", song.status),
        ));
    }

    let path = match stem {
        Stem::Backing => song.backing_path,
        Stem::Vocals => song.vocals_path,
    }
    .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("No {} file recorded", stem.label())))?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("{} file not found", stem.label()),
        ));
    }

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    if let Ok(disposition) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}_{}.wav\"",
        id,
        stem.label()
    )) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response.into_response())
}
