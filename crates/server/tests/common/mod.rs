//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock separator injected, enabling E2E testing of the HTTP API
//! without the real separation tool.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use karaoke_core::{
    ArtifactNames, Config, DatabaseConfig, SeparationController, ServerConfig, SongStore,
    SqliteSongStore, StorageConfig, StorageLayout,
    testing::MockSeparator,
};

/// Re-export fixtures for test convenience
pub use karaoke_core::testing::fixtures;

const BOUNDARY: &str = "karaoke-test-boundary";

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with a fully controllable separator.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.upload("song.mp3", b"data", "Title", "Artist").await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock separator - script output, exit code and stems
    pub separator: MockSeparator,
    /// Song store shared with the router
    pub store: Arc<SqliteSongStore>,
    /// Storage layout shared with the router
    pub storage: StorageLayout,
    /// Temporary directory for test database and storage
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response for binary endpoints
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestFixture {
    /// Create a new test fixture with the default mock separator.
    pub async fn new() -> Self {
        Self::with_separator(MockSeparator::new()).await
    }

    /// Create a test fixture around the given mock separator.
    pub async fn with_separator(separator: MockSeparator) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let storage_root = temp_dir.path().join("storage");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
                max_upload_bytes: 1024 * 1024,
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            storage: StorageConfig {
                root: storage_root.clone(),
            },
            separator: Default::default(),
        };

        let store = Arc::new(SqliteSongStore::new(&db_path).expect("Failed to create song store"));
        let storage = StorageLayout::new(&storage_root);
        storage
            .ensure_dirs()
            .await
            .expect("Failed to create storage dirs");

        let controller = Arc::new(SeparationController::new(
            Arc::clone(&store) as Arc<dyn SongStore>,
            storage.clone(),
            Arc::new(separator.clone()),
            ArtifactNames::from(&config.separator),
        ));

        let state = Arc::new(karaoke_server::state::AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn SongStore>,
            storage.clone(),
            controller,
        ));

        let router = karaoke_server::api::create_router(state);

        Self {
            router,
            separator,
            store,
            storage,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, Body::empty(), None).await
    }

    /// Send a POST request with an empty body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, Body::empty(), None).await
    }

    /// Upload a track through the multipart endpoint.
    pub async fn upload(
        &self,
        filename: &str,
        contents: &[u8],
        title: &str,
        artist: &str,
    ) -> TestResponse {
        let body = multipart_body(Some((filename, contents)), Some(title), Some(artist));
        self.post_multipart(body).await
    }

    /// Send a prebuilt multipart body to the upload endpoint.
    pub async fn post_multipart(&self, body: Vec<u8>) -> TestResponse {
        self.request(
            "POST",
            "/api/songs/upload",
            Body::from(body),
            Some(format!("multipart/form-data; boundary={}", BOUNDARY)),
        )
        .await
    }

    /// Upload a track and return its id.
    pub async fn upload_song(&self, title: &str) -> String {
        let response = self.upload("song.mp3", b"ID3 fake audio", title, "Artist").await;
        assert_eq!(response.status, StatusCode::CREATED, "upload failed: {}", response.body);
        response.body["id"]
            .as_str()
            .expect("upload response has an id")
            .to_string()
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            body,
        }
    }

    /// Poll the progress endpoint until the song leaves PROCESSING.
    pub async fn wait_for_terminal(&self, id: &str) -> TestResponse {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let response = self.get(&format!("/api/songs/{}/progress", id)).await;
                if response.body["status"] != "PROCESSING" {
                    return response;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("song did not reach a terminal state")
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Body,
        content_type: Option<String>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            request_builder = request_builder.header("Content-Type", content_type);
        }

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Build a multipart body; `None` leaves the field out.
pub fn multipart_body(
    file: Option<(&str, &[u8])>,
    title: Option<&str>,
    artist: Option<&str>,
) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in [("title", title), ("artist", artist)] {
        if let Some(value) = value {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
    }

    if let Some((filename, contents)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
