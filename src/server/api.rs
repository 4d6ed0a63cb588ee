//! HTTP API handlers for the viewer server
//!
//! Handlers are stateless: each one translates a request into registry
//! calls and renders JSON, a raw file, or the live-reload stream. Errors are
//! answered with a status code and a short plain-text body.

use std::convert::Infallible;
use std::path::{Path as FsPath, PathBuf};

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{
        sse::{self, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::paths;

use super::assets;
use super::events::Event;
use super::registry::{FileEntry, FileId, Group, RegistryError, DEFAULT_GROUP};
use super::server::AppState;

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Body of `POST /_/api/files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFileRequest {
    pub path: String,
    #[serde(default)]
    pub group: String,
}

/// Body of `POST /_/api/files/open`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFileRequest {
    pub file_id: FileId,
    pub path: String,
}

/// Response of `GET /_/api/files/{id}/content`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    pub base_dir: String,
}

// ============================================================================
// API Errors
// ============================================================================

/// Per-request failures; none of them affect the server
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidBody(String),

    #[error("invalid file id")]
    InvalidId,

    #[error("{0}")]
    BadRequest(String),

    /// Path given to `POST /_/api/files` does not exist
    #[error("file not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("file not found")]
    FileNotFound,

    #[error("source file not found")]
    SourceNotFound,

    /// Relative link target does not exist
    #[error("file not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("access denied")]
    AccessDenied,

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) | Self::InvalidId | Self::BadRequest(_) | Self::PathNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::FileNotFound | Self::SourceNotFound | Self::TargetNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router; unmatched GET paths fall through to the bundled app
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_/api/files", post(add_file))
        .route("/_/api/groups", get(list_groups))
        .route("/_/api/files/open", post(open_file))
        .route("/_/api/files/{id}/content", get(file_content))
        .route("/_/api/files/{id}/raw/{*path}", get(file_raw))
        .route("/_/events", get(events))
        .fallback(get(assets::serve_spa))
        .with_state(state)
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

async fn lookup(state: &AppState, id: &str) -> Result<FileEntry, ApiError> {
    let id: FileId = id.parse().map_err(|_| ApiError::InvalidId)?;
    state.registry.find_file(id).await.ok_or(ApiError::FileNotFound)
}

async fn exists(path: &FsPath) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

// ============================================================================
// File Handlers
// ============================================================================

/// Register a file in a group
async fn add_file(State(state): State<AppState>, body: Bytes) -> Result<Json<FileEntry>, ApiError> {
    let request: AddFileRequest = parse_body(&body)?;

    let path = paths::absolutize(&request.path).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !exists(&path).await {
        return Err(ApiError::PathNotFound(path));
    }

    let entry = state.registry.add_file(&path, &request.group).await?;
    Ok(Json(entry))
}

/// List all groups and their files
async fn list_groups(State(state): State<AppState>) -> Json<Vec<Group>> {
    Json(state.registry.groups().await)
}

/// Read the current content of a tracked file
async fn file_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileContent>, ApiError> {
    let entry = lookup(&state, &id).await?;

    let bytes = tokio::fs::read(&entry.path).await.map_err(|e| {
        tracing::error!(id = entry.id, path = %entry.path.display(), error = %e, "failed to read file");
        ApiError::Io(e)
    })?;

    Ok(Json(FileContent {
        content: String::from_utf8_lossy(&bytes).into_owned(),
        base_dir: entry.base_dir().to_string_lossy().into_owned(),
    }))
}

/// Serve an asset that sits next to a tracked file
async fn file_raw(
    State(state): State<AppState>,
    Path((id, relative)): Path<(String, String)>,
    request: Request,
) -> Result<Response, ApiError> {
    let entry = lookup(&state, &id).await?;

    let target = paths::join_within(&entry.base_dir(), FsPath::new(&relative))
        .ok_or(ApiError::AccessDenied)?;

    match ServeFile::new(&target).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new)),
        Err(never) => match never {},
    }
}

/// Resolve a relative link from an open file into a tracked file in the
/// same group
async fn open_file(State(state): State<AppState>, body: Bytes) -> Result<Json<FileEntry>, ApiError> {
    let request: OpenFileRequest = parse_body(&body)?;

    let source = state
        .registry
        .find_file(request.file_id)
        .await
        .ok_or(ApiError::SourceNotFound)?;

    let target = paths::join_within(&source.base_dir(), FsPath::new(&request.path))
        .ok_or(ApiError::AccessDenied)?;
    if !exists(&target).await {
        return Err(ApiError::TargetNotFound(target));
    }

    let group = state
        .registry
        .find_group_for_file(request.file_id)
        .await
        .unwrap_or_else(|| DEFAULT_GROUP.to_string());

    let entry = state.registry.add_file(&target, &group).await?;
    Ok(Json(entry))
}

// ============================================================================
// Live-reload Stream
// ============================================================================

impl From<Event> for sse::Event {
    fn from(event: Event) -> Self {
        sse::Event::default().event(event.name()).data(event.data())
    }
}

/// Open a live-reload stream. It ends when the client disconnects or the
/// registry closes the sink at shutdown.
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    let subscription = state.registry.subscription().await;
    tracing::debug!(sink = subscription.id(), "live-reload stream opened");

    Sse::new(subscription.map(|event| Ok::<_, Infallible>(sse::Event::from(event))))
        .keep_alive(KeepAlive::new().interval(state.config.keep_alive()))
}

// ============================================================================
// Tests
// ============================================================================
