use super::state::AppState;
use crate::category::Category;
use crate::error::{DeleteFailure, JournalError};
use crate::inventory::Recording;
use crate::session::SessionSnapshot;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: String,
    pub message: String,
    pub recording: Option<Recording>,
}

#[derive(Debug, Serialize)]
pub struct PromptInfo {
    pub category: Category,
    pub title: String,
    pub prompt: String,
    pub recordings: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub category: Category,
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<DeleteFailure>>,
}

/// Maps library errors onto HTTP statuses
pub struct ApiError(JournalError);

impl From<JournalError> for ApiError {
    fn from(e: JournalError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            JournalError::AlreadyRecording { .. } | JournalError::DuplicateId { .. } => {
                StatusCode::CONFLICT
            }
            JournalError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            JournalError::NotFound { .. } => StatusCode::NOT_FOUND,
            JournalError::Capture { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let failures = match &self.0 {
            JournalError::PartialDeleteFailure { failures, .. } => Some(failures.clone()),
            _ => None,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                failures,
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /prompts
/// The three journaling prompts with their recording counts
pub async fn list_prompts(State(state): State<AppState>) -> Result<Json<Vec<PromptInfo>>, ApiError> {
    let mut prompts = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        prompts.push(PromptInfo {
            category,
            title: category.title().to_string(),
            prompt: category.prompt(),
            recordings: state.inventory().count(category).await?,
        });
    }
    Ok(Json(prompts))
}

/// GET /session
/// Poll the recording state
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.sessions.snapshot())
}

/// POST /session/start
/// Start recording an entry
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    info!("Start requested for {}", req.category);
    let snapshot = state.sessions.start(req.category).await?;
    Ok(Json(snapshot))
}

/// POST /session/stop
/// Stop the active recording, if any
pub async fn stop_session(
    State(state): State<AppState>,
) -> Result<Json<StopSessionResponse>, ApiError> {
    let response = match state.sessions.stop().await? {
        Some(recording) => StopSessionResponse {
            status: "stopped".to_string(),
            message: format!(
                "Saved {}s {} recording",
                recording.duration_seconds, recording.category
            ),
            recording: Some(recording),
        },
        None => StopSessionResponse {
            status: "idle".to_string(),
            message: "Nothing was recording".to_string(),
            recording: None,
        },
    };
    Ok(Json(response))
}

/// GET /recordings/:category
pub async fn list_recordings(
    State(state): State<AppState>,
    Path(category): Path<Category>,
) -> Result<Json<Vec<Recording>>, ApiError> {
    Ok(Json(state.inventory().list(category).await?))
}

/// DELETE /recordings/:category
pub async fn clear_recordings(
    State(state): State<AppState>,
    Path(category): Path<Category>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.inventory().clear(category).await?;
    Ok(Json(ClearResponse { category, removed }))
}

/// GET /recording/:id
pub async fn get_recording(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recording>, ApiError> {
    Ok(Json(state.inventory().get(id).await?))
}

/// GET /recording/:id/audio
/// Raw WAV bytes for playback
pub async fn get_recording_audio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let recording = state.inventory().get(id).await?;
    let bytes = tokio::fs::read(&recording.file_path)
        .await
        .map_err(|e| JournalError::Storage {
            path: recording.file_path.clone(),
            source: e,
        })?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}

/// DELETE /recording/:id
pub async fn delete_recording(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recording>, ApiError> {
    Ok(Json(state.inventory().delete(id).await?))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
