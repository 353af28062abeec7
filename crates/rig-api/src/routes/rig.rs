//! Rig Lifecycle, Capture and Recording Routes

use crate::app::{ApiError, CaptureReport, ConnectReport, RigStatus};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use capture_store::FileKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Get the full rig status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<RigStatus> {
    let service = state.service.lock().await;
    Json(service.status())
}

/// Connect the device and start streaming
pub async fn connect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectReport>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.connect()?))
}

/// Message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Disconnect the device
pub async fn disconnect(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    let mut service = state.service.lock().await;
    service.disconnect();
    Json(MessageResponse {
        message: "Disconnected".to_string(),
    })
}

/// Capture one image per camera
pub async fn capture(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CaptureReport>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.capture_all()?))
}

/// Query parameters for the captures listing
#[derive(Debug, Deserialize)]
pub struct CapturesQuery {
    /// "images", "videos" or "all"
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "all".to_string()
}

/// Captures listing response
#[derive(Debug, Serialize)]
pub struct CapturesResponse {
    pub files: Vec<PathBuf>,
    pub count: usize,
}

/// List captured files, newest first
pub async fn list_captures(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CapturesQuery>,
) -> Json<CapturesResponse> {
    let kind = match params.kind.as_str() {
        "images" => FileKind::Images,
        "videos" => FileKind::Videos,
        _ => FileKind::All,
    };
    let service = state.service.lock().await;
    let files = service.list_captures(kind);
    Json(CapturesResponse {
        count: files.len(),
        files,
    })
}

/// Start video recording on every camera
pub async fn record_start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let service = state.service.lock().await;
    service.start_recording()?;
    Ok(Json(MessageResponse {
        message: "Recording started".to_string(),
    }))
}

/// Recording stop response
#[derive(Debug, Serialize)]
pub struct RecordStopResponse {
    pub message: String,
    pub sessions: Vec<PathBuf>,
}

/// Stop video recording
pub async fn record_stop(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecordStopResponse>, ApiError> {
    let service = state.service.lock().await;
    let sessions = service.stop_recording()?;
    Ok(Json(RecordStopResponse {
        message: "Recording stopped".to_string(),
        sessions,
    }))
}

/// Capture directory change request
#[derive(Debug, Deserialize)]
pub struct CaptureDirRequest {
    pub path: PathBuf,
}

/// Change the capture directory
pub async fn set_capture_dir(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CaptureDirRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let service = state.service.lock().await;
    service.set_capture_dir(request.path)?;
    Ok(Json(MessageResponse {
        message: "Save directory updated".to_string(),
    }))
}
