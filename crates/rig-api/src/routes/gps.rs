//! GPS Routes

use crate::app::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use gps_monitor::ProbeReport;
use nmea_protocol::GpsFix;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Current fix response
#[derive(Debug, Serialize)]
pub struct FixResponse {
    pub fix: Option<GpsFix>,
    /// Speed in km/h, derived from the fix
    pub speed_kmh: Option<f64>,
    /// Cardinal course direction
    pub course_cardinal: Option<&'static str>,
}

/// Get the current GPS fix (absent when stale or disconnected)
pub async fn current_fix(State(state): State<Arc<AppState>>) -> Json<FixResponse> {
    let service = state.service.lock().await;
    let fix = service.gps_fix();
    Json(FixResponse {
        speed_kmh: fix.as_ref().and_then(|f| f.speed_kmh()),
        course_cardinal: fix.as_ref().and_then(|f| f.course_cardinal()),
        fix,
    })
}

/// GPS capture response
#[derive(Debug, Serialize)]
pub struct GpsCaptureResponse {
    pub message: String,
    pub path: PathBuf,
}

/// Write the current fix to a standalone JSON file
pub async fn capture(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GpsCaptureResponse>, ApiError> {
    let service = state.service.lock().await;
    let path = service.gps_capture()?;
    Ok(Json(GpsCaptureResponse {
        message: "GPS captured".to_string(),
        path,
    }))
}

/// Probe the receiver and report its health
pub async fn probe(State(state): State<Arc<AppState>>) -> Result<Json<ProbeReport>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.gps_probe().await?))
}
