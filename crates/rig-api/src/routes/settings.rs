//! Settings and ROI Routes

use crate::app::{ApiError, RoiUpdate, SettingsUpdate, SettingsView};
use crate::AppState;
use axum::{extract::State, Json};
use rig_control::RoiSettings;
use std::collections::HashMap;
use std::sync::Arc;

/// Get current camera settings and auto modes
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsView> {
    let service = state.service.lock().await;
    Json(service.settings_view())
}

/// Apply a partial settings update
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Json<SettingsView> {
    let service = state.service.lock().await;
    Json(service.apply_settings(update))
}

/// Reset camera settings to defaults
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<SettingsView> {
    let service = state.service.lock().await;
    Json(service.reset_settings())
}

/// Get ROI settings for every managed camera
pub async fn get_roi(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, RoiSettings>> {
    let service = state.service.lock().await;
    Json(service.roi_view())
}

/// Apply a partial ROI update
pub async fn put_roi(
    State(state): State<Arc<AppState>>,
    Json(update): Json<RoiUpdate>,
) -> Result<Json<HashMap<String, RoiSettings>>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.apply_roi(update)?))
}

/// Reset every managed ROI to defaults
pub async fn reset_roi(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, RoiSettings>> {
    let service = state.service.lock().await;
    Json(service.reset_roi())
}
