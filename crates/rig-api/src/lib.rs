//! RoadScan Rig API Server
//!
//! REST control surface for the camera rig: connection lifecycle,
//! capture and recording, camera settings, ROI control and GPS state.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod app;
pub mod config;
mod routes;

pub use app::{ApiError, RigService};
pub use config::AppConfig;
use capture_store::StoreError;

/// Application state shared across handlers
pub struct AppState {
    /// The rig orchestrator
    pub service: Mutex<RigService>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create application state around a service
    pub fn new(service: RigService) -> Self {
        Self {
            service: Mutex::new(service),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub device: ComponentHealth,
    pub gps: ComponentHealth,
    pub storage: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(routes::rig::status))
        .route("/api/v1/connect", post(routes::rig::connect))
        .route("/api/v1/disconnect", post(routes::rig::disconnect))
        .route("/api/v1/capture", post(routes::rig::capture))
        .route("/api/v1/captures", get(routes::rig::list_captures))
        .route("/api/v1/record/start", post(routes::rig::record_start))
        .route("/api/v1/record/stop", post(routes::rig::record_stop))
        .route(
            "/api/v1/settings",
            get(routes::settings::get_settings).put(routes::settings::put_settings),
        )
        .route("/api/v1/settings/reset", post(routes::settings::reset))
        .route(
            "/api/v1/roi",
            get(routes::settings::get_roi).put(routes::settings::put_roi),
        )
        .route("/api/v1/roi/reset", post(routes::settings::reset_roi))
        .route("/api/v1/gps", get(routes::gps::current_fix))
        .route("/api/v1/gps/capture", post(routes::gps::capture))
        .route("/api/v1/gps/probe", post(routes::gps::probe))
        .route("/api/v1/capture-dir", put(routes::rig::set_capture_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = state.service.lock().await;
    let status = service.status();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let up = |ok: bool| ComponentHealth {
        status: if ok { "ok" } else { "down" }.to_string(),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            device: up(status.connected),
            gps: up(status.gps_fix.is_some()),
            storage: up(status.disk_total_gb > 0.0),
        },
    })
}

/// Error payload for failed requests
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotConnected => StatusCode::CONFLICT,
            ApiError::Store(StoreError::AlreadyRecording | StoreError::NotRecording) => {
                StatusCode::CONFLICT
            }
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server until the listener fails
pub async fn run_server(state: Arc<AppState>, addr: &str) -> Result<(), std::io::Error> {
    let app = create_router(state);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
