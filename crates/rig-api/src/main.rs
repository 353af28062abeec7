//! RoadScan Rig - Main Entry Point

use rig_api::{init_logging, run_server, AppConfig, AppState, RigService};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== RoadScan Rig v{} ===", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!(
        "Capture directory: {} (camera: {}, gps: {})",
        config.capture_dir.display(),
        if config.mock_camera { "mock" } else { "poe" },
        if config.mock_gps { "mock" } else { "serial" },
    );

    let bind_addr = config.bind_addr.clone();
    let service = RigService::new(config)?;
    let state = Arc::new(AppState::new(service));

    run_server(state, &bind_addr).await?;
    Ok(())
}
