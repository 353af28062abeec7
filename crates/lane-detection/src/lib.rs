//! Lane Detection
//!
//! Classical road-lane detection over rig frames:
//! - Grayscale, Gaussian blur, Canny edges
//! - Road-trapezoid region mask
//! - Hough transform, left/right line classification
//! - Lane polylines sampled along the frame height
//!
//! Runs on the CPU against the live CAM_A stream; no model files required.

pub mod config;
pub mod detector;
pub mod overlay;
pub mod service;
pub mod state;

pub use config::LaneConfig;
pub use detector::LaneDetector;
pub use overlay::draw_lanes;
pub use service::LaneService;
pub use state::{LanePosition, LaneState};

use thiserror::Error;

/// Lane detection error types
#[derive(Error, Debug)]
pub enum LaneError {
    #[error("Invalid frame format")]
    InvalidFrame,

    #[error("Invalid configuration: {0}")]
    Config(String),
}
