//! Application Configuration
//!
//! Loaded from `roadscan.toml` (optional) layered over built-in defaults,
//! with `ROADSCAN_*` environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rig service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API listen address
    pub bind_addr: String,

    /// Root directory for captures and recordings
    pub capture_dir: PathBuf,

    /// Use the mock camera link instead of PoE hardware
    pub mock_camera: bool,

    /// Use the canned GPS feed instead of a serial receiver
    pub mock_gps: bool,

    /// Serial port of the GPS receiver; autodetected when unset
    pub gps_port: Option<String>,

    /// GPS baud rate
    pub gps_baud: u32,

    /// Default stream width
    pub stream_width: u32,

    /// Default stream height
    pub stream_height: u32,

    /// Default stream frame rate
    pub stream_fps: u32,

    /// GPS-paced capture interval (meters)
    pub gps_interval_m: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            capture_dir: PathBuf::from("captures"),
            // Without the vendor link compiled in, only the mock camera
            // can stream.
            mock_camera: !cfg!(feature = "poe-device"),
            mock_gps: false,
            gps_port: None,
            gps_baud: nmea_protocol::DEFAULT_BAUD,
            stream_width: 1280,
            stream_height: 720,
            stream_fps: 30,
            gps_interval_m: 1.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment over the defaults
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = AppConfig::default();
        config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name("roadscan").required(false))
            .add_source(config::Environment::with_prefix("ROADSCAN"))
            .build()?
            .try_deserialize()
    }

    /// Stream configuration from the configured defaults
    pub fn stream_config(&self) -> camera_pipeline::StreamConfig {
        camera_pipeline::StreamConfig {
            width: self.stream_width,
            height: self.stream_height,
            fps: self.stream_fps.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.gps_baud, 4800);
        assert_eq!(config.stream_config().width, 1280);
        assert!((config.gps_interval_m - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.bind_addr, AppConfig::default().bind_addr);
    }
}
