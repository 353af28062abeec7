//! Camera Pipeline for the RoadScan Rig
//!
//! Operates a multi-camera OAK PoE device:
//! - Device discovery and connection
//! - Per-socket stream configuration and frame queues
//! - Per-frame camera controls (exposure, focus, white balance, regions)
//!
//! The vendor SDK is bound behind the `poe-device` feature; the default
//! build runs against a deterministic mock link for development and tests.

pub mod control;
pub mod device;
#[cfg(feature = "poe-device")]
pub mod ffi;
pub mod frame;
pub mod link;
pub mod pipeline;

pub use control::{AntiBandingMode, AutoFocusMode, CameraCommand, EffectMode, RegionRect};
pub use device::{DeviceInfo, RigDevice};
pub use frame::VideoFrame;
pub use link::{DeviceLink, DeviceRecord, MockLink, SharedLink};
pub use pipeline::RigPipeline;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open device: {0}")]
    Open(String),

    #[error("No cameras found on the device")]
    NoCameras,

    #[error("Device is not connected")]
    NotConnected,

    #[error("Unknown camera socket: {0}")]
    UnknownSocket(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Control queue closed for {0}")]
    ControlQueueClosed(CameraSocket),

    #[error("Capture timeout")]
    Timeout,
}

/// Camera board socket on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraSocket {
    CamA,
    CamB,
    CamC,
    CamD,
}

impl CameraSocket {
    /// All board sockets in enumeration order
    pub const ALL: [CameraSocket; 4] = [
        CameraSocket::CamA,
        CameraSocket::CamB,
        CameraSocket::CamC,
        CameraSocket::CamD,
    ];

    /// Board socket name as the device reports it
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraSocket::CamA => "CAM_A",
            CameraSocket::CamB => "CAM_B",
            CameraSocket::CamC => "CAM_C",
            CameraSocket::CamD => "CAM_D",
        }
    }
}

impl std::fmt::Display for CameraSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CameraSocket {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAM_A" => Ok(CameraSocket::CamA),
            "CAM_B" => Ok(CameraSocket::CamB),
            "CAM_C" => Ok(CameraSocket::CamC),
            "CAM_D" => Ok(CameraSocket::CamD),
            other => Err(CameraError::UnknownSocket(other.to_string())),
        }
    }
}

/// Stream configuration for a camera socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::preview()
    }
}

impl StreamConfig {
    /// Preview stream (1280x720 @ 30fps)
    pub fn preview() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
        }
    }

    /// Full-resolution stream (1920x1080 @ 30fps)
    pub fn full_resolution() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_socket_name_round_trip() {
        for socket in CameraSocket::ALL {
            assert_eq!(CameraSocket::from_str(socket.as_str()).unwrap(), socket);
        }
    }

    #[test]
    fn test_unknown_socket_rejected() {
        assert!(matches!(
            CameraSocket::from_str("CAM_E"),
            Err(CameraError::UnknownSocket(_))
        ));
    }
}
