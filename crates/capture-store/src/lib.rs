//! Capture Storage
//!
//! File-side of the rig: timestamped image captures with date
//! subdirectories, GPS JSON sidecars, MJPEG recording sessions and disk
//! space accounting.

mod recorder;
mod store;

pub use recorder::{SessionManifest, SessionRecorder};
pub use store::{CaptureStore, FileInfo, FileKind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Frame buffer does not match its dimensions")]
    BadFrame,
}

/// Supported still-image formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Bmp,
    Tiff,
}

impl ImageFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
        }
    }

    /// All supported extensions
    pub const EXTENSIONS: [&'static str; 4] = ["jpg", "png", "bmp", "tiff"];

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}
