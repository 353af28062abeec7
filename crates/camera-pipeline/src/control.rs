//! Per-Frame Camera Controls
//!
//! `CameraCommand` mirrors the control message the device consumes on its
//! control queue: every field is optional and only populated fields are
//! applied. Commands are accepted while streaming and take effect on
//! subsequent frames.

use serde::{Deserialize, Serialize};

/// Autofocus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFocusMode {
    /// Manual lens position only
    Off,
    /// Single autofocus sweep on trigger
    Auto,
    /// Continuous autofocus tuned for video
    ContinuousVideo,
    /// Continuous autofocus tuned for stills
    ContinuousPicture,
}

/// Flicker-avoidance mode for artificial lighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiBandingMode {
    Off,
    Mains50Hz,
    Mains60Hz,
    Auto,
}

impl AntiBandingMode {
    /// All modes in device enumeration order
    pub const ALL: [AntiBandingMode; 4] = [
        AntiBandingMode::Off,
        AntiBandingMode::Mains50Hz,
        AntiBandingMode::Mains60Hz,
        AntiBandingMode::Auto,
    ];
}

/// ISP effect mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMode {
    Off,
    Mono,
    Negative,
    Sepia,
    Solarize,
    Posterize,
    Aqua,
}

impl EffectMode {
    /// All modes in device enumeration order
    pub const ALL: [EffectMode; 7] = [
        EffectMode::Off,
        EffectMode::Mono,
        EffectMode::Negative,
        EffectMode::Sepia,
        EffectMode::Solarize,
        EffectMode::Posterize,
        EffectMode::Aqua,
    ];
}

/// Pixel rectangle for AE/AF region controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Control message for one or all cameras.
///
/// Fields left as `None` are not touched on the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraCommand {
    /// Manual exposure: (time in microseconds, ISO)
    pub manual_exposure: Option<(u32, u32)>,
    /// Enable or disable auto exposure
    pub auto_exposure: Option<bool>,
    /// Lock the current auto-exposure state
    pub auto_exposure_lock: Option<bool>,
    /// Region the auto-exposure algorithm should meter
    pub auto_exposure_region: Option<RegionRect>,
    /// Auto-exposure compensation steps (-9 to 9)
    pub auto_exposure_compensation: Option<i8>,
    /// Autofocus mode
    pub focus_mode: Option<AutoFocusMode>,
    /// One-shot autofocus sweep
    pub autofocus_trigger: bool,
    /// Manual lens position (0-255)
    pub manual_focus: Option<u8>,
    /// Region the autofocus algorithm should evaluate
    pub auto_focus_region: Option<RegionRect>,
    /// Enable or disable auto white balance
    pub auto_white_balance: Option<bool>,
    /// Lock the current auto-white-balance state
    pub auto_white_balance_lock: Option<bool>,
    /// Manual white balance color temperature (Kelvin)
    pub manual_white_balance: Option<u32>,
    /// Brightness (-10 to 10)
    pub brightness: Option<i8>,
    /// Contrast (-10 to 10)
    pub contrast: Option<i8>,
    /// Saturation (-10 to 10)
    pub saturation: Option<i8>,
    /// Sharpness (0 to 4)
    pub sharpness: Option<u8>,
    /// Luma denoise level (0 to 4)
    pub luma_denoise: Option<u8>,
    /// Chroma denoise level (0 to 4)
    pub chroma_denoise: Option<u8>,
    /// Anti-banding mode
    pub anti_banding: Option<AntiBandingMode>,
    /// ISP effect mode
    pub effect: Option<EffectMode>,
}

impl CameraCommand {
    /// Whether no field is populated
    pub fn is_empty(&self) -> bool {
        *self == CameraCommand::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(CameraCommand::default().is_empty());
        let cmd = CameraCommand {
            brightness: Some(2),
            ..Default::default()
        };
        assert!(!cmd.is_empty());
    }

    #[test]
    fn test_command_serializes() {
        let cmd = CameraCommand {
            manual_exposure: Some((20000, 800)),
            focus_mode: Some(AutoFocusMode::ContinuousVideo),
            auto_exposure_region: Some(RegionRect {
                x: 100,
                y: 100,
                width: 200,
                height: 200,
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("continuous_video"));
        let back: CameraCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
