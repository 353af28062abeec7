//! Camera Settings Management
//!
//! Typed settings with the device's accepted ranges. Every setter clamps
//! its input, stores the result and pushes the matching control to the
//! cameras; manual exposure/focus/white-balance values are only sent while
//! the corresponding auto mode is off.

use crate::ControlSink;
use camera_pipeline::{AntiBandingMode, AutoFocusMode, CameraCommand, EffectMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// Setting constraints
pub const EXPOSURE_MIN_US: u32 = 1;
pub const EXPOSURE_MAX_US: u32 = 33_000;
pub const ISO_MIN: u32 = 100;
pub const ISO_MAX: u32 = 1_600;
pub const BRIGHTNESS_MIN: i8 = -10;
pub const BRIGHTNESS_MAX: i8 = 10;
pub const CONTRAST_MIN: i8 = -10;
pub const CONTRAST_MAX: i8 = 10;
pub const SATURATION_MIN: i8 = -10;
pub const SATURATION_MAX: i8 = 10;
pub const SHARPNESS_MAX: u8 = 4;
pub const WB_MIN_K: u32 = 1_000;
pub const WB_MAX_K: u32 = 12_000;
pub const DENOISE_MAX: u8 = 4;

/// Camera settings with device defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigSettings {
    /// Manual exposure time (microseconds)
    pub exposure_us: u32,
    /// Manual ISO sensitivity
    pub iso: u32,
    /// Manual lens position (0-255)
    pub focus: u8,
    pub brightness: i8,
    pub contrast: i8,
    pub saturation: i8,
    pub sharpness: u8,
    /// Manual white balance (Kelvin)
    pub white_balance_k: u32,
    pub luma_denoise: u8,
    pub chroma_denoise: u8,
    /// Stream frame rate
    pub fps: u32,
    pub resolution_width: u32,
    pub resolution_height: u32,
    /// GPS-paced capture interval (meters)
    pub gps_interval_m: f64,
}

impl Default for RigSettings {
    fn default() -> Self {
        Self {
            exposure_us: 20_000,
            iso: 800,
            focus: 130,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            sharpness: 1,
            white_balance_k: 4_000,
            luma_denoise: 1,
            chroma_denoise: 1,
            fps: 30,
            resolution_width: 1280,
            resolution_height: 720,
            gps_interval_m: 1.0,
        }
    }
}

/// Auto-mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoModes {
    pub auto_exposure: bool,
    pub auto_focus: bool,
    pub auto_white_balance: bool,
    pub auto_exposure_lock: bool,
    pub auto_white_balance_lock: bool,
}

impl Default for AutoModes {
    fn default() -> Self {
        Self {
            auto_exposure: true,
            auto_focus: true,
            auto_white_balance: true,
            auto_exposure_lock: false,
            auto_white_balance_lock: false,
        }
    }
}

/// Manages camera settings and the control commands they produce
#[derive(Debug, Default)]
pub struct SettingsManager {
    settings: RigSettings,
    auto: AutoModes,
}

impl SettingsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings
    pub fn settings(&self) -> &RigSettings {
        &self.settings
    }

    /// Current auto-mode flags
    pub fn auto_modes(&self) -> &AutoModes {
        &self.auto
    }

    /// Enable or disable auto exposure
    pub fn set_auto_exposure(&mut self, enabled: bool, sink: &dyn ControlSink) {
        self.auto.auto_exposure = enabled;
        let command = if enabled {
            CameraCommand {
                auto_exposure: Some(true),
                ..Default::default()
            }
        } else {
            CameraCommand {
                manual_exposure: Some((self.settings.exposure_us, self.settings.iso)),
                ..Default::default()
            }
        };
        sink.send_all(command);
    }

    /// Enable or disable continuous autofocus
    pub fn set_auto_focus(&mut self, enabled: bool, sink: &dyn ControlSink) {
        self.auto.auto_focus = enabled;
        let command = if enabled {
            CameraCommand {
                focus_mode: Some(AutoFocusMode::ContinuousVideo),
                ..Default::default()
            }
        } else {
            CameraCommand {
                manual_focus: Some(self.settings.focus),
                ..Default::default()
            }
        };
        sink.send_all(command);
    }

    /// Enable or disable auto white balance
    pub fn set_auto_white_balance(&mut self, enabled: bool, sink: &dyn ControlSink) {
        self.auto.auto_white_balance = enabled;
        let command = if enabled {
            CameraCommand {
                auto_white_balance: Some(true),
                ..Default::default()
            }
        } else {
            CameraCommand {
                manual_white_balance: Some(self.settings.white_balance_k),
                ..Default::default()
            }
        };
        sink.send_all(command);
    }

    /// Run a one-shot autofocus sweep
    pub fn trigger_autofocus(&self, sink: &dyn ControlSink) {
        sink.send_all(CameraCommand {
            focus_mode: Some(AutoFocusMode::Auto),
            autofocus_trigger: true,
            ..Default::default()
        });
    }

    /// Set manual exposure time
    pub fn set_exposure(&mut self, value: u32, sink: &dyn ControlSink) {
        self.settings.exposure_us = value.clamp(EXPOSURE_MIN_US, EXPOSURE_MAX_US);
        if !self.auto.auto_exposure {
            sink.send_all(CameraCommand {
                manual_exposure: Some((self.settings.exposure_us, self.settings.iso)),
                ..Default::default()
            });
        }
    }

    /// Set manual ISO sensitivity
    pub fn set_iso(&mut self, value: u32, sink: &dyn ControlSink) {
        self.settings.iso = value.clamp(ISO_MIN, ISO_MAX);
        if !self.auto.auto_exposure {
            sink.send_all(CameraCommand {
                manual_exposure: Some((self.settings.exposure_us, self.settings.iso)),
                ..Default::default()
            });
        }
    }

    /// Set manual lens position
    pub fn set_focus(&mut self, value: u8, sink: &dyn ControlSink) {
        self.settings.focus = value;
        if !self.auto.auto_focus {
            sink.send_all(CameraCommand {
                manual_focus: Some(self.settings.focus),
                ..Default::default()
            });
        }
    }

    pub fn set_brightness(&mut self, value: i8, sink: &dyn ControlSink) {
        self.settings.brightness = value.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
        sink.send_all(CameraCommand {
            brightness: Some(self.settings.brightness),
            ..Default::default()
        });
    }

    pub fn set_contrast(&mut self, value: i8, sink: &dyn ControlSink) {
        self.settings.contrast = value.clamp(CONTRAST_MIN, CONTRAST_MAX);
        sink.send_all(CameraCommand {
            contrast: Some(self.settings.contrast),
            ..Default::default()
        });
    }

    pub fn set_saturation(&mut self, value: i8, sink: &dyn ControlSink) {
        self.settings.saturation = value.clamp(SATURATION_MIN, SATURATION_MAX);
        sink.send_all(CameraCommand {
            saturation: Some(self.settings.saturation),
            ..Default::default()
        });
    }

    pub fn set_sharpness(&mut self, value: u8, sink: &dyn ControlSink) {
        self.settings.sharpness = value.min(SHARPNESS_MAX);
        sink.send_all(CameraCommand {
            sharpness: Some(self.settings.sharpness),
            ..Default::default()
        });
    }

    /// Set manual white balance temperature
    pub fn set_white_balance(&mut self, value: u32, sink: &dyn ControlSink) {
        self.settings.white_balance_k = value.clamp(WB_MIN_K, WB_MAX_K);
        if !self.auto.auto_white_balance {
            sink.send_all(CameraCommand {
                manual_white_balance: Some(self.settings.white_balance_k),
                ..Default::default()
            });
        }
    }

    pub fn set_luma_denoise(&mut self, value: u8, sink: &dyn ControlSink) {
        self.settings.luma_denoise = value.min(DENOISE_MAX);
        sink.send_all(CameraCommand {
            luma_denoise: Some(self.settings.luma_denoise),
            ..Default::default()
        });
    }

    pub fn set_chroma_denoise(&mut self, value: u8, sink: &dyn ControlSink) {
        self.settings.chroma_denoise = value.min(DENOISE_MAX);
        sink.send_all(CameraCommand {
            chroma_denoise: Some(self.settings.chroma_denoise),
            ..Default::default()
        });
    }

    pub fn set_auto_exposure_lock(&mut self, locked: bool, sink: &dyn ControlSink) {
        self.auto.auto_exposure_lock = locked;
        sink.send_all(CameraCommand {
            auto_exposure_lock: Some(locked),
            ..Default::default()
        });
    }

    pub fn set_auto_white_balance_lock(&mut self, locked: bool, sink: &dyn ControlSink) {
        self.auto.auto_white_balance_lock = locked;
        sink.send_all(CameraCommand {
            auto_white_balance_lock: Some(locked),
            ..Default::default()
        });
    }

    /// Set anti-banding mode by device enumeration index
    pub fn set_anti_banding_mode(&mut self, index: usize, sink: &dyn ControlSink) {
        match AntiBandingMode::ALL.get(index) {
            Some(&mode) => sink.send_all(CameraCommand {
                anti_banding: Some(mode),
                ..Default::default()
            }),
            None => warn!("Anti-banding mode index {} out of range", index),
        }
    }

    /// Set ISP effect mode by device enumeration index
    pub fn set_effect_mode(&mut self, index: usize, sink: &dyn ControlSink) {
        match EffectMode::ALL.get(index) {
            Some(&mode) => sink.send_all(CameraCommand {
                effect: Some(mode),
                ..Default::default()
            }),
            None => warn!("Effect mode index {} out of range", index),
        }
    }

    /// Update stream parameters; applied on the next pipeline rebuild
    pub fn set_stream(&mut self, width: u32, height: u32, fps: u32) {
        self.settings.resolution_width = width;
        self.settings.resolution_height = height;
        self.settings.fps = fps.max(1);
    }

    /// Update the GPS capture interval
    pub fn set_gps_interval(&mut self, interval_m: f64) {
        self.settings.gps_interval_m = interval_m.max(0.0);
    }

    /// Reset camera settings and auto modes to defaults, then re-apply
    pub fn reset_to_defaults(&mut self, sink: &dyn ControlSink) {
        let stream = (
            self.settings.resolution_width,
            self.settings.resolution_height,
            self.settings.fps,
        );
        let gps_interval = self.settings.gps_interval_m;

        self.settings = RigSettings {
            resolution_width: stream.0,
            resolution_height: stream.1,
            fps: stream.2,
            gps_interval_m: gps_interval,
            ..Default::default()
        };
        self.auto = AutoModes::default();

        info!("Camera settings reset to defaults");
        self.apply_all(sink);
    }

    /// Re-apply auto modes, manual image controls and locks
    pub fn apply_all(&mut self, sink: &dyn ControlSink) {
        debug!("Applying camera settings: {:?} {:?}", self.settings, self.auto);

        let auto = self.auto;
        self.set_auto_exposure(auto.auto_exposure, sink);
        self.set_auto_focus(auto.auto_focus, sink);
        self.set_auto_white_balance(auto.auto_white_balance, sink);

        let s = self.settings.clone();
        self.set_brightness(s.brightness, sink);
        self.set_contrast(s.contrast, sink);
        self.set_saturation(s.saturation, sink);
        self.set_sharpness(s.sharpness, sink);
        self.set_luma_denoise(s.luma_denoise, sink);
        self.set_chroma_denoise(s.chroma_denoise, sink);

        self.set_auto_exposure_lock(auto.auto_exposure_lock, sink);
        self.set_auto_white_balance_lock(auto.auto_white_balance_lock, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_sink::RecordingSink;

    #[test]
    fn test_exposure_clamped() {
        let sink = RecordingSink::default();
        let mut manager = SettingsManager::new();

        manager.set_exposure(1_000_000, &sink);
        assert_eq!(manager.settings().exposure_us, EXPOSURE_MAX_US);
        manager.set_exposure(0, &sink);
        assert_eq!(manager.settings().exposure_us, EXPOSURE_MIN_US);
    }

    #[test]
    fn test_manual_exposure_only_sent_when_auto_off() {
        let sink = RecordingSink::default();
        let mut manager = SettingsManager::new();

        // Auto exposure on by default: no manual command
        manager.set_exposure(10_000, &sink);
        assert!(sink.sent_all.lock().unwrap().is_empty());

        manager.set_auto_exposure(false, &sink);
        manager.set_exposure(12_000, &sink);

        let sent = sink.sent_all.lock().unwrap();
        let last = sent.last().unwrap();
        assert_eq!(last.manual_exposure, Some((12_000, 800)));
    }

    #[test]
    fn test_brightness_always_sent() {
        let sink = RecordingSink::default();
        let mut manager = SettingsManager::new();

        manager.set_brightness(42, &sink);
        assert_eq!(manager.settings().brightness, BRIGHTNESS_MAX);
        assert_eq!(
            sink.sent_all.lock().unwrap()[0].brightness,
            Some(BRIGHTNESS_MAX)
        );
    }

    #[test]
    fn test_auto_focus_toggle() {
        let sink = RecordingSink::default();
        let mut manager = SettingsManager::new();

        manager.set_auto_focus(false, &sink);
        assert!(!manager.auto_modes().auto_focus);
        assert_eq!(sink.sent_all.lock().unwrap()[0].manual_focus, Some(130));

        manager.set_auto_focus(true, &sink);
        assert_eq!(
            sink.sent_all.lock().unwrap()[1].focus_mode,
            Some(AutoFocusMode::ContinuousVideo)
        );
    }

    #[test]
    fn test_autofocus_trigger() {
        let sink = RecordingSink::default();
        let manager = SettingsManager::new();
        manager.trigger_autofocus(&sink);

        let sent = sink.sent_all.lock().unwrap();
        assert!(sent[0].autofocus_trigger);
        assert_eq!(sent[0].focus_mode, Some(AutoFocusMode::Auto));
    }

    #[test]
    fn test_out_of_range_mode_index_ignored() {
        let sink = RecordingSink::default();
        let mut manager = SettingsManager::new();
        manager.set_anti_banding_mode(99, &sink);
        manager.set_effect_mode(99, &sink);
        assert!(sink.sent_all.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reset_preserves_stream_and_gps_interval() {
        let sink = RecordingSink::default();
        let mut manager = SettingsManager::new();

        manager.set_stream(1920, 1080, 25);
        manager.set_gps_interval(5.0);
        manager.set_brightness(5, &sink);
        manager.reset_to_defaults(&sink);

        assert_eq!(manager.settings().brightness, 0);
        assert_eq!(manager.settings().resolution_width, 1920);
        assert_eq!(manager.settings().fps, 25);
        assert!((manager.settings().gps_interval_m - 5.0).abs() < f64::EPSILON);
        // apply_all replayed the full control set
        assert!(sink.sent_all.lock().unwrap().len() > 8);
    }

    proptest::proptest! {
        #[test]
        fn prop_settings_stay_in_range(
            exposure in 0u32..100_000,
            iso in 0u32..10_000,
            brightness in i8::MIN..i8::MAX,
            sharpness in 0u8..=255,
        ) {
            let sink = RecordingSink::default();
            let mut manager = SettingsManager::new();
            manager.set_exposure(exposure, &sink);
            manager.set_iso(iso, &sink);
            manager.set_brightness(brightness, &sink);
            manager.set_sharpness(sharpness, &sink);

            let s = manager.settings();
            proptest::prop_assert!((EXPOSURE_MIN_US..=EXPOSURE_MAX_US).contains(&s.exposure_us));
            proptest::prop_assert!((ISO_MIN..=ISO_MAX).contains(&s.iso));
            proptest::prop_assert!((BRIGHTNESS_MIN..=BRIGHTNESS_MAX).contains(&s.brightness));
            proptest::prop_assert!(s.sharpness <= SHARPNESS_MAX);
        }
    }
}
