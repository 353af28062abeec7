//! ROI-Based Exposure and Focus Control
//!
//! Regions are held as normalized center-based rectangles and converted to
//! clamped pixel rectangles for the device. While a region is enabled it is
//! re-sent to the camera on a fixed cadence, which keeps the ISP metering
//! on the region across mode changes and reconnects.

use crate::ControlSink;
use camera_pipeline::{CameraCommand, CameraSocket, RegionRect};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Cadence of ROI re-application while enabled
pub const REAPPLY_INTERVAL: Duration = Duration::from_millis(100);

/// ROI settings for one camera, in normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiSettings {
    /// Whether the region is applied
    pub enabled: bool,
    /// Region center X (0.0 to 1.0)
    pub x: f32,
    /// Region center Y (0.0 to 1.0)
    pub y: f32,
    /// Region width (0.1 to 1.0)
    pub width: f32,
    /// Region height (0.1 to 1.0)
    pub height: f32,
    /// Auto-exposure compensation steps (-9 to 9)
    pub exposure_compensation: i8,
    /// Also use the region for autofocus
    pub focus_region: bool,
}

impl Default for RoiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            x: 0.5,
            y: 0.5,
            width: 0.3,
            height: 0.3,
            exposure_compensation: 0,
            focus_region: false,
        }
    }
}

impl RoiSettings {
    /// Convert the center-based normalized region to a pixel rectangle
    /// clamped inside a frame of the given size
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> RegionRect {
        let center_x = (self.x * frame_width as f32) as i64;
        let center_y = (self.y * frame_height as f32) as i64;
        let mut w = ((self.width * frame_width as f32) as i64).min(frame_width as i64);
        let mut h = ((self.height * frame_height as f32) as i64).min(frame_height as i64);

        let mut start_x = center_x - w / 2;
        let mut start_y = center_y - h / 2;

        start_x = start_x.clamp(0, (frame_width as i64 - w).max(0));
        start_y = start_y.clamp(0, (frame_height as i64 - h).max(0));
        w = w.min(frame_width as i64 - start_x);
        h = h.min(frame_height as i64 - start_y);

        RegionRect {
            x: start_x as u32,
            y: start_y as u32,
            width: w.max(1) as u32,
            height: h.max(1) as u32,
        }
    }
}

/// Overlay style for drawn regions
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub visible: bool,
    pub color: Rgb<u8>,
    pub thickness: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color: Rgb([0, 255, 0]),
            thickness: 2,
        }
    }
}

/// Manages ROI-based camera controls for exposure and focus
#[derive(Debug, Default)]
pub struct RoiManager {
    settings: HashMap<CameraSocket, RoiSettings>,
    overlay: OverlayStyle,
}

impl RoiManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize ROI state for newly connected sockets.
    ///
    /// Region control is only driven on CAM_A, the rig's primary camera.
    pub fn initialize_for(&mut self, sockets: &[CameraSocket]) {
        if sockets.contains(&CameraSocket::CamA) {
            self.settings.entry(CameraSocket::CamA).or_default();
        }
    }

    /// ROI settings for a socket
    pub fn get(&self, socket: CameraSocket) -> Option<RoiSettings> {
        self.settings.get(&socket).copied()
    }

    /// Replace ROI settings for a managed socket
    pub fn set(&mut self, socket: CameraSocket, settings: RoiSettings) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            *entry = settings;
        }
    }

    /// Enable or disable the region for a socket
    pub fn enable(&mut self, socket: CameraSocket, enabled: bool) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            entry.enabled = enabled;
            info!("ROI {} for {}", if enabled { "enabled" } else { "disabled" }, socket);
        }
    }

    /// Set the region center (normalized, clamped to 0..=1)
    pub fn set_position(&mut self, socket: CameraSocket, x: f32, y: f32) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            entry.x = x.clamp(0.0, 1.0);
            entry.y = y.clamp(0.0, 1.0);
        }
    }

    /// Set the region size (normalized, clamped to 0.1..=1)
    pub fn set_size(&mut self, socket: CameraSocket, width: f32, height: f32) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            entry.width = width.clamp(0.1, 1.0);
            entry.height = height.clamp(0.1, 1.0);
        }
    }

    /// Set exposure compensation (clamped to -9..=9)
    pub fn set_exposure_compensation(&mut self, socket: CameraSocket, compensation: i8) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            entry.exposure_compensation = compensation.clamp(-9, 9);
        }
    }

    /// Toggle using the region for autofocus as well
    pub fn set_focus_region(&mut self, socket: CameraSocket, enabled: bool) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            entry.focus_region = enabled;
        }
    }

    /// Reset one socket to defaults
    pub fn reset(&mut self, socket: CameraSocket) {
        if let Some(entry) = self.settings.get_mut(&socket) {
            *entry = RoiSettings::default();
        }
    }

    /// Reset every managed socket
    pub fn reset_all(&mut self) {
        for entry in self.settings.values_mut() {
            *entry = RoiSettings::default();
        }
    }

    /// Managed sockets
    pub fn sockets(&self) -> Vec<CameraSocket> {
        self.settings.keys().copied().collect()
    }

    /// Overlay style
    pub fn overlay(&self) -> OverlayStyle {
        self.overlay
    }

    /// Show or hide the drawn overlay
    pub fn set_overlay_visible(&mut self, visible: bool) {
        self.overlay.visible = visible;
    }

    /// Build the control command for an enabled region, for a frame of the
    /// given size; `None` while the region is disabled or unmanaged
    pub fn command_for(
        &self,
        socket: CameraSocket,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<CameraCommand> {
        let roi = self.settings.get(&socket)?;
        if !roi.enabled {
            return None;
        }

        let rect = roi.to_pixel_rect(frame_width, frame_height);
        let mut command = CameraCommand {
            auto_exposure_region: Some(rect),
            ..Default::default()
        };
        if roi.focus_region {
            command.auto_focus_region = Some(rect);
        }
        if roi.exposure_compensation != 0 {
            command.auto_exposure_compensation = Some(roi.exposure_compensation);
        }
        Some(command)
    }

    /// Draw the enabled region onto a frame image
    pub fn draw_overlay(&self, image: &mut RgbImage, socket: CameraSocket) {
        if !self.overlay.visible {
            return;
        }
        let Some(roi) = self.settings.get(&socket) else {
            return;
        };
        if !roi.enabled {
            return;
        }

        let rect = roi.to_pixel_rect(image.width(), image.height());
        for inset in 0..self.overlay.thickness {
            let w = rect.width.saturating_sub(inset * 2);
            let h = rect.height.saturating_sub(inset * 2);
            if w == 0 || h == 0 {
                break;
            }
            draw_hollow_rect_mut(
                image,
                Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(w, h),
                self.overlay.color,
            );
        }

        let center = (
            (rect.x + rect.width / 2) as i32,
            (rect.y + rect.height / 2) as i32,
        );
        draw_filled_circle_mut(image, center, 3, self.overlay.color);
    }
}

/// Spawn the re-application thread.
///
/// Every interval, enabled regions are rebuilt against the stream
/// dimensions of their socket and re-sent through the sink.
pub fn spawn_reapply(
    manager: Arc<Mutex<RoiManager>>,
    sink: Arc<dyn ControlSink>,
    dimensions: HashMap<CameraSocket, (u32, u32)>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    info!("ROI processing started");
    std::thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            for (&socket, &(width, height)) in &dimensions {
                let command = manager
                    .lock()
                    .expect("roi lock")
                    .command_for(socket, width, height);
                if let Some(command) = command {
                    if let Err(e) = sink.send_to(socket, command) {
                        warn!("ROI application error for {}: {}", socket, e);
                    }
                }
            }
            std::thread::sleep(REAPPLY_INTERVAL);
        }
        info!("ROI processing stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_sink::RecordingSink;

    fn managed() -> RoiManager {
        let mut manager = RoiManager::new();
        manager.initialize_for(&[CameraSocket::CamA, CameraSocket::CamB]);
        manager
    }

    #[test]
    fn test_only_cam_a_is_managed() {
        let manager = managed();
        assert!(manager.get(CameraSocket::CamA).is_some());
        assert!(manager.get(CameraSocket::CamB).is_none());
    }

    #[test]
    fn test_centered_default_rect() {
        let roi = RoiSettings::default();
        let rect = roi.to_pixel_rect(1280, 720);
        assert_eq!(rect.width, 384);
        assert_eq!(rect.height, 216);
        assert_eq!(rect.x, 640 - 192);
        assert_eq!(rect.y, 360 - 108);
    }

    #[test]
    fn test_rect_clamped_to_frame() {
        let roi = RoiSettings {
            x: 1.0,
            y: 1.0,
            width: 0.5,
            height: 0.5,
            ..Default::default()
        };
        let rect = roi.to_pixel_rect(1280, 720);
        assert!(rect.x + rect.width <= 1280);
        assert!(rect.y + rect.height <= 720);
    }

    #[test]
    fn test_position_and_size_clamped() {
        let mut manager = managed();
        manager.set_position(CameraSocket::CamA, 3.0, -1.0);
        manager.set_size(CameraSocket::CamA, 0.0, 2.0);
        manager.set_exposure_compensation(CameraSocket::CamA, 100);

        let roi = manager.get(CameraSocket::CamA).unwrap();
        assert_eq!(roi.x, 1.0);
        assert_eq!(roi.y, 0.0);
        assert_eq!(roi.width, 0.1);
        assert_eq!(roi.height, 1.0);
        assert_eq!(roi.exposure_compensation, 9);
    }

    #[test]
    fn test_command_only_when_enabled() {
        let mut manager = managed();
        assert!(manager.command_for(CameraSocket::CamA, 1280, 720).is_none());

        manager.enable(CameraSocket::CamA, true);
        manager.set_focus_region(CameraSocket::CamA, true);
        manager.set_exposure_compensation(CameraSocket::CamA, 3);

        let command = manager.command_for(CameraSocket::CamA, 1280, 720).unwrap();
        assert!(command.auto_exposure_region.is_some());
        assert_eq!(command.auto_focus_region, command.auto_exposure_region);
        assert_eq!(command.auto_exposure_compensation, Some(3));
    }

    #[test]
    fn test_zero_compensation_not_sent() {
        let mut manager = managed();
        manager.enable(CameraSocket::CamA, true);
        let command = manager.command_for(CameraSocket::CamA, 1280, 720).unwrap();
        assert_eq!(command.auto_exposure_compensation, None);
    }

    #[test]
    fn test_overlay_draws_only_enabled() {
        let mut manager = managed();
        let mut image = RgbImage::new(64, 64);
        manager.draw_overlay(&mut image, CameraSocket::CamA);
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));

        manager.enable(CameraSocket::CamA, true);
        manager.draw_overlay(&mut image, CameraSocket::CamA);
        assert!(image.pixels().any(|p| p.0 == [0, 255, 0]));
    }

    #[test]
    fn test_reapply_thread_sends_regions() {
        let mut manager = managed();
        manager.enable(CameraSocket::CamA, true);

        let manager = Arc::new(Mutex::new(manager));
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(AtomicBool::new(false));
        let dims = HashMap::from([(CameraSocket::CamA, (1280u32, 720u32))]);

        let handle = spawn_reapply(manager, sink.clone(), dims, shutdown.clone());
        std::thread::sleep(Duration::from_millis(250));
        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap();

        let sent = sink.sent_to.lock().unwrap();
        assert!(sent.len() >= 2, "expected periodic re-application");
        assert!(sent.iter().all(|(s, _)| *s == CameraSocket::CamA));
    }

    proptest::proptest! {
        #[test]
        fn prop_pixel_rect_stays_in_bounds(
            x in 0.0f32..=1.0,
            y in 0.0f32..=1.0,
            w in 0.1f32..=1.0,
            h in 0.1f32..=1.0,
        ) {
            let roi = RoiSettings { x, y, width: w, height: h, ..Default::default() };
            let rect = roi.to_pixel_rect(1280, 720);
            proptest::prop_assert!(rect.x + rect.width <= 1280);
            proptest::prop_assert!(rect.y + rect.height <= 720);
            proptest::prop_assert!(rect.width >= 1 && rect.height >= 1);
        }
    }
}
