//! Hough-Transform Lane Detector

use crate::config::LaneConfig;
use crate::state::{LanePosition, LaneState};
use crate::LaneError;
use camera_pipeline::VideoFrame;
use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use tracing::trace;

/// Frames smaller than this don't carry a usable road view
const MIN_DIMENSION: u32 = 64;

/// A Hough line in point-normal form: x*cos(t) + y*sin(t) = r
#[derive(Debug, Clone, Copy)]
struct RoadLine {
    cos_t: f32,
    sin_t: f32,
    r: f32,
}

impl RoadLine {
    fn from_polar(line: &PolarLine) -> Self {
        let theta = (line.angle_in_degrees as f32).to_radians();
        Self {
            cos_t: theta.cos(),
            sin_t: theta.sin(),
            r: line.r,
        }
    }

    /// Slope dy/dx; infinite for vertical lines
    fn slope(&self) -> f32 {
        if self.sin_t.abs() < 1e-6 {
            f32::INFINITY
        } else {
            -self.cos_t / self.sin_t
        }
    }

    /// X coordinate where the line crosses a scanline; `None` for
    /// horizontal lines
    fn x_at(&self, y: f32) -> Option<f32> {
        if self.cos_t.abs() < 1e-6 {
            return None;
        }
        Some((self.r - y * self.sin_t) / self.cos_t)
    }
}

/// Classical lane detector
pub struct LaneDetector {
    config: LaneConfig,
}

impl LaneDetector {
    pub fn new(config: LaneConfig) -> Result<Self, LaneError> {
        if config.roi_top <= 0.0 || config.roi_top >= 1.0 {
            return Err(LaneError::Config(format!(
                "roi_top must be inside (0, 1), got {}",
                config.roi_top
            )));
        }
        if config.roi_top_left >= config.roi_top_right {
            return Err(LaneError::Config(
                "roi_top_left must be left of roi_top_right".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Detector configuration
    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    /// Update the departure threshold (clamped to 0..=1)
    pub fn set_departure_threshold(&mut self, threshold: f32) {
        self.config.departure_threshold = threshold.clamp(0.0, 1.0);
    }

    /// Detect lane lines in a frame
    pub fn detect(&self, frame: &VideoFrame) -> Result<LaneState, LaneError> {
        let (width, height) = (frame.width, frame.height);
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Ok(LaneState::default());
        }

        let gray = frame.to_grayscale();
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let mut edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        self.mask_road_region(&mut edges);

        let options = LineDetectionOptions {
            vote_threshold: self.config.vote_threshold,
            suppression_radius: self.config.suppression_radius,
        };
        let lines = detect_lines(&edges, options);
        trace!("Hough transform found {} lines", lines.len());

        let (left_lines, right_lines) = self.classify_lines(&lines, width, height);
        let left_lane = self.sample_lane(&left_lines, width, height, Side::Left);
        let right_lane = self.sample_lane(&right_lines, width, height, Side::Right);

        Ok(self.build_state(left_lane, right_lane, width))
    }

    /// Zero edge pixels outside the road trapezoid: bottom corners at the
    /// frame corners, top edge between the configured fractions at
    /// `roi_top` of the height.
    fn mask_road_region(&self, edges: &mut GrayImage) {
        let (width, height) = (edges.width() as f32, edges.height() as f32);
        let top_y = self.config.roi_top * height;
        let band_height = height - top_y;

        for y in 0..edges.height() {
            let yf = y as f32;
            if yf < top_y {
                for x in 0..edges.width() {
                    edges.put_pixel(x, y, image::Luma([0]));
                }
                continue;
            }

            // Fraction of the way from the trapezoid top to the bottom
            let t = (yf - top_y) / band_height;
            let left = self.config.roi_top_left * width * (1.0 - t);
            let right = self.config.roi_top_right * width
                + (width - self.config.roi_top_right * width) * t;

            for x in 0..edges.width() {
                let xf = x as f32;
                if xf < left || xf > right {
                    edges.put_pixel(x, y, image::Luma([0]));
                }
            }
        }
    }

    /// Split lines by the side of the frame they occupy, rejecting
    /// near-horizontal lines
    fn classify_lines(
        &self,
        lines: &[PolarLine],
        width: u32,
        height: u32,
    ) -> (Vec<RoadLine>, Vec<RoadLine>) {
        let mut left = Vec::new();
        let mut right = Vec::new();

        let top_y = self.config.roi_top * height as f32;
        let bottom_y = height as f32;
        let midline = width as f32 / 2.0;

        for polar in lines {
            let line = RoadLine::from_polar(polar);
            if line.slope().abs() <= self.config.min_slope {
                continue;
            }

            // Mean x across the road band decides the side
            let (Some(x_top), Some(x_bottom)) = (line.x_at(top_y), line.x_at(bottom_y))
            else {
                continue;
            };
            let avg_x = (x_top + x_bottom) / 2.0;

            if avg_x < midline {
                left.push(line);
            } else {
                right.push(line);
            }
        }

        (left, right)
    }

    /// Walk scanlines from the bottom of the frame upward, averaging the
    /// crossings of the side's lines into one polyline point per step
    fn sample_lane(
        &self,
        lines: &[RoadLine],
        width: u32,
        height: u32,
        side: Side,
    ) -> Vec<(f32, f32)> {
        if lines.is_empty() {
            return Vec::new();
        }

        let top_y = self.config.roi_top * height as f32;
        let mut points = Vec::new();

        let mut y = height.saturating_sub(self.config.bottom_margin) as f32;
        while y >= top_y {
            let crossings: Vec<f32> = lines
                .iter()
                .filter_map(|l| l.x_at(y))
                .filter(|x| *x >= 0.0 && *x < width as f32)
                .collect();

            if !crossings.is_empty() {
                let avg_x = crossings.iter().sum::<f32>() / crossings.len() as f32;
                let keep = match side {
                    Side::Left => avg_x < width as f32 * 0.6,
                    Side::Right => avg_x > width as f32 * 0.4,
                };
                if keep {
                    points.push((avg_x, y));
                }
            }
            y -= self.config.sample_step as f32;
        }

        if points.len() > self.config.min_points {
            points
        } else {
            Vec::new()
        }
    }

    fn build_state(
        &self,
        left_lane: Vec<(f32, f32)>,
        right_lane: Vec<(f32, f32)>,
        width: u32,
    ) -> LaneState {
        let lanes_detected = !left_lane.is_empty() || !right_lane.is_empty();

        // Position needs both lane lines; polylines are bottom-up, so the
        // first point of each is the nearest road position.
        let (position, departing, center_offset) =
            match (left_lane.first(), right_lane.first()) {
                (Some(&(lx, _)), Some(&(rx, _))) => {
                    let lane_center = (lx + rx) / 2.0;
                    let half_width = width as f32 / 2.0;
                    let offset = (half_width - lane_center) / half_width;

                    let position = if offset.abs() <= self.config.departure_threshold {
                        LanePosition::Center
                    } else if offset > 0.0 {
                        LanePosition::Right
                    } else {
                        LanePosition::Left
                    };
                    let departing = position != LanePosition::Center;
                    (position, departing, offset)
                }
                _ => (LanePosition::Unknown, false, 0.0),
            };

        LaneState {
            lanes_detected,
            position,
            departing,
            left_lane,
            right_lane,
            center_offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_pipeline::CameraSocket;
    use image::RgbImage;
    use imageproc::drawing::draw_line_segment_mut;

    const W: u32 = 1280;
    const H: u32 = 720;

    /// Black road frame with two bright lane markings converging upward
    fn lane_frame(left_shift: f32) -> VideoFrame {
        let mut image = RgbImage::new(W, H);
        let white = image::Rgb([230u8, 230, 230]);

        // Few-pixel-wide markings survive blur and cleanly edge-detect
        for offset in -2..=2 {
            let o = offset as f32;
            draw_line_segment_mut(
                &mut image,
                (200.0 + left_shift + o, H as f32),
                (500.0 + left_shift + o, H as f32 * 0.6),
                white,
            );
            draw_line_segment_mut(
                &mut image,
                (1080.0 + o, H as f32),
                (780.0 + o, H as f32 * 0.6),
                white,
            );
        }
        VideoFrame::from_rgb_image(CameraSocket::CamA, image, 0, 0)
    }

    #[test]
    fn test_detects_both_lanes() {
        let detector = LaneDetector::new(LaneConfig::default()).unwrap();
        let state = detector.detect(&lane_frame(0.0)).unwrap();

        assert!(state.lanes_detected);
        assert!(state.has_both_lanes());
        assert!(state.left_lane.iter().all(|&(x, _)| x < W as f32 * 0.6));
        assert!(state.right_lane.iter().all(|&(x, _)| x > W as f32 * 0.4));

        // Polylines run bottom-up
        let ys: Vec<f32> = state.left_lane.iter().map(|&(_, y)| y).collect();
        assert!(ys.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_centered_lanes_report_center() {
        let detector = LaneDetector::new(LaneConfig::default()).unwrap();
        let state = detector.detect(&lane_frame(0.0)).unwrap();
        assert_eq!(state.position, LanePosition::Center);
        assert!(!state.departing);
        assert!(state.center_offset.abs() < 0.15);
    }

    #[test]
    fn test_blank_frame_has_no_lanes() {
        let detector = LaneDetector::new(LaneConfig::default()).unwrap();
        let image = RgbImage::new(W, H);
        let frame = VideoFrame::from_rgb_image(CameraSocket::CamA, image, 0, 0);
        let state = detector.detect(&frame).unwrap();

        assert!(!state.lanes_detected);
        assert_eq!(state.position, LanePosition::Unknown);
        assert!(state.left_lane.is_empty());
    }

    #[test]
    fn test_tiny_frame_skipped() {
        let detector = LaneDetector::new(LaneConfig::default()).unwrap();
        let frame = VideoFrame::new(CameraSocket::CamA, vec![0; 16 * 16 * 3], 16, 16, 0, 0);
        let state = detector.detect(&frame).unwrap();
        assert!(!state.lanes_detected);
    }

    #[test]
    fn test_horizontal_lines_rejected() {
        let detector = LaneDetector::new(LaneConfig::default()).unwrap();
        let mut image = RgbImage::new(W, H);
        let white = image::Rgb([230u8, 230, 230]);
        for offset in -2..=2 {
            let y = H as f32 * 0.8 + offset as f32;
            draw_line_segment_mut(&mut image, (0.0, y), (W as f32, y), white);
        }
        let frame = VideoFrame::from_rgb_image(CameraSocket::CamA, image, 0, 0);
        let state = detector.detect(&frame).unwrap();
        assert!(!state.lanes_detected);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LaneConfig {
            roi_top: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            LaneDetector::new(config),
            Err(LaneError::Config(_))
        ));

        let config = LaneConfig {
            roi_top_left: 0.7,
            roi_top_right: 0.3,
            ..Default::default()
        };
        assert!(LaneDetector::new(config).is_err());
    }

    #[test]
    fn test_departure_threshold_clamped() {
        let mut detector = LaneDetector::new(LaneConfig::default()).unwrap();
        detector.set_departure_threshold(5.0);
        assert_eq!(detector.config().departure_threshold, 1.0);
        detector.set_departure_threshold(-1.0);
        assert_eq!(detector.config().departure_threshold, 0.0);
    }
}
