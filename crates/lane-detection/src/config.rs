//! Lane detection configuration

use serde::{Deserialize, Serialize};

/// Lane detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Canny low threshold
    pub canny_low: f32,

    /// Canny high threshold
    pub canny_high: f32,

    /// Gaussian blur sigma applied before edge detection
    pub blur_sigma: f32,

    /// Hough accumulator votes required for a line
    pub vote_threshold: u32,

    /// Suppression radius around accepted Hough peaks
    pub suppression_radius: u32,

    /// Minimum absolute slope for a line to count as a lane edge
    /// (rejects horizontals such as the horizon and gantries)
    pub min_slope: f32,

    /// Minimum sampled points for a lane polyline to be kept
    pub min_points: usize,

    /// Top of the road trapezoid as a fraction of frame height
    pub roi_top: f32,

    /// Left end of the trapezoid's top edge as a fraction of frame width
    pub roi_top_left: f32,

    /// Right end of the trapezoid's top edge as a fraction of frame width
    pub roi_top_right: f32,

    /// Vertical sampling step for lane polylines (pixels)
    pub sample_step: u32,

    /// Margin above the frame bottom where sampling starts (pixels)
    pub bottom_margin: u32,

    /// Normalized lane-center offset beyond which the rig is departing
    pub departure_threshold: f32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            blur_sigma: 1.4,
            vote_threshold: 30,
            suppression_radius: 8,
            min_slope: 0.1,
            min_points: 3,
            roi_top: 0.6,
            roi_top_left: 0.45,
            roi_top_right: 0.55,
            sample_step: 20,
            bottom_margin: 100,
            departure_threshold: 0.15,
        }
    }
}
