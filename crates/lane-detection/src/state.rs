//! Lane detection state

use serde::{Deserialize, Serialize};

/// Lane position relative to the rig
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanePosition {
    Center,
    Left,
    Right,
    #[default]
    Unknown,
}

/// Lane detection state for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaneState {
    /// Lane lines detected
    pub lanes_detected: bool,

    /// Rig position in the lane
    pub position: LanePosition,

    /// Departing from the lane center
    pub departing: bool,

    /// Left lane polyline, bottom-up [(x, y), ...]
    pub left_lane: Vec<(f32, f32)>,

    /// Right lane polyline, bottom-up
    pub right_lane: Vec<(f32, f32)>,

    /// Offset of the lane center from the frame center, normalized to
    /// half the frame width; positive means the rig sits right of center
    pub center_offset: f32,
}

impl LaneState {
    /// Whether both lane lines were found
    pub fn has_both_lanes(&self) -> bool {
        !self.left_lane.is_empty() && !self.right_lane.is_empty()
    }
}
