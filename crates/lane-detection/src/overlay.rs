//! Lane overlay rendering

use crate::state::LaneState;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

/// Left lane overlay color
pub const LEFT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Right lane overlay color
pub const RIGHT_COLOR: Rgb<u8> = Rgb([0, 200, 255]);

/// Draw the detected lane polylines onto a frame image
pub fn draw_lanes(image: &mut RgbImage, state: &LaneState) {
    draw_polyline(image, &state.left_lane, LEFT_COLOR);
    draw_polyline(image, &state.right_lane, RIGHT_COLOR);
}

fn draw_polyline(image: &mut RgbImage, points: &[(f32, f32)], color: Rgb<u8>) {
    for pair in points.windows(2) {
        // Thicken by drawing shifted copies
        for offset in -1..=1i32 {
            let o = offset as f32;
            draw_line_segment_mut(
                image,
                (pair[0].0 + o, pair[0].1),
                (pair[1].0 + o, pair[1].1),
                color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_lanes_marks_pixels() {
        let mut image = RgbImage::new(100, 100);
        let state = LaneState {
            lanes_detected: true,
            left_lane: vec![(20.0, 90.0), (30.0, 50.0), (40.0, 10.0)],
            right_lane: vec![(80.0, 90.0), (70.0, 50.0)],
            ..Default::default()
        };
        draw_lanes(&mut image, &state);

        assert!(image.pixels().any(|p| p.0 == [0, 255, 0]));
        assert!(image.pixels().any(|p| p.0 == [0, 200, 255]));
    }

    #[test]
    fn test_empty_state_draws_nothing() {
        let mut image = RgbImage::new(32, 32);
        draw_lanes(&mut image, &LaneState::default());
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
