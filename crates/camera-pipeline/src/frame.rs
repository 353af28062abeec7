//! Video frame types and processing

use crate::CameraSocket;
use image::{GrayImage, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Source camera socket
    pub socket: CameraSocket,
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (Unix milliseconds)
    pub timestamp_ms: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        socket: CameraSocket,
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ms: u64,
        sequence: u32,
    ) -> Self {
        Self {
            socket,
            data,
            width,
            height,
            timestamp_ms,
            sequence,
        }
    }

    /// Wrap a decoded `RgbImage`
    pub fn from_rgb_image(
        socket: CameraSocket,
        image: RgbImage,
        timestamp_ms: u64,
        sequence: u32,
    ) -> Self {
        let (width, height) = image.dimensions();
        Self {
            socket,
            data: image.into_raw(),
            width,
            height,
            timestamp_ms,
            sequence,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let mut gray = Vec::with_capacity((self.width * self.height) as usize);
        for pixel in self.data.chunks(3) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = (pixel[0] as f32 * 0.299
                + pixel[1] as f32 * 0.587
                + pixel[2] as f32 * 0.114) as u8;
            gray.push(y);
        }
        GrayImage::from_raw(self.width, self.height, gray)
            .expect("buffer sized from dimensions")
    }

    /// View the frame as an `RgbImage` (copies the pixel data)
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            socket: self.socket,
            data: cropped,
            width: w,
            height: h,
            timestamp_ms: self.timestamp_ms,
            sequence: self.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: u32, h: u32, rgb: [u8; 3]) -> VideoFrame {
        let data: Vec<u8> = (0..w * h).flat_map(|_| rgb).collect();
        VideoFrame::new(CameraSocket::CamA, data, w, h, 0, 0)
    }

    #[test]
    fn test_pixel_access() {
        let frame = solid_frame(4, 4, [10, 20, 30]);
        assert_eq!(frame.get_pixel(0, 0), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(3, 3), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 0), None);
    }

    #[test]
    fn test_grayscale_luminance() {
        let frame = solid_frame(2, 2, [255, 0, 0]);
        let gray = frame.to_grayscale();
        // 0.299 * 255 = 76
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
    }

    #[test]
    fn test_crop_bounds() {
        let frame = solid_frame(8, 8, [1, 2, 3]);
        let cropped = frame.crop(2, 2, 4, 4).unwrap();
        assert_eq!(cropped.width, 4);
        assert_eq!(cropped.height, 4);
        assert_eq!(cropped.data.len(), 4 * 4 * 3);
        assert!(frame.crop(6, 6, 4, 4).is_none());
    }

    #[test]
    fn test_rgb_image_round_trip() {
        let frame = solid_frame(3, 2, [9, 8, 7]);
        let image = frame.to_rgb_image().unwrap();
        let back = VideoFrame::from_rgb_image(CameraSocket::CamA, image, 0, 0);
        assert_eq!(back.data, frame.data);
    }
}
