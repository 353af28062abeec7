//! Capture Store Implementation

use crate::{ImageFormat, StoreError};
use camera_pipeline::VideoFrame;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What `list_captures` should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Images,
    Videos,
    All,
}

/// Capture file metadata
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size_mb: f64,
    pub modified: DateTime<Local>,
}

/// GPS sidecar payload written next to captures
#[derive(Debug, Serialize)]
struct GpsSidecar<'a, T: Serialize> {
    image_filename: String,
    gps_data: &'a T,
    captured_at: DateTime<Local>,
}

/// Handles file operations for captured images and recordings
pub struct CaptureStore {
    root: PathBuf,
}

impl CaptureStore {
    /// Create a store rooted at `root` (created if missing)
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("Capture directory: {}", root.display());
        Ok(Self { root })
    }

    /// Current capture directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move the store to a new directory (created if missing)
    pub fn set_root(&mut self, root: impl AsRef<Path>) -> Result<(), StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        self.root = root;
        info!("Capture directory changed to {}", self.root.display());
        Ok(())
    }

    /// Millisecond-resolution filename stamp
    pub fn stamp(at: DateTime<Local>) -> String {
        format!(
            "{}_{:03}",
            at.format("%Y%m%d_%H%M%S"),
            at.timestamp_subsec_millis()
        )
    }

    /// Today's date subdirectory, created on demand
    pub fn date_dir(&self, at: DateTime<Local>) -> Result<PathBuf, StoreError> {
        let dir = self.root.join(at.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Save a single frame as `{socket}_{stamp}.{ext}` in the capture root
    /// (or with a custom file stem)
    pub fn capture_image(
        &self,
        frame: &VideoFrame,
        format: ImageFormat,
        custom_stem: Option<&str>,
    ) -> Result<PathBuf, StoreError> {
        let stem = match custom_stem {
            Some(stem) => stem.to_string(),
            None => format!("{}_{}", frame.socket, Self::stamp(Local::now())),
        };
        let path = self.root.join(format!("{}.{}", stem, format.extension()));
        self.write_frame(frame, format, &path)?;
        Ok(path)
    }

    /// Save a set of frames under today's date directory with one shared
    /// timestamp. Per-frame failures are logged and skipped.
    pub fn capture_batch(
        &self,
        frames: &[VideoFrame],
        format: ImageFormat,
    ) -> Result<Vec<PathBuf>, StoreError> {
        let now = Local::now();
        let stamp = Self::stamp(now);
        let dir = self.date_dir(now)?;

        let mut paths = Vec::new();
        for frame in frames {
            let path = dir.join(format!("{}_{}.{}", frame.socket, stamp, format.extension()));
            match self.write_frame(frame, format, &path) {
                Ok(()) => paths.push(path),
                Err(e) => warn!("Batch capture error for {}: {}", frame.socket, e),
            }
        }
        Ok(paths)
    }

    fn write_frame(
        &self,
        frame: &VideoFrame,
        format: ImageFormat,
        path: &Path,
    ) -> Result<(), StoreError> {
        let image = frame.to_rgb_image().ok_or(StoreError::BadFrame)?;
        image.save_with_format(path, format.to_image_format())?;
        Ok(())
    }

    /// Write a GPS JSON sidecar for a captured image under `gps_data/`.
    ///
    /// The sidecar is named `{image_stem}_gps.json` and records the image
    /// it belongs to, the fix and the capture wall-clock time.
    pub fn save_gps_sidecar<T: Serialize>(
        &self,
        image_path: &Path,
        gps_data: &T,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.root.join("gps_data");
        fs::create_dir_all(&dir)?;

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture".to_string());
        let path = dir.join(format!("{}_gps.json", stem));

        let sidecar = GpsSidecar {
            image_filename: image_path.to_string_lossy().into_owned(),
            gps_data,
            captured_at: Local::now(),
        };
        fs::write(&path, serde_json::to_string_pretty(&sidecar)?)?;
        info!("GPS sidecar saved to {}", path.display());
        Ok(path)
    }

    /// Write a standalone GPS capture (no image association)
    pub fn save_gps_capture<T: Serialize>(&self, gps_data: &T) -> Result<PathBuf, StoreError> {
        let path = self
            .root
            .join(format!("gps_only_{}.json", Local::now().format("%Y%m%d_%H%M%S")));

        #[derive(Serialize)]
        struct Payload<'a, T: Serialize> {
            gps_data: &'a T,
            captured_at: DateTime<Local>,
        }
        fs::write(
            &path,
            serde_json::to_string_pretty(&Payload {
                gps_data,
                captured_at: Local::now(),
            })?,
        )?;
        Ok(path)
    }

    /// Free and total disk space of the capture volume, in GB
    pub fn available_space(&self) -> Result<(f64, f64), StoreError> {
        let path = CString::new(self.root.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::statvfs(path.as_ptr(), &mut stats) };
        if ret != 0 {
            return Err(StoreError::Io(std::io::Error::last_os_error()));
        }

        const GB: f64 = 1024.0 * 1024.0 * 1024.0;
        let frsize = stats.f_frsize as f64;
        let free = stats.f_bavail as f64 * frsize / GB;
        let total = stats.f_blocks as f64 * frsize / GB;
        Ok((free, total))
    }

    /// Captured files under the store, newest first.
    ///
    /// Images are matched by extension in the root and date directories;
    /// recordings are the `*_video_*` session directories.
    pub fn list_captures(&self, kind: FileKind) -> Vec<PathBuf> {
        let mut found: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();

        let mut dirs = vec![self.root.clone()];
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.contains("_video_") {
                    if matches!(kind, FileKind::Videos | FileKind::All) {
                        if let Ok(meta) = entry.metadata() {
                            if let Ok(modified) = meta.modified() {
                                found.push((modified, path));
                            }
                        }
                    }
                } else if name != "gps_data" {
                    dirs.push(path);
                }
            }
        }

        if matches!(kind, FileKind::Images | FileKind::All) {
            for dir in dirs {
                let Ok(entries) = fs::read_dir(&dir) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    let is_image = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| ImageFormat::EXTENSIONS.contains(&e))
                        .unwrap_or(false);
                    if !is_image {
                        continue;
                    }
                    if let Ok(meta) = entry.metadata() {
                        if let Ok(modified) = meta.modified() {
                            found.push((modified, path));
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| b.0.cmp(&a.0));
        found.into_iter().map(|(_, path)| path).collect()
    }

    /// Delete a captured file
    pub fn delete(&self, path: &Path) -> Result<(), StoreError> {
        fs::remove_file(path)?;
        Ok(())
    }

    /// Metadata for a captured file
    pub fn file_info(&self, path: &Path) -> Result<FileInfo, StoreError> {
        let meta = fs::metadata(path)?;
        Ok(FileInfo {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_mb: meta.len() as f64 / (1024.0 * 1024.0),
            modified: meta.modified()?.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_pipeline::CameraSocket;

    fn frame(socket: CameraSocket) -> VideoFrame {
        VideoFrame::new(socket, vec![128; 16 * 16 * 3], 16, 16, 0, 0)
    }

    #[test]
    fn test_capture_image_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(tmp.path().join("captures")).unwrap();

        let path = store
            .capture_image(&frame(CameraSocket::CamA), ImageFormat::Png, None)
            .unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("CAM_A_"));
        assert!(name.ends_with(".png"));

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn test_custom_stem() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(tmp.path()).unwrap();
        let path = store
            .capture_image(&frame(CameraSocket::CamA), ImageFormat::Jpeg, Some("calib"))
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "calib.jpg");
    }

    #[test]
    fn test_batch_shares_timestamp_in_date_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(tmp.path()).unwrap();

        let frames = vec![frame(CameraSocket::CamA), frame(CameraSocket::CamB)];
        let paths = store.capture_batch(&frames, ImageFormat::Jpeg).unwrap();
        assert_eq!(paths.len(), 2);

        // Same date directory, same stamp
        assert_eq!(paths[0].parent(), paths[1].parent());
        // Stems look like "CAM_A_20240501_101530_123"; drop the socket prefix
        let stamp = |p: &PathBuf| p.file_stem().unwrap().to_string_lossy()[6..].to_string();
        assert_eq!(stamp(&paths[0]), stamp(&paths[1]));

        let parent_name = paths[0]
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(parent_name, Local::now().format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_gps_sidecar_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(tmp.path()).unwrap();

        let image_path = store
            .capture_image(&frame(CameraSocket::CamA), ImageFormat::Jpeg, None)
            .unwrap();

        #[derive(Serialize)]
        struct Fix {
            latitude: f64,
        }
        let sidecar = store
            .save_gps_sidecar(&image_path, &Fix { latitude: 48.1 })
            .unwrap();

        assert_eq!(sidecar.parent().unwrap().file_name().unwrap(), "gps_data");
        let name = sidecar.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_gps.json"));

        let body: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&sidecar).unwrap()).unwrap();
        assert_eq!(body["gps_data"]["latitude"], 48.1);
        assert!(body["image_filename"]
            .as_str()
            .unwrap()
            .ends_with(image_path.file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_available_space_nonzero() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(tmp.path()).unwrap();
        let (free, total) = store.available_space().unwrap();
        assert!(total > 0.0);
        assert!(free <= total);
    }

    #[test]
    fn test_list_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(tmp.path()).unwrap();

        let single = store
            .capture_image(&frame(CameraSocket::CamA), ImageFormat::Jpeg, None)
            .unwrap();
        store
            .capture_batch(&[frame(CameraSocket::CamB)], ImageFormat::Jpeg)
            .unwrap();

        let images = store.list_captures(FileKind::Images);
        assert_eq!(images.len(), 2);

        store.delete(&single).unwrap();
        assert_eq!(store.list_captures(FileKind::Images).len(), 1);
        assert!(store.delete(&single).is_err());
    }
}
