//! Recording Sessions
//!
//! Recording writes per-camera MJPEG frame sequences: each session is a
//! `{socket}_video_{stamp}/` directory of sequentially numbered JPEG
//! frames plus a `manifest.json` describing the stream. Sequences play
//! back with standard tooling and survive power loss mid-recording.

use crate::{ImageFormat, StoreError};
use camera_pipeline::{CameraSocket, VideoFrame};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Session manifest, written at start and finalized at stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Session identifier
    pub id: Uuid,
    /// Source camera socket
    pub socket: CameraSocket,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Nominal frame rate
    pub fps: u32,
    /// Frame codec
    pub codec: String,
    /// Recording start time
    pub started_at: DateTime<Local>,
    /// Recording end time, absent while recording
    pub ended_at: Option<DateTime<Local>>,
    /// Frames written
    pub frame_count: u32,
}

struct Session {
    dir: PathBuf,
    manifest: SessionManifest,
}

/// Per-camera recording session manager
pub struct SessionRecorder {
    root: PathBuf,
    sessions: HashMap<CameraSocket, Session>,
    started_at: Option<DateTime<Local>>,
}

impl SessionRecorder {
    /// Create a recorder writing sessions under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            sessions: HashMap::new(),
            started_at: None,
        }
    }

    /// Start one session per camera.
    ///
    /// Fails without touching disk when a recording is already running;
    /// if any session directory cannot be created, already-created ones
    /// are rolled back.
    pub fn start(
        &mut self,
        cameras: &[(CameraSocket, u32, u32)],
        fps: u32,
    ) -> Result<(), StoreError> {
        if self.is_recording() {
            return Err(StoreError::AlreadyRecording);
        }

        let now = Local::now();
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let mut created: Vec<PathBuf> = Vec::new();

        for &(socket, width, height) in cameras {
            let dir = self.root.join(format!("{}_video_{}", socket, stamp));
            if let Err(e) = fs::create_dir_all(&dir) {
                for dir in created {
                    let _ = fs::remove_dir_all(dir);
                }
                self.sessions.clear();
                return Err(e.into());
            }
            created.push(dir.clone());

            let manifest = SessionManifest {
                id: Uuid::new_v4(),
                socket,
                width,
                height,
                fps,
                codec: "mjpeg".to_string(),
                started_at: now,
                ended_at: None,
                frame_count: 0,
            };
            write_manifest(&dir, &manifest)?;
            self.sessions.insert(socket, Session { dir, manifest });
        }

        self.started_at = Some(now);
        info!("Recording started for {} cameras", self.sessions.len());
        Ok(())
    }

    /// Append a frame to its camera's session.
    ///
    /// Returns `Ok(false)` when not recording or when the frame's socket
    /// has no session, mirroring streams that keep running while the
    /// recorder is idle.
    pub fn write_frame(&mut self, frame: &VideoFrame) -> Result<bool, StoreError> {
        let Some(session) = self.sessions.get_mut(&frame.socket) else {
            return Ok(false);
        };

        let image = frame.to_rgb_image().ok_or(StoreError::BadFrame)?;
        let path = session
            .dir
            .join(format!("frame_{:06}.jpg", session.manifest.frame_count));
        image.save_with_format(&path, ImageFormat::Jpeg.to_image_format())?;
        session.manifest.frame_count += 1;
        Ok(true)
    }

    /// Stop recording, finalize every manifest and return the session
    /// directories
    pub fn stop(&mut self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.is_recording() {
            return Err(StoreError::NotRecording);
        }

        let ended = Local::now();
        let mut dirs = Vec::new();
        for session in self.sessions.values_mut() {
            session.manifest.ended_at = Some(ended);
            if let Err(e) = write_manifest(&session.dir, &session.manifest) {
                warn!(
                    "Manifest finalize error for {}: {}",
                    session.dir.display(),
                    e
                );
            }
            dirs.push(session.dir.clone());
        }

        let duration = self.duration().unwrap_or_default();
        info!("Recording stopped after {:.1}s", duration.as_secs_f64());

        self.sessions.clear();
        self.started_at = None;
        dirs.sort();
        Ok(dirs)
    }

    /// Retarget future sessions at a new root directory
    pub fn set_root(&mut self, root: impl AsRef<Path>) -> Result<(), StoreError> {
        if self.is_recording() {
            return Err(StoreError::AlreadyRecording);
        }
        self.root = root.as_ref().to_path_buf();
        Ok(())
    }

    /// Whether a recording is running
    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    /// Elapsed recording time
    pub fn duration(&self) -> Option<std::time::Duration> {
        self.started_at
            .map(|start| (Local::now() - start).to_std().unwrap_or_default())
    }

    /// Manifest snapshot for a recording camera
    pub fn manifest(&self, socket: CameraSocket) -> Option<SessionManifest> {
        self.sessions.get(&socket).map(|s| s.manifest.clone())
    }
}

fn write_manifest(dir: &Path, manifest: &SessionManifest) -> Result<(), StoreError> {
    fs::write(
        dir.join("manifest.json"),
        serde_json::to_string_pretty(manifest)?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(socket: CameraSocket) -> VideoFrame {
        VideoFrame::new(socket, vec![64; 8 * 8 * 3], 8, 8, 0, 0)
    }

    #[test]
    fn test_record_write_stop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(tmp.path());

        recorder
            .start(
                &[
                    (CameraSocket::CamA, 8, 8),
                    (CameraSocket::CamB, 8, 8),
                ],
                30,
            )
            .unwrap();
        assert!(recorder.is_recording());

        assert!(recorder.write_frame(&frame(CameraSocket::CamA)).unwrap());
        assert!(recorder.write_frame(&frame(CameraSocket::CamA)).unwrap());
        assert!(recorder.write_frame(&frame(CameraSocket::CamB)).unwrap());
        // No session for CAM_C
        assert!(!recorder.write_frame(&frame(CameraSocket::CamC)).unwrap());

        let dirs = recorder.stop().unwrap();
        assert_eq!(dirs.len(), 2);
        assert!(!recorder.is_recording());

        let cam_a = dirs
            .iter()
            .find(|d| d.file_name().unwrap().to_string_lossy().starts_with("CAM_A"))
            .unwrap();
        assert!(cam_a.join("frame_000000.jpg").exists());
        assert!(cam_a.join("frame_000001.jpg").exists());

        let manifest: SessionManifest =
            serde_json::from_str(&fs::read_to_string(cam_a.join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.frame_count, 2);
        assert_eq!(manifest.codec, "mjpeg");
        assert!(manifest.ended_at.is_some());
    }

    #[test]
    fn test_double_start_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(tmp.path());
        recorder.start(&[(CameraSocket::CamA, 8, 8)], 30).unwrap();
        assert!(matches!(
            recorder.start(&[(CameraSocket::CamA, 8, 8)], 30),
            Err(StoreError::AlreadyRecording)
        ));
    }

    #[test]
    fn test_stop_without_start_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(tmp.path());
        assert!(matches!(recorder.stop(), Err(StoreError::NotRecording)));
    }

    #[test]
    fn test_write_while_idle_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(tmp.path());
        assert!(!recorder.write_frame(&frame(CameraSocket::CamA)).unwrap());
    }

    #[test]
    fn test_duration_advances() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::new(tmp.path());
        assert!(recorder.duration().is_none());

        recorder.start(&[(CameraSocket::CamA, 8, 8)], 30).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(recorder.duration().unwrap().as_millis() >= 30);
        recorder.stop().unwrap();
    }
}
