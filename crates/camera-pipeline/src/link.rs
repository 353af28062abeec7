//! Device Link Seam
//!
//! `DeviceLink` is the boundary between the pipeline and the physical
//! transport. The PoE implementation (feature `poe-device`) binds the vendor
//! SDK; `MockLink` produces deterministic synthetic frames and journals
//! every control it receives, which is what tests and plain builds run on.

use crate::control::CameraCommand;
use crate::frame::VideoFrame;
use crate::{CameraError, CameraSocket, StreamConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// A discovered device on the network
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRecord {
    /// Device serial (MxID)
    pub mxid: String,
    /// IP address the device answered from
    pub address: String,
    /// Device platform name
    pub platform: String,
}

/// Transport seam between the pipeline and a physical device
pub trait DeviceLink: Send {
    /// Discover reachable devices
    fn discover(&mut self) -> Result<Vec<DeviceRecord>, CameraError>;

    /// Open a session with a discovered device
    fn open(&mut self, record: &DeviceRecord) -> Result<(), CameraError>;

    /// Close the session
    fn close(&mut self);

    /// Camera sockets populated on the open device
    fn connected_sockets(&self) -> Result<Vec<CameraSocket>, CameraError>;

    /// Set IR laser dot-projector intensity; `Ok(false)` means the device
    /// has no projector
    fn set_ir_laser_intensity(&mut self, intensity: f32) -> Result<bool, CameraError>;

    /// Configure the stream for one socket (applied on stream start)
    fn configure_stream(
        &mut self,
        socket: CameraSocket,
        config: &StreamConfig,
    ) -> Result<(), CameraError>;

    /// Start streaming on all configured sockets
    fn start_streams(&mut self) -> Result<(), CameraError>;

    /// Stop streaming
    fn stop_streams(&mut self);

    /// Poll the next frame for a socket; `None` when no frame is pending
    fn poll_frame(&mut self, socket: CameraSocket) -> Result<Option<VideoFrame>, CameraError>;

    /// Deliver a control message to one socket
    fn send_control(
        &mut self,
        socket: CameraSocket,
        command: &CameraCommand,
    ) -> Result<(), CameraError>;

    /// Device product name
    fn device_name(&self) -> String;
}

/// Shared handle to a boxed link, cloneable across poll threads
pub type SharedLink = Arc<Mutex<Box<dyn DeviceLink>>>;

/// Journal of controls delivered to a mock link
pub type ControlJournal = Arc<Mutex<Vec<(CameraSocket, CameraCommand)>>>;

/// Deterministic in-memory device link
pub struct MockLink {
    sockets: Vec<CameraSocket>,
    streams: HashMap<CameraSocket, StreamConfig>,
    sequences: HashMap<CameraSocket, u32>,
    journal: ControlJournal,
    open: bool,
    streaming: bool,
    has_ir_projector: bool,
}

impl MockLink {
    /// Mock device with CAM_A and CAM_B populated
    pub fn new() -> Self {
        Self::with_sockets(vec![CameraSocket::CamA, CameraSocket::CamB])
    }

    /// Mock device with a specific socket population
    pub fn with_sockets(sockets: Vec<CameraSocket>) -> Self {
        Self {
            sockets,
            streams: HashMap::new(),
            sequences: HashMap::new(),
            journal: Arc::new(Mutex::new(Vec::new())),
            open: false,
            streaming: false,
            has_ir_projector: false,
        }
    }

    /// Handle to the control journal, for assertions
    pub fn journal(&self) -> ControlJournal {
        self.journal.clone()
    }

    /// Synthetic RGB gradient that moves with the sequence number, so
    /// consecutive frames differ and per-socket streams are telling apart.
    fn synthesize(socket: CameraSocket, config: &StreamConfig, sequence: u32) -> VideoFrame {
        let (w, h) = (config.width, config.height);
        let socket_tint = (socket as u32 * 60) as u8;
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.push(((x + sequence) % 256) as u8);
                data.push((y % 256) as u8);
                data.push(socket_tint);
            }
        }
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        VideoFrame::new(socket, data, w, h, timestamp_ms, sequence)
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLink for MockLink {
    fn discover(&mut self) -> Result<Vec<DeviceRecord>, CameraError> {
        Ok(vec![DeviceRecord {
            mxid: "14442C10D13EABCE00".to_string(),
            address: "169.254.1.222".to_string(),
            platform: "RVC2".to_string(),
        }])
    }

    fn open(&mut self, record: &DeviceRecord) -> Result<(), CameraError> {
        debug!("Mock link opened for {}", record.mxid);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.streaming = false;
        self.streams.clear();
        self.sequences.clear();
    }

    fn connected_sockets(&self) -> Result<Vec<CameraSocket>, CameraError> {
        if !self.open {
            return Err(CameraError::NotConnected);
        }
        Ok(self.sockets.clone())
    }

    fn set_ir_laser_intensity(&mut self, _intensity: f32) -> Result<bool, CameraError> {
        Ok(self.has_ir_projector)
    }

    fn configure_stream(
        &mut self,
        socket: CameraSocket,
        config: &StreamConfig,
    ) -> Result<(), CameraError> {
        if !self.sockets.contains(&socket) {
            return Err(CameraError::UnknownSocket(socket.to_string()));
        }
        self.streams.insert(socket, *config);
        Ok(())
    }

    fn start_streams(&mut self) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::NotConnected);
        }
        if self.streams.is_empty() {
            return Err(CameraError::Pipeline("no streams configured".to_string()));
        }
        self.streaming = true;
        Ok(())
    }

    fn stop_streams(&mut self) {
        self.streaming = false;
    }

    fn poll_frame(&mut self, socket: CameraSocket) -> Result<Option<VideoFrame>, CameraError> {
        if !self.streaming {
            return Ok(None);
        }
        let Some(config) = self.streams.get(&socket).copied() else {
            return Ok(None);
        };
        let sequence = self.sequences.entry(socket).or_insert(0);
        let frame = Self::synthesize(socket, &config, *sequence);
        *sequence = sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn send_control(
        &mut self,
        socket: CameraSocket,
        command: &CameraCommand,
    ) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::NotConnected);
        }
        self.journal
            .lock()
            .expect("journal lock")
            .push((socket, command.clone()));
        Ok(())
    }

    fn device_name(&self) -> String {
        "OAK-MOCK-POE".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_discovery_and_open() {
        let mut link = MockLink::new();
        let records = link.discover().unwrap();
        assert_eq!(records.len(), 1);

        assert!(matches!(
            link.connected_sockets(),
            Err(CameraError::NotConnected)
        ));
        link.open(&records[0]).unwrap();
        assert_eq!(link.connected_sockets().unwrap().len(), 2);
    }

    #[test]
    fn test_mock_frames_advance() {
        let mut link = MockLink::new();
        let records = link.discover().unwrap();
        link.open(&records[0]).unwrap();
        link.configure_stream(CameraSocket::CamA, &StreamConfig::preview())
            .unwrap();
        link.start_streams().unwrap();

        let first = link.poll_frame(CameraSocket::CamA).unwrap().unwrap();
        let second = link.poll_frame(CameraSocket::CamA).unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_ne!(first.data, second.data);

        // Unconfigured socket yields nothing
        assert!(link.poll_frame(CameraSocket::CamD).unwrap().is_none());
    }

    #[test]
    fn test_no_frames_after_stop() {
        let mut link = MockLink::new();
        let records = link.discover().unwrap();
        link.open(&records[0]).unwrap();
        link.configure_stream(CameraSocket::CamA, &StreamConfig::preview())
            .unwrap();
        link.start_streams().unwrap();
        link.stop_streams();
        assert!(link.poll_frame(CameraSocket::CamA).unwrap().is_none());
    }

    #[test]
    fn test_controls_are_journaled() {
        let mut link = MockLink::new();
        let journal = link.journal();
        let records = link.discover().unwrap();
        link.open(&records[0]).unwrap();

        let cmd = CameraCommand {
            brightness: Some(3),
            ..Default::default()
        };
        link.send_control(CameraSocket::CamB, &cmd).unwrap();

        let entries = journal.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, CameraSocket::CamB);
        assert_eq!(entries[0].1.brightness, Some(3));
    }
}
