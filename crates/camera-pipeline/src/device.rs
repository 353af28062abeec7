//! Rig Device Connection

use crate::link::{DeviceRecord, MockLink, SharedLink};
use crate::{CameraError, CameraSocket};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Device information snapshot
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Device platform name
    pub platform: String,
    /// Number of populated camera sockets
    pub connected_cameras: usize,
    /// Device product name
    pub device_name: String,
    /// Device serial (MxID)
    pub mxid: String,
}

/// Connection to one OAK PoE device
pub struct RigDevice {
    link: SharedLink,
    record: Option<DeviceRecord>,
    sockets: Vec<CameraSocket>,
    connected: bool,
}

impl RigDevice {
    /// Create a device over an arbitrary link
    pub fn new(link: Box<dyn crate::link::DeviceLink>) -> Self {
        Self {
            link: Arc::new(Mutex::new(link)),
            record: None,
            sockets: Vec::new(),
            connected: false,
        }
    }

    /// Create a device over the mock link (no hardware required)
    pub fn mock() -> Self {
        Self::new(Box::new(MockLink::new()))
    }

    /// Discover and connect to the first reachable device.
    ///
    /// Enables the IR laser dot projector when the device carries one; a
    /// missing projector is logged, not an error.
    pub fn connect(&mut self) -> Result<Vec<CameraSocket>, CameraError> {
        if self.connected {
            return Ok(self.sockets.clone());
        }

        let mut link = self.link.lock().expect("link lock");

        let records = link.discover()?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| CameraError::Open("no devices discovered".to_string()))?;
        info!("Connecting to {} at {}", record.mxid, record.address);

        link.open(&record)?;

        let sockets = link.connected_sockets()?;
        if sockets.is_empty() {
            link.close();
            return Err(CameraError::NoCameras);
        }

        match link.set_ir_laser_intensity(1.0) {
            Ok(true) => info!("IR laser dot projector enabled"),
            Ok(false) => info!("IR laser projector not available on this device"),
            Err(e) => warn!("IR laser projector setup failed: {}", e),
        }

        let names: Vec<&str> = sockets.iter().map(|s| s.as_str()).collect();
        info!(
            "Connected to OAK device with {} cameras: {}",
            sockets.len(),
            names.join(", ")
        );

        drop(link);
        self.record = Some(record);
        self.sockets = sockets.clone();
        self.connected = true;
        Ok(sockets)
    }

    /// Device information, if connected
    pub fn device_info(&self) -> Option<DeviceInfo> {
        if !self.connected {
            return None;
        }
        let record = self.record.as_ref()?;
        let link = self.link.lock().expect("link lock");
        Some(DeviceInfo {
            platform: record.platform.clone(),
            connected_cameras: self.sockets.len(),
            device_name: link.device_name(),
            mxid: record.mxid.clone(),
        })
    }

    /// Connected camera sockets
    pub fn sockets(&self) -> &[CameraSocket] {
        &self.sockets
    }

    /// Whether a device session is open
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Shared handle to the underlying link
    pub fn link(&self) -> SharedLink {
        self.link.clone()
    }

    /// Close the session and clear connection state
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        {
            let mut link = self.link.lock().expect("link lock");
            link.stop_streams();
            link.close();
        }
        self.record = None;
        self.sockets.clear();
        self.connected = false;
        info!("Device disconnected");
    }
}

impl Drop for RigDevice {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MockLink;

    #[test]
    fn test_connect_and_info() {
        let mut device = RigDevice::mock();
        assert!(!device.is_connected());
        assert!(device.device_info().is_none());

        let sockets = device.connect().unwrap();
        assert_eq!(sockets, vec![CameraSocket::CamA, CameraSocket::CamB]);
        assert!(device.is_connected());

        let info = device.device_info().unwrap();
        assert_eq!(info.connected_cameras, 2);
        assert_eq!(info.platform, "RVC2");
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut device = RigDevice::mock();
        let first = device.connect().unwrap();
        let second = device.connect().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_device_rejected() {
        let mut device = RigDevice::new(Box::new(MockLink::with_sockets(vec![])));
        assert!(matches!(device.connect(), Err(CameraError::NoCameras)));
        assert!(!device.is_connected());
    }

    #[test]
    fn test_disconnect_clears_state() {
        let mut device = RigDevice::mock();
        device.connect().unwrap();
        device.disconnect();
        assert!(!device.is_connected());
        assert!(device.sockets().is_empty());
        // Idempotent
        device.disconnect();
    }
}
