//! Rig Control
//!
//! Operator-facing camera control state:
//! - `SettingsManager` clamps and applies camera settings
//! - `RoiManager` drives ROI-based auto-exposure/focus regions
//!
//! Both emit `CameraCommand`s through a `ControlSink`, the seam the
//! pipeline implements.

pub mod roi;
pub mod settings;

pub use roi::{RoiManager, RoiSettings};
pub use settings::{AutoModes, RigSettings, SettingsManager};

use camera_pipeline::{CameraCommand, CameraError, CameraSocket, RigPipeline};
use thiserror::Error;

/// Control errors
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("No ROI configured for {0}")]
    NoRoi(CameraSocket),
}

/// Destination for control messages
pub trait ControlSink: Send + Sync {
    /// Deliver a command to every connected camera
    fn send_all(&self, command: CameraCommand);

    /// Deliver a command to one camera
    fn send_to(&self, socket: CameraSocket, command: CameraCommand) -> Result<(), ControlError>;
}

impl ControlSink for RigPipeline {
    fn send_all(&self, command: CameraCommand) {
        self.send_control_all(&command);
    }

    fn send_to(&self, socket: CameraSocket, command: CameraCommand) -> Result<(), ControlError> {
        self.send_control(socket, command)?;
        Ok(())
    }
}

impl ControlSink for std::sync::Mutex<RigPipeline> {
    fn send_all(&self, command: CameraCommand) {
        self.lock().expect("pipeline lock").send_control_all(&command);
    }

    fn send_to(&self, socket: CameraSocket, command: CameraCommand) -> Result<(), ControlError> {
        self.lock()
            .expect("pipeline lock")
            .send_control(socket, command)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_sink {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every command, for assertions
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent_all: Mutex<Vec<CameraCommand>>,
        pub sent_to: Mutex<Vec<(CameraSocket, CameraCommand)>>,
    }

    impl ControlSink for RecordingSink {
        fn send_all(&self, command: CameraCommand) {
            self.sent_all.lock().unwrap().push(command);
        }

        fn send_to(
            &self,
            socket: CameraSocket,
            command: CameraCommand,
        ) -> Result<(), ControlError> {
            self.sent_to.lock().unwrap().push((socket, command));
            Ok(())
        }
    }
}
