//! Rig Pipeline: Frame and Control Queues
//!
//! One output queue and one control queue per connected socket. Output
//! queues are shallow: when the consumer lags, new frames are dropped
//! rather than buffered, so readers always see a recent frame. Control
//! messages are forwarded to the device by the per-socket poll thread.

use crate::control::CameraCommand;
use crate::device::RigDevice;
use crate::frame::VideoFrame;
use crate::link::SharedLink;
use crate::{CameraError, CameraSocket, StreamConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Frames buffered per socket before new frames are dropped
const FRAME_QUEUE_DEPTH: usize = 4;

/// Pending control messages per socket
const CONTROL_QUEUE_DEPTH: usize = 16;

/// Streaming pipeline over a connected device
pub struct RigPipeline {
    link: SharedLink,
    sockets: Vec<CameraSocket>,
    configs: HashMap<CameraSocket, StreamConfig>,
    frame_queues: HashMap<CameraSocket, Mutex<mpsc::Receiver<VideoFrame>>>,
    frame_senders: HashMap<CameraSocket, mpsc::Sender<VideoFrame>>,
    control_senders: HashMap<CameraSocket, mpsc::Sender<CameraCommand>>,
    control_receivers: HashMap<CameraSocket, mpsc::Receiver<CameraCommand>>,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl RigPipeline {
    /// Build queues for every connected socket and configure its stream
    pub fn build(device: &RigDevice, config: StreamConfig) -> Result<Self, CameraError> {
        if !device.is_connected() {
            return Err(CameraError::NotConnected);
        }

        let link = device.link();
        let sockets = device.sockets().to_vec();
        info!("Setting up pipeline for {} cameras", sockets.len());

        let mut configs = HashMap::new();
        let mut frame_queues = HashMap::new();
        let mut frame_senders = HashMap::new();
        let mut control_senders = HashMap::new();
        let mut control_receivers = HashMap::new();

        {
            let mut link = link.lock().expect("link lock");
            for &socket in &sockets {
                link.configure_stream(socket, &config)?;
                configs.insert(socket, config);

                let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
                let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_DEPTH);
                frame_queues.insert(socket, Mutex::new(frame_rx));
                frame_senders.insert(socket, frame_tx);
                control_senders.insert(socket, control_tx);
                control_receivers.insert(socket, control_rx);
                debug!("Configured {}", socket);
            }
        }

        Ok(Self {
            link,
            sockets,
            configs,
            frame_queues,
            frame_senders,
            control_senders,
            control_receivers,
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        })
    }

    /// Override the stream configuration for one socket (before streaming)
    pub fn configure_socket(
        &mut self,
        socket: CameraSocket,
        config: StreamConfig,
    ) -> Result<(), CameraError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CameraError::Pipeline(
                "cannot reconfigure while streaming".to_string(),
            ));
        }
        if !self.sockets.contains(&socket) {
            return Err(CameraError::UnknownSocket(socket.to_string()));
        }
        self.link
            .lock()
            .expect("link lock")
            .configure_stream(socket, &config)?;
        self.configs.insert(socket, config);
        Ok(())
    }

    /// Start streaming and spawn one poll thread per socket.
    ///
    /// A stopped pipeline cannot be restarted; build a fresh one, which is
    /// what reconnecting does.
    pub fn start_streaming(&mut self) -> Result<(), CameraError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.control_receivers.len() != self.sockets.len() {
            return Err(CameraError::Pipeline(
                "stopped pipeline cannot be restarted".to_string(),
            ));
        }

        self.link.lock().expect("link lock").start_streams()?;
        self.running.store(true, Ordering::SeqCst);

        for &socket in &self.sockets {
            let link = self.link.clone();
            let running = self.running.clone();
            let frame_tx = self.frame_senders[&socket].clone();
            let mut control_rx = self
                .control_receivers
                .remove(&socket)
                .expect("control receiver taken once");
            let fps = self.configs[&socket].fps.max(1);
            let interval = Duration::from_micros(1_000_000 / fps as u64);

            let handle = std::thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    // Forward queued controls before the next frame poll
                    while let Ok(command) = control_rx.try_recv() {
                        let mut link = link.lock().expect("link lock");
                        if let Err(e) = link.send_control(socket, &command) {
                            warn!("Control send error for {}: {}", socket, e);
                        }
                    }

                    let polled = link.lock().expect("link lock").poll_frame(socket);
                    match polled {
                        Ok(Some(frame)) => {
                            // Queue full means the consumer lags; drop the frame
                            let _ = frame_tx.try_send(frame);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Frame retrieval error for {}: {}", socket, e);
                        }
                    }

                    std::thread::sleep(interval);
                }
            });
            self.threads.push(handle);
        }

        info!("Pipeline started for {} cameras", self.sockets.len());
        Ok(())
    }

    /// Stop streaming, join poll threads and drain leftover frames
    pub fn stop_streaming(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        self.link.lock().expect("link lock").stop_streams();

        for queue in self.frame_queues.values() {
            let mut rx = queue.lock().expect("frame queue lock");
            while rx.try_recv().is_ok() {}
        }
        info!("Pipeline stopped");
    }

    /// Latest frame for a socket; `None` when nothing is queued
    pub fn get_frame(&self, socket: CameraSocket) -> Option<VideoFrame> {
        let queue = self.frame_queues.get(&socket)?;
        queue.lock().expect("frame queue lock").try_recv().ok()
    }

    /// Queue a control message for one socket
    pub fn send_control(
        &self,
        socket: CameraSocket,
        command: CameraCommand,
    ) -> Result<(), CameraError> {
        let sender = self
            .control_senders
            .get(&socket)
            .ok_or_else(|| CameraError::UnknownSocket(socket.to_string()))?;
        sender
            .try_send(command)
            .map_err(|_| CameraError::ControlQueueClosed(socket))
    }

    /// Queue a control message for every connected socket
    pub fn send_control_all(&self, command: &CameraCommand) {
        for &socket in &self.sockets {
            if let Err(e) = self.send_control(socket, command.clone()) {
                warn!("Control send error for {}: {}", socket, e);
            }
        }
    }

    /// Whether the pipeline is streaming
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sockets this pipeline serves
    pub fn sockets(&self) -> &[CameraSocket] {
        &self.sockets
    }

    /// Stream configuration for a socket
    pub fn config(&self, socket: CameraSocket) -> Option<StreamConfig> {
        self.configs.get(&socket).copied()
    }
}

impl Drop for RigPipeline {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MockLink;

    fn wait_for_frame(pipeline: &RigPipeline, socket: CameraSocket) -> Option<VideoFrame> {
        for _ in 0..100 {
            if let Some(frame) = pipeline.get_frame(socket) {
                return Some(frame);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn test_build_requires_connection() {
        let device = RigDevice::mock();
        assert!(matches!(
            RigPipeline::build(&device, StreamConfig::preview()),
            Err(CameraError::NotConnected)
        ));
    }

    #[test]
    fn test_frames_flow_after_start() {
        let mut device = RigDevice::mock();
        device.connect().unwrap();
        let mut pipeline = RigPipeline::build(&device, StreamConfig::preview()).unwrap();
        pipeline.start_streaming().unwrap();

        let frame = wait_for_frame(&pipeline, CameraSocket::CamA).expect("frame");
        assert_eq!(frame.width, 1280);
        assert_eq!(frame.height, 720);
        assert_eq!(frame.socket, CameraSocket::CamA);

        pipeline.stop_streaming();
    }

    #[test]
    fn test_no_frames_after_stop() {
        let mut device = RigDevice::mock();
        device.connect().unwrap();
        let mut pipeline = RigPipeline::build(&device, StreamConfig::preview()).unwrap();
        pipeline.start_streaming().unwrap();
        wait_for_frame(&pipeline, CameraSocket::CamA).unwrap();

        pipeline.stop_streaming();
        assert!(pipeline.get_frame(CameraSocket::CamA).is_none());
        // Idempotent
        pipeline.stop_streaming();
    }

    #[test]
    fn test_controls_reach_the_device() {
        let link = MockLink::new();
        let journal = link.journal();
        let mut device = RigDevice::new(Box::new(link));
        device.connect().unwrap();

        let mut pipeline = RigPipeline::build(&device, StreamConfig::preview()).unwrap();
        let command = CameraCommand {
            manual_focus: Some(130),
            ..Default::default()
        };
        pipeline.send_control(CameraSocket::CamA, command.clone()).unwrap();
        pipeline.start_streaming().unwrap();

        // The poll thread forwards queued controls
        for _ in 0..100 {
            if !journal.lock().unwrap().is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        pipeline.stop_streaming();

        let entries = journal.lock().unwrap();
        assert!(entries
            .iter()
            .any(|(s, c)| *s == CameraSocket::CamA && *c == command));
    }

    #[test]
    fn test_unknown_socket_control_rejected() {
        let mut device = RigDevice::mock();
        device.connect().unwrap();
        let pipeline = RigPipeline::build(&device, StreamConfig::preview()).unwrap();

        assert!(matches!(
            pipeline.send_control(CameraSocket::CamD, CameraCommand::default()),
            Err(CameraError::UnknownSocket(_))
        ));
    }

    #[test]
    fn test_per_socket_override() {
        let mut device = RigDevice::mock();
        device.connect().unwrap();
        let mut pipeline = RigPipeline::build(&device, StreamConfig::preview()).unwrap();
        pipeline
            .configure_socket(CameraSocket::CamB, StreamConfig::full_resolution())
            .unwrap();

        assert_eq!(
            pipeline.config(CameraSocket::CamB).unwrap(),
            StreamConfig::full_resolution()
        );
        assert_eq!(
            pipeline.config(CameraSocket::CamA).unwrap(),
            StreamConfig::preview()
        );
    }
}
